/// アップロード先のオブジェクトストレージ
///
/// 署名付きPUT URLの発行、オブジェクトの削除・取得を抽象化する。
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

/// オブジェクトストレージ操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ObjectStorageError {
    /// 署名付きURLの生成に失敗
    #[error("Presign error: {0}")]
    Presign(String),

    /// AWS SDKの呼び出しに失敗
    #[error("AWS SDK error: {0}")]
    AwsSdkError(String),

    /// オブジェクト本体の読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),
}

/// ストレージの所在（ステータス表示用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageLocation {
    /// リージョン
    pub region: String,
    /// バケット名
    pub bucket: String,
}

/// オブジェクトストレージ用トレイト
///
/// このトレイトはS3操作を抽象化し、
/// 異なる実装を可能にします（実際のS3、テスト用モック）。
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 署名付きPUT URLを発行
    ///
    /// # 引数
    /// * `key` - オブジェクトキー
    /// * `content_type` - アップロードされるContent-Type
    /// * `original_name` - 元ファイル名（メタデータとして付与）
    /// * `expires_in` - URLの有効期間
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        original_name: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStorageError>;

    /// オブジェクトを削除
    async fn delete(&self, key: &str) -> Result<(), ObjectStorageError>;

    /// オブジェクトを取得
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStorageError>;

    /// ストレージの所在
    fn location(&self) -> StorageLocation;

    /// アップロード後の公開URL
    fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.location().bucket, key)
    }
}

/// ObjectStorageのS3実装
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    /// S3クライアント
    client: S3Client,
    /// バケット名
    bucket: String,
    /// リージョン
    region: String,
}

impl S3ObjectStorage {
    /// 新しいS3ObjectStorageを作成
    pub fn new(client: S3Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    /// デフォルトの認証情報チェーンでS3クライアントを構築して作成
    pub async fn connect(bucket: &str, region: &str) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = S3Client::new(&aws_config);

        info!(bucket = %bucket, region = %region, "S3クライアントを初期化");

        Self::new(client, bucket, region)
    }
}

/// メタデータとして送れる文字列に変換
///
/// S3のユーザーメタデータはASCIIのヘッダー値として送られるため、
/// 表示可能なASCII以外は`_`に置き換える。
fn header_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect()
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        original_name: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStorageError> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| ObjectStorageError::Presign(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .metadata("original-name", header_safe(original_name))
            .metadata("upload-timestamp", chrono::Utc::now().to_rfc3339())
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                error!(key = %key, error = %e, "署名付きURLの生成に失敗");
                ObjectStorageError::Presign(e.to_string())
            })?;

        debug!(key = %key, "署名付きURLを生成");
        Ok(request.uri().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!(key = %key, error = %e, "オブジェクト削除に失敗");
                ObjectStorageError::AwsSdkError(e.to_string())
            })?;

        info!(key = %key, "オブジェクトを削除");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!(key = %key, error = %e, "オブジェクト取得に失敗");
                ObjectStorageError::AwsSdkError(e.to_string())
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStorageError::ReadError(e.to_string()))?;

        Ok(data.into_bytes().to_vec())
    }

    fn location(&self) -> StorageLocation {
        StorageLocation {
            region: self.region.clone(),
            bucket: self.bucket.clone(),
        }
    }
}
