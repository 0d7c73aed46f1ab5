/// アップロードサービス
///
/// アップロード要求を検証し、署名付きPUT URLを発行する。
/// 保存済みオブジェクトの削除・取得も扱う。
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{UPLOAD_URL_EXPIRY_SECS, UploadRequest, UploadRequestError};
use crate::infrastructure::{ObjectStorage, ObjectStorageError, StorageLocation};

/// アップロードサービスのエラー型
#[derive(Debug, Error)]
pub enum UploadError {
    /// 要求が不正
    #[error("アップロード要求が不正です: {0}")]
    InvalidRequest(#[from] UploadRequestError),

    /// オブジェクトストレージが未設定
    #[error("オブジェクトストレージが設定されていません")]
    Unconfigured,

    /// オブジェクトストレージの呼び出しに失敗
    #[error("オブジェクトストレージの呼び出しに失敗しました: {0}")]
    Upstream(#[from] ObjectStorageError),
}

/// 発行したアップロード許可
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    /// 署名付きPUT URL
    pub upload_url: String,
    /// アップロード後の公開URL
    pub public_url: String,
    /// オブジェクトキー
    pub key: String,
    /// 導出した一意なファイル名
    pub file_name: String,
}

/// ストレージ設定状況
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    /// 設定済みか
    pub configured: bool,
    /// 所在（未設定ならnull）
    pub config: Option<StorageLocation>,
}

/// アップロードサービス
#[derive(Clone)]
pub struct UploadService {
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl UploadService {
    /// 新しいUploadServiceを作成
    pub fn new(storage: Option<Arc<dyn ObjectStorage>>) -> Self {
        Self { storage }
    }

    fn storage(&self) -> Result<&Arc<dyn ObjectStorage>, UploadError> {
        self.storage.as_ref().ok_or(UploadError::Unconfigured)
    }

    /// アップロード許可を発行する
    ///
    /// 要求の検証はストレージ設定の有無より先に行う。
    pub async fn create_grant(&self, body: Option<&str>) -> Result<UploadGrant, UploadError> {
        let request = UploadRequest::from_body(body)?;
        let storage = self.storage()?;

        let file_name = request.unique_file_name(Uuid::new_v4());
        let key = request.object_key(&file_name);

        let upload_url = storage
            .presign_put(
                &key,
                &request.file_type,
                &request.file_name,
                Duration::from_secs(UPLOAD_URL_EXPIRY_SECS),
            )
            .await
            .map_err(|e| {
                error!(operation = "presign_put", key = %key, error = %e, "署名付きURLの発行に失敗");
                e
            })?;

        info!(
            key = %key,
            file_type = %request.file_type,
            file_size = request.file_size,
            "アップロード用URLを発行しました"
        );

        Ok(UploadGrant {
            upload_url,
            public_url: storage.public_url(&key),
            key,
            file_name,
        })
    }

    /// オブジェクトを削除する
    pub async fn delete_file(&self, key: &str) -> Result<(), UploadError> {
        let storage = self.storage()?;
        storage.delete(key).await.map_err(|e| {
            error!(operation = "delete", key = %key, error = %e, "オブジェクトの削除に失敗");
            UploadError::from(e)
        })
    }

    /// オブジェクトを取得する
    pub async fn fetch_file(&self, key: &str) -> Result<Vec<u8>, UploadError> {
        let storage = self.storage()?;
        storage.get(key).await.map_err(|e| {
            error!(operation = "get", key = %key, error = %e, "オブジェクトの取得に失敗");
            UploadError::from(e)
        })
    }

    /// ストレージの設定状況
    pub fn status(&self) -> StorageStatus {
        StorageStatus {
            configured: self.storage.is_some(),
            config: self.storage.as_ref().map(|s| s.location()),
        }
    }
}
