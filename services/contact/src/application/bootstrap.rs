/// 設定からContactApiを組み立てる
///
/// ストア・メール送信・オブジェクトストレージの具体実装を選び、
/// サーバーとLambdaの両方で同じ構成を得る。
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::contact_api::ContactApi;
use super::contact_service::ContactService;
use super::notification_dispatcher::NotificationDispatcher;
use super::upload_service::UploadService;
use crate::infrastructure::{
    AppConfig, ConfigError, EmailError, EmailSender, InMemorySubmissionRepository, ObjectStorage,
    S3ObjectStorage, SendGridEmailSender, SqliteSubmissionRepository, StoreConfig, StoreError,
    SubmissionRepository,
};

/// 起動時のエラー型
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// 設定の読み込みに失敗
    #[error("設定の読み込みに失敗しました: {0}")]
    Config(#[from] ConfigError),

    /// ストアの初期化に失敗
    #[error("ストアの初期化に失敗しました: {0}")]
    Store(#[from] StoreError),

    /// メール送信クライアントの初期化に失敗
    #[error("メール送信クライアントの初期化に失敗しました: {0}")]
    Email(#[from] EmailError),
}

/// 設定に従ってストアを作成
pub async fn build_repository(
    store: &StoreConfig,
) -> Result<Arc<dyn SubmissionRepository>, BootstrapError> {
    match store {
        StoreConfig::InMemory => {
            warn!("DATABASE_URL未設定のためインメモリストアを使用（再起動で消失）");
            Ok(Arc::new(InMemorySubmissionRepository::new()))
        }
        StoreConfig::Sqlite { path } => {
            let repository = SqliteSubmissionRepository::new(path).await?;
            info!(path = %path, "SQLiteストアを初期化");
            Ok(Arc::new(repository))
        }
    }
}

/// 設定に従ってContactApiを組み立てる
///
/// SendGrid APIキーが無ければ通知を無効化し、
/// バケット名が無ければアップロードを無効化する（いずれも起動は継続）。
pub async fn build_contact_api(config: &AppConfig) -> Result<ContactApi, BootstrapError> {
    let repository = build_repository(&config.store).await?;

    let sender: Option<Arc<dyn EmailSender>> = match config.email.api_key() {
        Some(api_key) => Some(Arc::new(SendGridEmailSender::new(api_key)?)),
        None => {
            warn!("SENDGRID_API_KEY未設定のためメール通知を無効化");
            None
        }
    };
    let dispatcher =
        NotificationDispatcher::new(sender, config.email.recipient(), config.email.sender());

    let storage: Option<Arc<dyn ObjectStorage>> = match config.object_storage.bucket() {
        Some(bucket) => Some(Arc::new(
            S3ObjectStorage::connect(bucket, config.object_storage.region()).await,
        )),
        None => {
            warn!("ASSETS_BUCKET未設定のためアップロードを無効化");
            None
        }
    };

    info!(
        notification = dispatcher.is_configured(),
        uploads = storage.is_some(),
        "ContactApiを構築"
    );

    Ok(ContactApi::new(
        ContactService::new(repository, dispatcher),
        UploadService::new(storage),
    ))
}
