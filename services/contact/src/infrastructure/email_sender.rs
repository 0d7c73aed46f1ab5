// EmailSender - メール送信クライアント
//
// お問い合わせ通知メールをSendGrid v3 APIで送信する。
// 指数バックオフによる再試行付き。

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// SendGrid v3 送信エンドポイント
pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// 最大再試行回数
const MAX_RETRIES: u32 = 3;

/// リクエストタイムアウト（秒）
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// 送信するメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 宛先
    pub to: String,
    /// 送信元
    pub from: String,
    /// 件名
    pub subject: String,
    /// プレーンテキスト本文
    pub text: String,
    /// HTML本文
    pub html: String,
}

/// メール送信エラー
///
/// # エラー種別
/// - `HttpError`: プロバイダがエラーレスポンスを返した
/// - `NetworkError`: 接続・タイムアウト
/// - `RetryExhausted`: 再試行回数超過
/// - `ClientBuild`: HTTPクライアントの構築に失敗
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmailError {
    /// HTTPエラー（ステータスコード付き）
    #[error("HTTPエラー: status={status}, message={message}")]
    HttpError {
        /// HTTPステータスコード
        status: u16,
        /// エラーメッセージ
        message: String,
    },

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// 再試行回数超過エラー
    #[error("再試行回数超過: {0}")]
    RetryExhausted(String),

    /// クライアント構築エラー
    #[error("クライアント構築エラー: {0}")]
    ClientBuild(String),
}

/// メール送信用トレイト
///
/// このトレイトはメール配信機能を抽象化し、
/// 異なる実装を可能にします（実際のSendGrid、テスト用モック）。
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// メールを1通送信
    ///
    /// # 戻り値
    /// * 成功時は`Ok(())`
    /// * 失敗時は`Err(EmailError)`
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// SendGrid v3 APIによるEmailSender実装
#[derive(Clone)]
pub struct SendGridEmailSender {
    /// HTTPクライアント（再試行ミドルウェア付き）
    client: ClientWithMiddleware,
    /// 送信エンドポイントURL
    endpoint: String,
    /// APIキー
    api_key: String,
}

impl std::fmt::Debug for SendGridEmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridEmailSender")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SendGridEmailSender {
    /// APIキーからSendGridEmailSenderを作成
    pub fn new(api_key: impl Into<String>) -> Result<Self, EmailError> {
        Self::with_endpoint(api_key, SENDGRID_ENDPOINT)
    }

    /// 送信先エンドポイントを指定して作成
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, EmailError> {
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "SendGridEmailSenderを初期化");

        // 基本HTTPクライアントを作成
        let base_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmailError::ClientBuild(e.to_string()))?;

        // 指数バックオフ再試行ポリシー
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);

        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    /// SendGrid v3形式のリクエストボディを構築
    fn build_payload(message: &EmailMessage) -> serde_json::Value {
        json!({
            "personalizations": [
                { "to": [{ "email": message.to }] }
            ],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html }
            ]
        })
    }
}

#[async_trait]
impl EmailSender for SendGridEmailSender {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        debug!(endpoint = %self.endpoint, "通知メールを送信");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .body(Self::build_payload(message).to_string())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "メール送信リクエスト失敗");
                if e.is_timeout() || e.is_connect() {
                    EmailError::NetworkError(e.to_string())
                } else {
                    EmailError::RetryExhausted(e.to_string())
                }
            })?;

        let status = response.status();

        // SendGridは成功時に202 Acceptedを返す
        if status.is_success() {
            info!(status = %status, "通知メールの送信に成功");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, "メール送信エラー");

        Err(EmailError::HttpError {
            status: status.as_u16(),
            message: body,
        })
    }
}
