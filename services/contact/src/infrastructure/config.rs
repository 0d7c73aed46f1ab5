// アプリケーション設定
//
// ストア・通知メール・オブジェクトストレージの設定を環境変数から読み込む。
// いずれも未設定を許容し、未設定時は機能を縮退させる。

use thiserror::Error;

use super::sqlite_submission_repository::is_memory_path;

/// 通知先のデフォルト
pub const DEFAULT_NOTIFICATION_RECIPIENT: &str = "contact@example.com";

/// 通知送信元のデフォルト
pub const DEFAULT_NOTIFICATION_SENDER: &str = "noreply@example.com";

/// S3リージョンのデフォルト
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// 設定エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// DATABASE_URLのスキームが未対応
    #[error("未対応のDATABASE_URLです（sqliteのみ対応）: {0}")]
    UnsupportedDatabaseUrl(String),

    /// 環境変数の値が空
    #[error("環境変数が空です: {0}")]
    EmptyEnvVar(String),
}

/// 環境変数を読み込む（未設定・空白のみは未設定扱い）
fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// ストアのバックエンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// プロセス内メモリ（再起動で消える）
    InMemory,
    /// SQLiteファイル
    Sqlite {
        /// データベースファイルのパス
        path: String,
    },
}

impl StoreConfig {
    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `DATABASE_URL`: SQLiteのパス（`sqlite://`・`sqlite:`接頭辞可）。未設定ならインメモリ
    pub fn from_env() -> Result<Self, ConfigError> {
        match optional_env("DATABASE_URL") {
            None => Ok(StoreConfig::InMemory),
            Some(url) => Self::parse_database_url(&url),
        }
    }

    /// DATABASE_URLを解釈する
    ///
    /// `sqlite::memory:`などインメモリDBの指定はインメモリストアとして扱う。
    pub fn parse_database_url(url: &str) -> Result<Self, ConfigError> {
        let path = if let Some(rest) = url.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else if url.contains("://") {
            return Err(ConfigError::UnsupportedDatabaseUrl(url.to_string()));
        } else {
            url
        };

        if path.is_empty() {
            return Err(ConfigError::EmptyEnvVar("DATABASE_URL".to_string()));
        }

        if is_memory_path(path) {
            return Ok(StoreConfig::InMemory);
        }

        Ok(StoreConfig::Sqlite {
            path: path.to_string(),
        })
    }
}

/// 通知メールの設定
#[derive(Clone, PartialEq, Eq)]
pub struct EmailConfig {
    api_key: Option<String>,
    recipient: String,
    sender: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("configured", &self.api_key.is_some())
            .field("recipient", &self.recipient)
            .field("sender", &self.sender)
            .finish()
    }
}

impl EmailConfig {
    /// 新しい設定を作成
    pub fn new(
        api_key: Option<String>,
        recipient: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            recipient: recipient.into(),
            sender: sender.into(),
        }
    }

    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `SENDGRID_API_KEY`: APIキー（未設定なら通知無効）
    /// - `NOTIFICATION_RECIPIENT`: 通知先（デフォルト: contact@example.com）
    /// - `NOTIFICATION_SENDER`: 送信元（デフォルト: noreply@example.com）
    pub fn from_env() -> Self {
        Self {
            api_key: optional_env("SENDGRID_API_KEY"),
            recipient: optional_env("NOTIFICATION_RECIPIENT")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_RECIPIENT.to_string()),
            sender: optional_env("NOTIFICATION_SENDER")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_SENDER.to_string()),
        }
    }

    /// APIキーを取得
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// 通知先を取得
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// 送信元を取得
    pub fn sender(&self) -> &str {
        &self.sender
    }
}

/// オブジェクトストレージの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStorageConfig {
    bucket: Option<String>,
    region: String,
}

impl ObjectStorageConfig {
    /// 新しい設定を作成
    pub fn new(bucket: Option<String>, region: impl Into<String>) -> Self {
        Self {
            bucket,
            region: region.into(),
        }
    }

    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `ASSETS_BUCKET`: バケット名（未設定ならアップロード無効）
    /// - `AWS_REGION`: リージョン（デフォルト: us-east-1）
    pub fn from_env() -> Self {
        Self {
            bucket: optional_env("ASSETS_BUCKET"),
            region: optional_env("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
        }
    }

    /// バケット名を取得
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// リージョンを取得
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// アプリケーション全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub email: EmailConfig,
    pub object_storage: ObjectStorageConfig,
}

impl AppConfig {
    /// 環境変数から全設定を読み込み
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            email: EmailConfig::from_env(),
            object_storage: ObjectStorageConfig::from_env(),
        })
    }

    /// 外部サービスを使わない設定（インメモリストア、通知・アップロード無効）
    pub fn local() -> Self {
        Self {
            store: StoreConfig::InMemory,
            email: EmailConfig::new(
                None,
                DEFAULT_NOTIFICATION_RECIPIENT,
                DEFAULT_NOTIFICATION_SENDER,
            ),
            object_storage: ObjectStorageConfig::new(None, DEFAULT_AWS_REGION),
        }
    }
}
