//! お問い合わせAPIを提供するHTTP APIサーバー
//!
//! 本バイナリは以下の機能を提供する:
//! - お問い合わせの受付 (POST /api/contact)
//! - お問い合わせの一覧・取得・ステータス更新 (/api/contact/submissions)
//! - アップロード用署名付きURLの発行 (POST /api/upload)
//! - S3オブジェクトの削除・取得 (/api/s3/file/{*key})
//! - ストレージ設定状況 (GET /api/aws/status)
//! - ヘルスチェック (GET /health)

mod cors;
mod response;

pub use cors::cors_middleware;
pub use response::ApiReply;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    middleware,
    routing::{get, patch, post},
};
use contact::application::{BootstrapError, ContactApi, build_contact_api};
use contact::infrastructure::{AppConfig, ConfigError, init_logging};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// リッスンアドレス環境変数名
const LISTEN_ADDR_ENV: &str = "LISTEN_ADDR";

/// デフォルトのリッスンアドレス
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// サーバー起動時のエラー型
#[derive(Debug, Error)]
pub enum ServerError {
    /// 設定の読み込みに失敗
    #[error("設定の読み込みに失敗しました: {0}")]
    Config(#[from] ConfigError),

    /// 依存コンポーネントの初期化に失敗
    #[error("初期化に失敗しました: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// リッスンアドレスが不正
    #[error("リッスンアドレスが不正です: {0}")]
    InvalidListenAddr(String),

    /// ソケット操作に失敗
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),
}

/// アプリケーション状態
///
/// ルーター全体で共有される状態を保持する。
#[derive(Clone)]
pub struct AppState {
    /// お問い合わせAPI（通知は切り離して実行）
    pub api: Arc<ContactApi>,
}

/// ボディを文字列にする（空ならボディ無し、UTF-8として不正なバイトは置換）
fn body_text(body: &Bytes) -> Option<Cow<'_, str>> {
    (!body.is_empty()).then(|| String::from_utf8_lossy(body))
}

/// ヘルスチェックエンドポイント
async fn health() -> &'static str {
    "OK"
}

/// お問い合わせ受付エンドポイント (POST /api/contact)
///
/// # Returns
/// - 201 Created: `{message, id}`
/// - 400 Bad Request: 検証エラー（フィールド単位の`errors`付き）
/// - 500 Internal Server Error: ストアエラー
async fn submit_contact(State(state): State<AppState>, body: Bytes) -> ApiReply {
    state.api.submit_contact(body_text(&body).as_deref()).await.into()
}

/// お問い合わせ一覧エンドポイント (GET /api/contact/submissions)
async fn list_submissions(State(state): State<AppState>) -> ApiReply {
    state.api.list_submissions().await.into()
}

/// お問い合わせ取得エンドポイント (GET /api/contact/submissions/{id})
///
/// # Returns
/// - 200 OK: ContactSubmission
/// - 400 Bad Request: IDが数値でない
/// - 404 Not Found: 存在しない
async fn get_submission(State(state): State<AppState>, Path(id): Path<String>) -> ApiReply {
    state.api.get_submission(&id).await.into()
}

/// ステータス更新エンドポイント (PATCH|PUT /api/contact/submissions/{id}/status)
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiReply {
    state
        .api
        .update_status(&id, body_text(&body).as_deref())
        .await
        .into()
}

/// アップロードURL発行エンドポイント (POST /api/upload)
async fn create_upload(State(state): State<AppState>, body: Bytes) -> ApiReply {
    state.api.create_upload(body_text(&body).as_deref()).await.into()
}

/// S3オブジェクト削除エンドポイント (DELETE /api/s3/file/{*key})
async fn delete_file(State(state): State<AppState>, Path(key): Path<String>) -> ApiReply {
    state.api.delete_file(&key).await.into()
}

/// S3オブジェクト取得エンドポイント (GET /api/s3/file/{*key})
async fn fetch_file(State(state): State<AppState>, Path(key): Path<String>) -> ApiReply {
    state.api.fetch_file(&key).await.into()
}

/// ストレージ設定状況エンドポイント (GET /api/aws/status)
async fn storage_status(State(state): State<AppState>) -> ApiReply {
    state.api.storage_status().into()
}

/// 一致するルートが無い場合（メソッド不一致を含む）は404
async fn not_found() -> ApiReply {
    ApiReply(contact::application::ApiResponse::not_found("Not Found"))
}

/// ルーターを構築する
///
/// 全エンドポイントのルーティングを定義し、CORSミドルウェアを適用する。
/// OPTIONSはCORSミドルウェアがルーティング前に応答する。
/// TraceLayerによりリクエスト/レスポンスの構造化ログを自動記録する。
pub fn create_router(api: Arc<ContactApi>) -> Router {
    let state = AppState { api };

    Router::new()
        .route("/health", get(health))
        .route("/api/contact", post(submit_contact))
        .route("/api/contact/submissions", get(list_submissions))
        .route("/api/contact/submissions/{id}", get(get_submission))
        .route(
            "/api/contact/submissions/{id}/status",
            patch(update_status).put(update_status),
        )
        .route("/api/upload", post(create_upload))
        .route("/api/s3/file/{*key}", get(fetch_file).delete(delete_file))
        .route("/api/aws/status", get(storage_status))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(middleware::from_fn(cors_middleware))
        // リクエストトレーシングレイヤー（method, path, status, latencyを自動記録）
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// リッスンアドレスを解釈する
fn parse_listen_addr(value: Option<String>) -> Result<SocketAddr, ServerError> {
    let raw = value.unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    raw.parse()
        .map_err(|_| ServerError::InvalidListenAddr(raw.clone()))
}

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を待機し、いずれかを受信したらリターンする。
/// シグナルハンドラーの登録に失敗した場合、そのシグナルは待機しない。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C シグナルハンドラーの登録に失敗しました");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM シグナルハンドラーの登録に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            tracing::info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}

/// メイン関数
///
/// SIGTERMまたはCtrl+Cを受信するとgraceful shutdownを実行し、
/// 処理中のリクエスト完了を待ってからストアを破棄する。
///
/// # 環境変数
/// - `LISTEN_ADDR`: リッスンアドレス（デフォルト: 127.0.0.1:8080）
/// - `DATABASE_URL`: SQLiteのパス（未設定ならインメモリ）
/// - `SENDGRID_API_KEY` / `NOTIFICATION_RECIPIENT` / `NOTIFICATION_SENDER`: メール通知
/// - `ASSETS_BUCKET` / `AWS_REGION`: アップロード先
/// - `RUST_LOG`: ログレベル（デフォルト: info）
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    init_logging();

    tracing::info!("お問い合わせAPIサーバーを起動します");

    let config = AppConfig::from_env()?;
    let api = Arc::new(build_contact_api(&config).await?);
    let app = create_router(api);

    let addr = parse_listen_addr(std::env::var(LISTEN_ADDR_ENV).ok())?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "リッスン開始");

    // shutdown_signal()がシグナルを受信すると:
    // 1. 新規コネクションの受付を停止
    // 2. 処理中のリクエストの完了を待機
    // 3. サーバーが終了し、ストア（Arc<ContactApi>経由）が自動的にドロップされる
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("サーバーが正常に停止しました");
    Ok(())
}
