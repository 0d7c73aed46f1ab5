/// お問い合わせ送信 HTTP Lambdaエントリポイント
///
/// Lambda Function URL経由の`POST /api/contact`を処理する。
/// POST以外は405、OPTIONSはCORSプリフライトとして200を返す。
///
/// 通知メールは送信完了（またはタイムアウト）まで待ってからレスポンスを返す。
/// Lambdaはレスポンス返却後に実行環境が凍結され得るため。
use contact::application::{
    ContactApi, Endpoint, NotificationMode, build_contact_api, handle_lambda_request,
};
use contact::infrastructure::{AppConfig, init_logging};
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use tokio::sync::OnceCell;
use tracing::{error, info};

/// ContactApiの静的インスタンス（warm start時に再利用）
static CONTACT_API: OnceCell<ContactApi> = OnceCell::const_new();

/// ContactApiを取得（初期化されていなければ環境変数から構築）
async fn get_contact_api() -> Result<&'static ContactApi, Error> {
    CONTACT_API
        .get_or_try_init(|| async { build_api(&AppConfig::from_env()?).await })
        .await
}

/// 設定からContactApiを構築（通知は完了まで待つ）
async fn build_api(config: &AppConfig) -> Result<ContactApi, Error> {
    let api = build_contact_api(config).await?;
    Ok(api.with_notification_mode(NotificationMode::Await))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    info!("お問い合わせLambda関数を初期化");

    run(service_fn(handler)).await
}

/// HTTPリクエストハンドラー
async fn handler(request: Request) -> Result<Response<Body>, Error> {
    let api = get_contact_api().await.map_err(|e| {
        error!(error = %e, "ContactApiの初期化に失敗");
        e
    })?;

    handle(api, request).await
}

/// 構築済みのContactApiでリクエストを処理する
async fn handle(api: &ContactApi, request: Request) -> Result<Response<Body>, Error> {
    Ok(handle_lambda_request(api, Endpoint::Contact, request).await)
}
