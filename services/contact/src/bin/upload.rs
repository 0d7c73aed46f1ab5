/// アップロードURL発行 HTTP Lambdaエントリポイント
///
/// `POST /api/upload`を処理し、S3への署名付きPUT URLを返す。
/// `ASSETS_BUCKET`未設定時は検証を通過した要求に503を返す。
use contact::application::{
    ContactApi, Endpoint, NotificationMode, build_contact_api, handle_lambda_request,
};
use contact::infrastructure::{AppConfig, init_logging};
use lambda_http::{Body, Error, Request, Response, run, service_fn};
use tokio::sync::OnceCell;
use tracing::{error, info};

/// ContactApiの静的インスタンス（warm start時に再利用）
static CONTACT_API: OnceCell<ContactApi> = OnceCell::const_new();

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
    init_logging();

    info!("アップロードLambda関数を初期化");

    run(service_fn(handler)).await
}

async fn handler(request: Request) -> Result<Response<Body>, Error> {
    let api = get_contact_api().await.map_err(|e| {
        error!(error = %e, "ContactApiの初期化に失敗");
        e
    })?;

    handle(api, request).await
}

/// 構築済みのContactApiでリクエストを処理する
async fn handle(api: &ContactApi, request: Request) -> Result<Response<Body>, Error> {
    Ok(handle_lambda_request(api, Endpoint::Upload, request).await)
}
