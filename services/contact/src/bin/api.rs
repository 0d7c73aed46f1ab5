/// 全ルート HTTP Lambdaエントリポイント
///
/// 単一のLambdaで全APIルート（お問い合わせ・管理・アップロード・S3操作）を処理する。
/// パスによるルーティングはサーバー版と同じ規則に従う。
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

    info!("全ルートLambda関数を初期化");

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
    Ok(handle_lambda_request(api, Endpoint::All, request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::http::Request as HttpRequest;
    use serde_json::{Value, json};

    async fn test_api() -> ContactApi {
        build_api(&AppConfig::local()).await.unwrap()
    }

    fn body_json(response: &Response<Body>) -> Value {
        let text = match response.body() {
            Body::Text(text) => text.clone(),
            Body::Binary(bytes) => String::from_utf8(bytes.clone()).unwrap(),
            Body::Empty => String::new(),
            _ => panic!("予期しないBody型"),
        };
        serde_json::from_str(&text).unwrap()
    }

    fn request(method: &str, path: &str, body: Body) -> Request {
        HttpRequest::builder()
            .method(method)
            .uri(path)
            .body(body)
            .unwrap()
    }

    /// 作成 → 取得 → ステータス更新 の一連の流れ
    #[tokio::test]
    async fn test_full_flow() {
        let api = test_api().await;

        let body = json!({
            "firstName": "John",
            "lastName": "Doe",
            "email": "john.doe@example.com",
            "service": "software-development",
            "message": "I need help with my project"
        });
        let response = handle(&api, request("POST", "/api/contact", Body::Text(body.to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let id = body_json(&response)["id"].as_i64().unwrap();

        let response = handle(
            &api,
            request(
                "GET",
                &format!("/api/contact/submissions/{}", id),
                Body::Empty,
            ),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        let fetched = body_json(&response);
        assert_eq!(fetched["service"], "software-development");
        assert_eq!(fetched["status"], "pending");

        let response = handle(
            &api,
            request(
                "PUT",
                &format!("/api/contact/submissions/{}/status", id),
                Body::Text(r#"{"status":"closed"}"#.to_string()),
            ),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["status"], "closed");
    }

    #[tokio::test]
    async fn test_storage_status_unconfigured() {
        let api = test_api().await;

        let response = handle(&api, request("GET", "/api/aws/status", Body::Empty))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), json!({"configured": false, "config": null}));
    }

    #[tokio::test]
    async fn test_s3_file_unconfigured() {
        let api = test_api().await;

        let response = handle(&api, request("DELETE", "/api/s3/file/uploads/a.png", Body::Empty))
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let api = test_api().await;

        let response = handle(&api, request("GET", "/api/unknown", Body::Empty))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
