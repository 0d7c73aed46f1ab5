/// お問い合わせ管理 HTTP Lambdaエントリポイント
///
/// `/api/contact/submissions`配下の一覧取得・個別取得・ステータス更新を処理する。
/// ルートに一致しないリクエストは404を返す。
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

    info!("お問い合わせ管理Lambda関数を初期化");

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
    Ok(handle_lambda_request(api, Endpoint::Submissions, request).await)
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
            .uri(format!("https://example.lambda-url.us-east-1.on.aws{}", path))
            .body(body)
            .unwrap()
    }

    /// 作成はこのLambdaの担当外のため、ContactApiに直接登録する
    async fn seed_submission(api: &ContactApi) -> i64 {
        let body = json!({
            "firstName": "Jane",
            "lastName": "Smith",
            "email": "jane@example.com",
            "service": "consulting",
            "message": "Hello"
        })
        .to_string();
        let response = api.submit_contact(Some(&body)).await;
        response.json_body().unwrap()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let api = test_api().await;
        let id = seed_submission(&api).await;

        let response = handle(&api, request("GET", "/api/contact/submissions", Body::Empty))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let list = body_json(&response);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], id);

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
        assert_eq!(body_json(&response)["firstName"], "Jane");
    }

    #[tokio::test]
    async fn test_update_status() {
        let api = test_api().await;
        let id = seed_submission(&api).await;

        let response = handle(
            &api,
            request(
                "PATCH",
                &format!("/api/contact/submissions/{}/status", id),
                Body::Text(r#"{"status":"contacted"}"#.to_string()),
            ),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response)["status"], "contacted");
    }

    #[tokio::test]
    async fn test_invalid_id() {
        let api = test_api().await;

        let response = handle(&api, request("GET", "/api/contact/submissions/abc", Body::Empty))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(body_json(&response)["message"], "Invalid submission ID");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let api = test_api().await;

        let response = handle(&api, request("POST", "/api/contact", Body::Empty))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }
}
