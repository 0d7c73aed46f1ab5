// Lambda HTTPアダプター
//
// Lambda Function URL / API Gatewayのリクエストを`ApiRequest`に変換し、
// `ContactApi`の結果をCORSヘッダー付きのLambdaレスポンスに戻す。

use lambda_http::http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use lambda_http::{Body, Request, RequestExt, Response};
use tracing::{error, info};

use super::api_response::{ApiResponse, CORS_HEADERS};
use super::contact_api::{ApiRequest, ContactApi, Endpoint};

/// Lambdaリクエストを`ApiRequest`に変換
///
/// パスはAPI Gatewayのステージ名を含まない生のパスを使う。
pub fn to_api_request(request: &Request) -> ApiRequest {
    let body = match request.body() {
        Body::Text(text) => Some(text.clone()),
        Body::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Body::Empty => None,
        _ => None,
    };

    let path = match request.raw_http_path() {
        "" => request.uri().path(),
        raw => raw,
    };

    ApiRequest::new(request.method().as_str(), path, body)
}

/// CORSヘッダーとContent-Typeを含むHeaderMapを構築
pub fn build_headers(content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in CORS_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers
}

/// `ApiResponse`をLambdaレスポンスに変換
pub fn to_lambda_response(
    response: ApiResponse,
) -> Result<Response<Body>, lambda_http::http::Error> {
    let (status, content_type, bytes) = response.into_parts();

    let body = if bytes.is_empty() {
        Body::Empty
    } else if content_type == super::api_response::JSON_CONTENT_TYPE {
        match String::from_utf8(bytes) {
            Ok(text) => Body::Text(text),
            Err(e) => Body::Binary(e.into_bytes()),
        }
    } else {
        Body::Binary(bytes)
    };

    let mut lambda_response = Response::builder().status(status).body(body)?;
    *lambda_response.headers_mut() = build_headers(content_type);
    Ok(lambda_response)
}

/// Lambdaリクエストを処理する
///
/// レスポンス構築に失敗した場合もCORSヘッダー付きの500を返す。
pub async fn handle_lambda_request(
    api: &ContactApi,
    endpoint: Endpoint,
    request: Request,
) -> Response<Body> {
    let api_request = to_api_request(&request);
    info!(
        method = %api_request.method,
        path = %api_request.path,
        endpoint = ?endpoint,
        "リクエスト受信"
    );

    let response = api.handle(endpoint, &api_request).await;
    let status = response.status();

    match to_lambda_response(response) {
        Ok(lambda_response) => {
            info!(status = status, "レスポンス送信");
            lambda_response
        }
        Err(e) => {
            error!(error = %e, "レスポンスの構築に失敗");
            internal_error_response()
        }
    }
}

/// 固定の500レスポンス
fn internal_error_response() -> Response<Body> {
    let (_, content_type, bytes) = ApiResponse::internal_error().into_parts();
    let mut response = Response::new(Body::Text(String::from_utf8_lossy(&bytes).into_owned()));
    *response.status_mut() = lambda_http::http::StatusCode::INTERNAL_SERVER_ERROR;
    *response.headers_mut() = build_headers(content_type);
    response
}
