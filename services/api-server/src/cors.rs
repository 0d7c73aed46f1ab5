//! CORSミドルウェア
//!
//! すべてのレスポンスに固定のCORSヘッダーを付与し、
//! OPTIONSはルーティング前にボディ無しの200で応答する。

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use contact::application::CORS_HEADERS;

/// CORSミドルウェア
pub async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "プリフライトリクエストに応答");
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        apply_cors_headers(&mut response);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(&mut response);
    response
}

/// レスポンスにCORSヘッダーを設定
fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}
