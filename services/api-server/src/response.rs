//! ApiResponseのaxumレスポンス変換
//!
//! コアライブラリの`ApiResponse`はトランスポート非依存のため、
//! ラッパー型でaxumの`IntoResponse`を実装する。

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use contact::application::ApiResponse;

/// `ApiResponse`をaxumで返すためのラッパー
#[derive(Debug)]
pub struct ApiReply(pub ApiResponse);

impl From<ApiResponse> for ApiReply {
    fn from(response: ApiResponse) -> Self {
        Self(response)
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        let (status, content_type, bytes) = self.0.into_parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}
