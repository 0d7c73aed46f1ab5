//! APIレスポンス
//!
//! トランスポート非依存のレスポンス形式を提供する。
//! エラーはすべてJSON形式で返却され、`error`と`message`フィールドを含む。
//! バリデーションエラーの場合のみ`errors`にフィールド単位の詳細を載せる。

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::domain::{FieldError, ValidationErrors};

/// すべてのレスポンスに付与するCORSヘッダー
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", "Content-Type"),
    (
        "access-control-allow-methods",
        "GET, POST, PUT, PATCH, DELETE, OPTIONS",
    ),
];

/// JSONレスポンスのContent-Type
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// バイナリレスポンスのContent-Type
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// APIエラーレスポンスのボディ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    /// エラー種別（例: "validation_error", "not_found", "internal_error"）
    pub error: String,
    /// 詳細なエラーメッセージ
    pub message: String,
    /// フィールド単位のエラー（バリデーション時のみ）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// レスポンスボディ
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// 空（プリフライト）
    Empty,
    /// JSON
    Json(Value),
    /// バイナリ（ファイル取得）
    Bytes(Vec<u8>),
}

/// APIレスポンス
///
/// ステータスコードとボディを持ち、各トランスポートのアダプタが
/// ヘッダー付きのレスポンスに変換する。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTPステータスコード
    status: u16,
    /// レスポンスボディ
    body: ResponseBody,
}

impl ApiResponse {
    /// JSONレスポンスを作成
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(body),
        }
    }

    /// シリアライズ可能な値からJSONレスポンスを作成
    ///
    /// シリアライズに失敗した場合は500を返す。
    pub fn from_serializable<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::json(status, body),
            Err(e) => {
                error!(error = %e, "レスポンスのシリアライズに失敗");
                Self::internal_error()
            }
        }
    }

    /// 200 OK
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// 201 Created
    pub fn created(body: Value) -> Self {
        Self::json(201, body)
    }

    /// 200 OK（ボディ無し、プリフライト用）
    pub fn preflight() -> Self {
        Self {
            status: 200,
            body: ResponseBody::Empty,
        }
    }

    /// 200 OK（バイナリ）
    pub fn bytes(data: Vec<u8>) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Bytes(data),
        }
    }

    /// エラーレスポンスを作成
    pub fn error(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        let body = ApiErrorBody {
            error: error.into(),
            message: message.into(),
            errors: Vec::new(),
        };
        Self::from_serializable(status, &body)
    }

    /// 400 バリデーションエラー（フィールド一覧付き）
    pub fn validation(message: impl Into<String>, errors: &ValidationErrors) -> Self {
        let body = ApiErrorBody {
            error: "validation_error".to_string(),
            message: message.into(),
            errors: errors.field_errors(),
        };
        Self::from_serializable(400, &body)
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(400, "bad_request", message)
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(404, "not_found", message)
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self::error(405, "method_not_allowed", "Method Not Allowed")
    }

    /// 503 Service Unavailable
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::error(503, "service_unavailable", message)
    }

    /// 500 Internal Server Error
    ///
    /// 内部エラーの詳細はクライアントに返さない。
    pub fn internal_error() -> Self {
        Self {
            status: 500,
            body: ResponseBody::Json(json!({
                "error": "internal_error",
                "message": "Internal server error",
            })),
        }
    }

    /// ステータスコードを取得
    pub fn status(&self) -> u16 {
        self.status
    }

    /// ボディを取得
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// JSONボディを取得（JSON以外はNone）
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Content-Typeを取得
    pub fn content_type(&self) -> &'static str {
        match self.body {
            ResponseBody::Bytes(_) => OCTET_STREAM_CONTENT_TYPE,
            ResponseBody::Empty | ResponseBody::Json(_) => JSON_CONTENT_TYPE,
        }
    }

    /// ボディをバイト列として取り出す
    pub fn into_body_bytes(self) -> Vec<u8> {
        match self.body {
            ResponseBody::Empty => Vec::new(),
            ResponseBody::Json(value) => value.to_string().into_bytes(),
            ResponseBody::Bytes(data) => data,
        }
    }

    /// ステータスとバイト列に分解する
    pub fn into_parts(self) -> (u16, &'static str, Vec<u8>) {
        let status = self.status;
        let content_type = self.content_type();
        (status, content_type, self.into_body_bytes())
    }
}
