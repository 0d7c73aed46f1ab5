//! お問い合わせAPIのコア
//!
//! HTTPサーバー・Lambdaのどちらからも同じ振る舞いになるよう、
//! トランスポート非依存のリクエストを受けて`ApiResponse`を返す。
//!
//! # 処理の流れ
//! 1. OPTIONS → 200（ボディ無し）
//! 2. メソッド確認（専用Lambdaは405、パスルーティングでは404）
//! 3. ボディの解釈・検証 → 400
//! 4. 保存 → 失敗時は500（詳細はログのみ）
//! 5. 通知（作成時のみ、ベストエフォート）
//! 6. レスポンス

use percent_encoding::percent_decode_str;
use serde_json::json;
use tracing::{debug, warn};

use super::api_response::ApiResponse;
use super::contact_service::{ContactService, ContactServiceError};
use super::upload_service::{UploadError, UploadService};

/// 作成成功時のメッセージ
pub const SUBMISSION_RECEIVED_MESSAGE: &str = "Contact submission received successfully";

/// 通知タスクの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    /// 完了を待たずにレスポンスを返す（常駐サーバー向け）
    Detach,
    /// 完了（またはタイムアウト）を待ってからレスポンスを返す（Lambda向け）
    Await,
}

/// エントリポイントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// POST /api/contact 専用
    Contact,
    /// POST /api/upload 専用
    Upload,
    /// /api/contact/submissions 配下
    Submissions,
    /// 全ルート
    All,
}

/// トランスポート非依存のリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTPメソッド（大文字）
    pub method: String,
    /// パス（クエリ文字列を含んでもよい）
    pub path: String,
    /// ボディ
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            body,
        }
    }
}

/// お問い合わせAPI
#[derive(Clone)]
pub struct ContactApi {
    contact: ContactService,
    uploads: UploadService,
    notification_mode: NotificationMode,
}

impl ContactApi {
    /// 新しいContactApiを作成（通知は切り離し）
    pub fn new(contact: ContactService, uploads: UploadService) -> Self {
        Self {
            contact,
            uploads,
            notification_mode: NotificationMode::Detach,
        }
    }

    /// 通知タスクの扱いを変更
    pub fn with_notification_mode(mut self, mode: NotificationMode) -> Self {
        self.notification_mode = mode;
        self
    }

    /// 通知タスクの扱いを取得
    pub fn notification_mode(&self) -> NotificationMode {
        self.notification_mode
    }

    // ========================================
    // 操作
    // ========================================

    /// POST /api/contact
    pub async fn submit_contact(&self, body: Option<&str>) -> ApiResponse {
        match self.contact.submit(body).await {
            Ok(outcome) => {
                let id = outcome.submission.id;
                match self.notification_mode {
                    NotificationMode::Detach => outcome.notification.detach(),
                    NotificationMode::Await => {
                        outcome.notification.wait().await;
                    }
                }
                ApiResponse::created(json!({
                    "message": SUBMISSION_RECEIVED_MESSAGE,
                    "id": id,
                }))
            }
            Err(ContactServiceError::Validation(errors)) => {
                debug!(error = %errors, "お問い合わせの検証に失敗");
                ApiResponse::validation("Invalid contact submission", &errors)
            }
            Err(ContactServiceError::Storage(_)) => ApiResponse::internal_error(),
        }
    }

    /// GET /api/contact/submissions
    pub async fn list_submissions(&self) -> ApiResponse {
        match self.contact.list().await {
            Ok(submissions) => ApiResponse::from_serializable(200, &submissions),
            Err(_) => ApiResponse::internal_error(),
        }
    }

    /// GET /api/contact/submissions/:id
    pub async fn get_submission(&self, raw_id: &str) -> ApiResponse {
        let Some(id) = parse_id(raw_id) else {
            return ApiResponse::bad_request("Invalid submission ID");
        };

        match self.contact.find(id).await {
            Ok(Some(submission)) => ApiResponse::from_serializable(200, &submission),
            Ok(None) => ApiResponse::not_found("Contact submission not found"),
            Err(_) => ApiResponse::internal_error(),
        }
    }

    /// PATCH|PUT /api/contact/submissions/:id/status
    pub async fn update_status(&self, raw_id: &str, body: Option<&str>) -> ApiResponse {
        let Some(id) = parse_id(raw_id) else {
            return ApiResponse::bad_request("Invalid submission ID");
        };

        match self.contact.update_status(id, body).await {
            Ok(Some(submission)) => ApiResponse::from_serializable(200, &submission),
            Ok(None) => ApiResponse::not_found("Contact submission not found"),
            Err(ContactServiceError::Validation(errors)) => {
                ApiResponse::validation("Status is required and must be a string", &errors)
            }
            Err(ContactServiceError::Storage(_)) => ApiResponse::internal_error(),
        }
    }

    /// POST /api/upload
    pub async fn create_upload(&self, body: Option<&str>) -> ApiResponse {
        match self.uploads.create_grant(body).await {
            Ok(grant) => ApiResponse::ok(json!({
                "message": "Presigned URL generated successfully",
                "uploadUrl": grant.upload_url,
                "publicUrl": grant.public_url,
                "key": grant.key,
                "fileName": grant.file_name,
            })),
            Err(e) => Self::upload_error_response(e),
        }
    }

    /// DELETE /api/s3/file/:key
    pub async fn delete_file(&self, key: &str) -> ApiResponse {
        if key.is_empty() {
            return ApiResponse::bad_request("File key is required");
        }
        match self.uploads.delete_file(key).await {
            Ok(()) => ApiResponse::ok(json!({"message": "File deleted successfully"})),
            Err(e) => Self::upload_error_response(e),
        }
    }

    /// GET /api/s3/file/:key
    pub async fn fetch_file(&self, key: &str) -> ApiResponse {
        if key.is_empty() {
            return ApiResponse::bad_request("File key is required");
        }
        match self.uploads.fetch_file(key).await {
            Ok(data) => ApiResponse::bytes(data),
            Err(e) => Self::upload_error_response(e),
        }
    }

    /// GET /api/aws/status
    pub fn storage_status(&self) -> ApiResponse {
        ApiResponse::from_serializable(200, &self.uploads.status())
    }

    fn upload_error_response(err: UploadError) -> ApiResponse {
        match err {
            UploadError::InvalidRequest(e) => ApiResponse::bad_request(e.to_string()),
            UploadError::Unconfigured => ApiResponse::service_unavailable("AWS S3 not configured"),
            UploadError::Upstream(_) => ApiResponse::internal_error(),
        }
    }

    // ========================================
    // ルーティング
    // ========================================

    /// リクエストをエントリポイントに応じて振り分ける
    pub async fn handle(&self, endpoint: Endpoint, request: &ApiRequest) -> ApiResponse {
        let method = request.method.as_str();
        let body = request.body.as_deref();

        if method == "OPTIONS" {
            return ApiResponse::preflight();
        }

        let response = match endpoint {
            Endpoint::Contact if method == "POST" => self.submit_contact(body).await,
            Endpoint::Upload if method == "POST" => self.create_upload(body).await,
            Endpoint::Contact | Endpoint::Upload => ApiResponse::method_not_allowed(),
            Endpoint::Submissions | Endpoint::All => {
                let segments = path_segments(&request.path);
                let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
                self.route(endpoint, method, &segments, body).await
            }
        };

        if response.status() >= 400 {
            debug!(
                method = %method,
                path = %request.path,
                status = response.status(),
                "リクエストを処理（エラー）"
            );
        }
        response
    }

    async fn route(
        &self,
        endpoint: Endpoint,
        method: &str,
        segments: &[&str],
        body: Option<&str>,
    ) -> ApiResponse {
        let all = endpoint == Endpoint::All;

        match (method, segments) {
            ("GET", ["api", "contact", "submissions"]) => self.list_submissions().await,
            ("GET", ["api", "contact", "submissions", id]) => self.get_submission(id).await,
            ("PATCH" | "PUT", ["api", "contact", "submissions", id, "status"]) => {
                self.update_status(id, body).await
            }
            ("POST", ["api", "contact"]) if all => self.submit_contact(body).await,
            ("POST", ["api", "upload"]) if all => self.create_upload(body).await,
            ("GET", ["api", "aws", "status"]) if all => self.storage_status(),
            ("DELETE", ["api", "s3", "file", key @ ..]) if all && !key.is_empty() => {
                self.delete_file(&key.join("/")).await
            }
            ("GET", ["api", "s3", "file", key @ ..]) if all && !key.is_empty() => {
                self.fetch_file(&key.join("/")).await
            }
            _ => {
                warn!(method = %method, path = %segments.join("/"), "ルートが見つかりません");
                ApiResponse::not_found("Not Found")
            }
        }
    }
}

/// IDを厳密に解釈する（数字以外を含む場合はNone）
fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// パスをデコード済みのセグメントに分割する
///
/// クエリ文字列・空セグメントは除く。`%2F`を含むセグメントはデコード後に
/// `/`を含み得るが、キーとして結合する際にそのまま扱う。
fn path_segments(path: &str) -> Vec<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(percent_decode)
        .collect()
}

/// `%XX`形式のパーセントエンコーディングをデコードする
///
/// 不正なシーケンスはそのまま残し、UTF-8として不正な結果は元の文字列を使う。
fn percent_decode(segment: &str) -> String {
    match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}
