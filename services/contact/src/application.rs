// アプリケーション層モジュール
pub mod api_response;
pub mod bootstrap;
pub mod contact_api;
pub mod contact_service;
pub mod lambda_handler;
pub mod notification_dispatcher;
pub mod upload_service;

// 再エクスポート
pub use api_response::{
    ApiErrorBody, ApiResponse, CORS_HEADERS, JSON_CONTENT_TYPE, OCTET_STREAM_CONTENT_TYPE,
    ResponseBody,
};
pub use bootstrap::{BootstrapError, build_contact_api, build_repository};
pub use contact_api::{
    ApiRequest, ContactApi, Endpoint, NotificationMode, SUBMISSION_RECEIVED_MESSAGE,
};
pub use contact_service::{ContactService, ContactServiceError, SubmitOutcome};
pub use lambda_handler::{handle_lambda_request, to_api_request, to_lambda_response};
pub use notification_dispatcher::{NOTIFICATION_TIMEOUT, NotificationDispatcher, NotificationHandle};
pub use upload_service::{StorageStatus, UploadError, UploadGrant, UploadService};
