// Domain layer modules
pub mod contact_submission;
pub mod submission_validator;
pub mod upload_request;

// Re-exports
pub use contact_submission::{
    ContactSubmission, ContactSubmissionInput, DEFAULT_STATUS, current_timestamp,
};
pub use submission_validator::{
    FieldError, SubmissionValidator, ValidationError, ValidationErrors, is_valid_email,
};
pub use upload_request::{
    ALLOWED_CONTENT_TYPES, MAX_FILE_SIZE, UPLOAD_URL_EXPIRY_SECS, UploadRequest,
    UploadRequestError,
};
