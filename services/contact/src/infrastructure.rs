// Infrastructure layer modules
pub mod config;
pub mod email_sender;
pub mod logging;
pub mod object_storage;
pub mod sqlite_submission_repository;
pub mod submission_repository;

// Re-exports
pub use config::{
    AppConfig, ConfigError, DEFAULT_AWS_REGION, DEFAULT_NOTIFICATION_RECIPIENT,
    DEFAULT_NOTIFICATION_SENDER, EmailConfig, ObjectStorageConfig, StoreConfig,
};
pub use email_sender::{EmailError, EmailMessage, EmailSender, SendGridEmailSender};
pub use logging::{DEFAULT_LOG_LEVEL, init_logging};
#[cfg(test)]
pub use logging::init_test_logging;
pub use object_storage::{ObjectStorage, ObjectStorageError, S3ObjectStorage, StorageLocation};
pub use sqlite_submission_repository::SqliteSubmissionRepository;
pub use submission_repository::{InMemorySubmissionRepository, StoreError, SubmissionRepository};
