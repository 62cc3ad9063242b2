//! Unified Error Handling
//!
//! Application-level error taxonomy. Every variant maps to a stable error
//! code for callers that surface errors outside the process (CLI exit
//! messages, logs).

use folio_printer::PrintError;
use tracing::error;

use crate::store::{FailureKind, StorageError};

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Storage Errors ==========
    /// Device storage unavailable, full or corrupted; the operation did
    /// not happen
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    // ========== Business Logic Errors ==========
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// Reserved folio no longer matches the counter at commit time
    #[error("Sequencing conflict: reserved folio {reserved}, counter at {current}")]
    SequencingConflict { reserved: String, current: String },

    /// Backup file rejected; the store was not touched
    #[error("Import rejected: {0}")]
    ImportRejected(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // ========== Rendering Errors ==========
    #[error("Render failed: {0}")]
    Render(#[from] PrintError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn import_rejected(msg: impl Into<String>) -> Self {
        AppError::ImportRejected(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "E0002",
            AppError::NotFound(_) => "E0003",
            AppError::SequencingConflict { .. } => "E0004",
            AppError::ImportRejected(_) => "E0007",
            AppError::Cancelled => "E0008",
            AppError::Internal(_) => "E9001",
            AppError::StorageFailure(e) => match e.failure_kind() {
                FailureKind::Full => "E9004",
                FailureKind::Corrupted => "E9005",
                FailureKind::Unavailable => "E9002",
            },
            AppError::Render(_) => "E9003",
        }
    }

    /// Log with the level the variant deserves and hand the error back
    pub fn logged(self) -> Self {
        match &self {
            AppError::StorageFailure(e) => {
                error!(error = %e, kind = ?e.failure_kind(), code = self.code(), "Storage error occurred");
            }
            AppError::Internal(msg) => {
                error!(error = %msg, code = self.code(), "Internal error occurred");
            }
            _ => {}
        }
        self
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::StorageFailure(StorageError::Serialization(e))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::internal(format!("Background task failed: {e}"))
    }
}

/// Application-level Result type
pub type AppResult<T> = Result<T, AppError>;
