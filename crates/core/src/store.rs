//! Storage-facing error type shared by every port.
//!
//! Repositories translate their driver errors into `StoreError` so that raw
//! database errors never reach callers of the core services.

use thiserror::Error;

/// Result alias used by port traits.
pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque failure reported by a storage adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The underlying store failed (connection, statement, commit).
    #[error("Storage failure: {0}")]
    Backend(String),

    /// A row violated a shape invariant (e.g. both participant columns set).
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A guarded write found the row changed underneath it.
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// The row a write targeted no longer exists.
    #[error("Record vanished: {0}")]
    Missing(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "DATABASE_ERROR",
            Self::Corrupt(_) => "CORRUPT_RECORD",
            Self::Conflict(_) => "CONCURRENT_MODIFICATION",
            Self::Missing(_) => "RECORD_MISSING",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Conflict(_) => 409,
            Self::Missing(_) => 404,
            Self::Backend(_) | Self::Corrupt(_) => 500,
        }
    }
}

impl From<StoreError> for splitledger_shared::AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Missing(msg) => Self::NotFound(msg),
            StoreError::Backend(msg) => Self::Database(msg),
            StoreError::Corrupt(msg) => Self::Internal(msg),
        }
    }
}
