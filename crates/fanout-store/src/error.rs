//! Error types for deployment stores.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a store can report for a create or update call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("deployment {0} already exists")]
    AlreadyExists(String),

    #[error("deployment {0} not found")]
    NotFound(String),

    #[error("api server rejected request ({code} {reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("invalid deployment: {0}")]
    Invalid(String),

    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl StoreError {
    /// True when the object already exists and an update may follow.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}
