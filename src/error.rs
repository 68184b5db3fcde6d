//! Error types for the storage engine.

use crate::types::{PageId, Rid};
use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage engine
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing page file does not exist
    #[error("page file not found: {0}")]
    FileNotFound(String),

    /// Requested page is outside the file's page range or not resident
    #[error("page {0} not found")]
    PageNotFound(PageId),

    /// Every frame in the buffer pool is pinned
    #[error("all frames pinned: no frame available for eviction")]
    PoolPinned,

    /// Attribute index is outside the schema
    #[error("unknown attribute {index} (schema has {count} attributes)")]
    UnknownAttribute { index: usize, count: usize },

    /// Value type does not match the attribute's declared type
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// No occupied record at the given rid
    #[error("no record at {0}")]
    RecordNotFound(Rid),

    /// Key not present in the index
    #[error("key not found")]
    KeyNotFound,

    /// Metadata page or node page could not be parsed
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl StorageError {
    /// Create an invalid metadata error with a message
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a type mismatch error with a message
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }
}
