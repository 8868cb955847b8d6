//! Store error types.

use thiserror::Error;

/// Keyed store error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A table needs at least one bucket.
    #[error("bucket count must be greater than zero")]
    ZeroBuckets,

    /// Key already present on insert.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Key absent.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The bucket array could not be allocated.
    #[error("failed to allocate {buckets} buckets")]
    Allocation { buckets: usize },
}

impl StoreError {
    /// Create a Duplicate error.
    pub fn duplicate(key: impl Into<String>) -> Self {
        Self::Duplicate(key.into())
    }

    /// Create a NotFound error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;
