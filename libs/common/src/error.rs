//! Custom error types for the common library
//!
//! This module defines the typed failures surfaced by the database and cache
//! adapters. Callers branch on variants, never on message text.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A scoped statement matched no rows
    #[error("No matching row")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The pool could not hand out a connection in time
    #[error("Database operation timed out")]
    Timeout,

    /// A stored value could not be mapped back to a domain type
    #[error("Failed to decode stored value: {0}")]
    Decode(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => DatabaseError::NotFound,
            SqlxError::PoolTimedOut => DatabaseError::Timeout,
            SqlxError::Database(ref db) if db.is_unique_violation() => {
                DatabaseError::UniqueViolation(
                    db.constraint().unwrap_or("unknown constraint").to_string(),
                )
            }
            other => DatabaseError::Query(other),
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Custom error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// The key is absent or its TTL elapsed
    #[error("Cache key not found: {key}")]
    NotFound { key: String },

    /// The cache backend could not be reached or rejected the command
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A cached value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Cache configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Whether this is the expected "no entry" case rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
