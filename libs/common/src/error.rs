//! Typed infrastructure errors shared by the services.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors raised while talking to PostgreSQL
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Could not open a connection or the pool timed out
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// A query failed
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Errors raised while talking to Redis
#[derive(Error, Debug)]
pub enum CacheError {
    /// Could not open a client or a connection
    #[error("Cache connection error: {0}")]
    Connection(#[source] redis::RedisError),

    /// A command failed
    #[error("Cache command error: {0}")]
    Command(#[source] redis::RedisError),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
