//! Error handling module
//!
//! Fatal errors surface as [`LoaderError`] and end the run with a non-zero
//! exit code. Recoverable conditions (unreadable files, a single failed
//! upsert) never become errors here; they are reported as events instead.

use thiserror::Error;

/// Configuration problems detected before any I/O happens
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Errors raised while talking to the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not connect to database after {attempts} attempts: {message}")]
    Connect { attempts: u32, message: String },

    #[error("Database connection lost: {0}")]
    ConnectionLost(String),

    #[error("Database error: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Transaction is no longer usable: {0}")]
    Transaction(String),

    #[error("Failed to serialize policy metadata: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether the underlying connection is unusable for further work.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            StoreError::ConnectionLost(_) => true,
            StoreError::Query(e) => e.is_closed(),
            StoreError::Pool(_) => true,
            _ => false,
        }
    }

    /// Whether the run's transaction can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Transaction(_)) || self.is_connection_lost()
    }
}

/// Terminal errors for a loader run
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] StoreError),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for a complete run
pub type LoaderResult<T> = Result<T, LoaderError>;
