//! Error types and Result aliases for filescope.
//!
//! These are infrastructure errors: they surface from constructors, the
//! catalog API, watcher setup and configuration. Query services never return
//! them to their callers; they fold every failure into a
//! [`QueryOutcome`](crate::model::QueryOutcome) instead.

use thiserror::Error;

/// Result type alias using filescope's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for filescope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Media catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Change watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Media catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The collection URI is not served by this catalog.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),
}

/// Change watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Observation was started outside of a Tokio runtime.
    #[error("no async runtime available to deliver change signals")]
    NoRuntime,
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl WatcherError {
    /// Create a watch failure for `path`.
    pub fn watch_failed(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::WatchFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
