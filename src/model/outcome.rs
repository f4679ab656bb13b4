//! Tagged query results.

use serde::{Deserialize, Serialize};

/// Message carried by every catalog failure.
pub const MEDIA_STORE_QUERY_ERROR: &str = "media store query error";

/// Failure categories a query can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The requested path is not a directory.
    NonExistingDir,
    /// Listing the directory failed.
    AccessDenied,
    /// The media catalog produced no result.
    Internal,
}

/// Result of one query emission. Failures travel through the same stream as
/// successes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome<T> {
    Success { value: T },
    Failure { kind: FailureKind, message: String },
}

impl<T> QueryOutcome<T> {
    /// Successful outcome.
    pub const fn success(value: T) -> Self {
        Self::Success { value }
    }

    /// Failure for a path that does not resolve to a directory.
    pub fn non_existing_dir(path: &str) -> Self {
        Self::Failure {
            kind: FailureKind::NonExistingDir,
            message: format!("Dir not existing: {path}"),
        }
    }

    /// Failure for a directory that could not be listed.
    pub fn access_denied(path: &str) -> Self {
        Self::Failure {
            kind: FailureKind::AccessDenied,
            message: format!("Access denied: {path}"),
        }
    }

    /// Failure for a catalog query that returned nothing.
    pub fn media_store_error() -> Self {
        Self::Failure {
            kind: FailureKind::Internal,
            message: MEDIA_STORE_QUERY_ERROR.to_string(),
        }
    }

    /// Internal failure with a custom message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Failure {
            kind: FailureKind::Internal,
            message: message.into(),
        }
    }

    /// Whether this is a success.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, if any.
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// The success value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    /// Map the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryOutcome<U> {
        match self {
            Self::Success { value } => QueryOutcome::Success { value: f(value) },
            Self::Failure { kind, message } => QueryOutcome::Failure { kind, message },
        }
    }
}
