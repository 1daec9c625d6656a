//! Error types for the data access layer.
//!
//! Everything that crosses the repository boundary is funneled into a single
//! [`DataAccessError`] carrying the operation, the collection and the
//! underlying cause, so callers branch on structured fields instead of
//! parsing messages.

use std::fmt;

use thiserror::Error;

/// Failures reported by a remote document store.
#[derive(Debug, Error)]
pub enum RemoteStoreError {
    /// Network or service failure that a retry could plausibly fix.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// The store or an access policy refused the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The store answered with something the adapter could not interpret.
    #[error("malformed store response: {0}")]
    InvalidResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemoteStoreError {
    /// Whether the retry executor should attempt this call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Repository operation names carried in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAll,
    GetById,
    Create,
    Update,
    Delete,
    Query,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetAll => "get_all",
            Self::GetById => "get_by_id",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause attached to a [`DataAccessError`].
#[derive(Debug, Error)]
pub enum ErrorCause {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Remote(#[from] RemoteStoreError),
}

/// The single error type surfaced across the repository boundary.
#[derive(Debug, Error)]
#[error("{operation} failed for collection '{collection}': {message}")]
pub struct DataAccessError {
    pub operation: Operation,
    pub collection: String,
    pub message: String,
    #[source]
    pub cause: Option<ErrorCause>,
}

impl DataAccessError {
    /// Wrap a remote failure after retries are exhausted (or skipped).
    pub fn remote(operation: Operation, collection: &str, cause: RemoteStoreError) -> Self {
        Self {
            operation,
            collection: collection.to_string(),
            message: cause.to_string(),
            cause: Some(ErrorCause::Remote(cause)),
        }
    }

    /// Wrap a write-side validation failure. No network call was made.
    pub fn validation(operation: Operation, collection: &str, errors: Vec<String>) -> Self {
        Self {
            operation,
            collection: collection.to_string(),
            message: format!("validation failed with {} violation(s)", errors.len()),
            cause: Some(ErrorCause::Validation(errors)),
        }
    }

    /// An error with no machine-readable cause, e.g. updating a missing id.
    pub fn message(operation: Operation, collection: &str, message: impl Into<String>) -> Self {
        Self {
            operation,
            collection: collection.to_string(),
            message: message.into(),
            cause: None,
        }
    }

    /// The violation list when this error was caused by validation.
    pub fn validation_errors(&self) -> Option<&[String]> {
        match &self.cause {
            Some(ErrorCause::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}

pub type DataResult<T> = Result<T, DataAccessError>;
