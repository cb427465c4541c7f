use std::num::ParseIntError;

use thiserror::Error;

/// Failure reported by a GitHub Issues API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The issue (or repository) does not exist, or is not visible to the token.
    #[error("github api {operation} failed: 404 Not Found")]
    NotFound { operation: String },

    /// Any other non-success HTTP status.
    #[error("github api {operation} failed with status {status}: {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode github {operation}: {message}")]
    Decode { operation: String, message: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Errors raised while parsing an `OWNER/REPOSITORY/NUMBER` import key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Invalid ID format {0:?}, must be provided as OWNER/REPOSITORY/NUMBER")]
    Format(String),

    #[error("Invalid issue number {segment:?}: {source}")]
    Number {
        segment: String,
        #[source]
        source: ParseIntError,
    },
}

/// Desired-state values rejected before any request is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Blank { field: &'static str },

    #[error("invalid issue state {0:?}, expected one of: open, closed")]
    UnknownState(String),
}

/// Error type returned by every controller verb.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("issue {key} resolved to node id {found}, but the record is bound to {expected}")]
    IdentityConflict {
        key: String,
        expected: String,
        found: String,
    },
}

pub type Result<T, E = ResourceError> = std::result::Result<T, E>;
