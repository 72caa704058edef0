//! Error types for feedy.
//!
//! Errors come in two tiers. An [`FeedyError::Expected`] error carries a short
//! reason meant to be shown to the chat user who triggered the operation.
//! Every other variant is an infrastructure fault that is logged, never shown.

use thiserror::Error;

use crate::channeltalk::ClientError;

/// Common error type for feedy.
#[derive(Error, Debug)]
pub enum FeedyError {
    /// Business-rule failure with a user-facing reason.
    #[error("{reason}")]
    Expected {
        /// Text delivered to the chat group.
        reason: String,
        /// Underlying fault, if any.
        #[source]
        source: Option<Box<FeedyError>>,
    },

    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feed retrieval or parsing error.
    #[error("feed error: {0}")]
    Feed(String),

    /// Messaging API error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FeedyError {
    /// Create an expected error without an underlying cause.
    pub fn expected(reason: impl Into<String>) -> Self {
        FeedyError::Expected {
            reason: reason.into(),
            source: None,
        }
    }

    /// Reclassify this error as expected, attaching a user-facing reason.
    pub fn with_reason(self, reason: impl Into<String>) -> Self {
        FeedyError::Expected {
            reason: reason.into(),
            source: Some(Box::new(self)),
        }
    }

    /// The user-facing reason, if this is an expected error.
    pub fn reason(&self) -> Option<&str> {
        match self {
            FeedyError::Expected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Whether this error should be reported to the chat user.
    pub fn is_expected(&self) -> bool {
        matches!(self, FeedyError::Expected { .. })
    }
}

impl From<sqlx::Error> for FeedyError {
    fn from(e: sqlx::Error) -> Self {
        FeedyError::Database(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for FeedyError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        FeedyError::Database(format!("migration failed: {e}"))
    }
}

/// Result type alias for feedy operations.
pub type Result<T> = std::result::Result<T, FeedyError>;
