//! Error types for the Virava authorization crate

use thiserror::Error;
use virava_core::CoreError;

/// Closed set of failure kinds
///
/// Absence conditions (unknown caller role, missing claim, unparsable
/// instance id) are not errors and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViravaError {
    /// Invalid static configuration; the process must not start
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token rejected; every verification failure collapses into this kind
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated caller lacks the permissions an operation requires
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl ViravaError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        ViravaError::Configuration(msg.into())
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        ViravaError::Authentication(msg.into())
    }

    /// Create an access denied error
    pub fn access_denied<S: Into<String>>(msg: S) -> Self {
        ViravaError::AccessDenied(msg.into())
    }
}

impl From<CoreError> for ViravaError {
    fn from(err: CoreError) -> Self {
        ViravaError::Configuration(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ViravaError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ViravaError::Authentication(err.to_string())
    }
}

/// Result type for Virava operations
pub type Result<T> = std::result::Result<T, ViravaError>;
