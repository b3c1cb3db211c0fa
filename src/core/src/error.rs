//! Error types for the permission vocabulary
//!
//! Only parsing of textual scope and resource names can fail here; every
//! other vocabulary operation is total.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Vocabulary error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Scope name is not one of the known actions or unions
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    /// Resource name is empty or blank
    #[error("Invalid resource name: {0:?}")]
    InvalidResource(String),
}

impl CoreError {
    /// Create an unknown scope error
    pub fn unknown_scope<S: Into<String>>(name: S) -> Self {
        CoreError::UnknownScope(name.into())
    }

    /// Create an invalid resource error
    pub fn invalid_resource<S: Into<String>>(name: S) -> Self {
        CoreError::InvalidResource(name.into())
    }
}
