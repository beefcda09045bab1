//! Error types for the reflection layer

use thiserror::Error;
use void_core::HandleError;

/// Result type for reflection operations
pub type Result<T> = std::result::Result<T, RttiError>;

/// Errors raised by the reflection layer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RttiError {
    /// Type name not in the type table
    #[error("Unknown type name '{0}'")]
    UnknownType(String),

    /// Object has no member with this name
    #[error("Object '{object}' has no member '{member}'")]
    NoSuchMember {
        object: String,
        member: String,
    },

    /// Member exists but cannot be written
    #[error("Member '{0}' is read-only")]
    ReadOnly(String),

    /// Object handle did not resolve
    #[error("Object handle error: {0}")]
    Handle(#[from] HandleError),

    /// Malformed call signature
    #[error("Invalid signature '{signature}': {message}")]
    InvalidSignature {
        signature: String,
        message: String,
    },
}
