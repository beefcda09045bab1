//! Error types for the core library

use core::fmt;

/// Reasons a handle fails to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Handle is null
    Null,
    /// Handle is stale (generation mismatch)
    Stale,
    /// Slot exists but is being torn down
    Dying,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::Null => write!(f, "Handle is null"),
            HandleError::Stale => write!(f, "Handle is stale (already freed)"),
            HandleError::Dying => write!(f, "Handle refers to an object being destroyed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HandleError {}
