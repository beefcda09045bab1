//! Error types for the Lua bridge

use thiserror::Error;
use void_rtti::RttiError;

use crate::config::ConfigError;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced to the embedding host
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Fault raised by guest code or while calling into it
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reflection error: {0}")]
    Rtti(#[from] RttiError),

    /// Malformed call signature
    #[error("Invalid signature '{0}'")]
    Signature(String),

    /// Named call target is missing or not callable
    #[error("No callable '{0}'")]
    NoCallTarget(String),

    /// Staged call used out of order
    #[error("Call protocol violation: {0}")]
    CallProtocol(String),

    /// The script system has no live bridge state
    #[error("Script system is not running")]
    NotRunning,
}

impl BridgeError {
    /// Coarse classification of a guest fault; `None` for host-side errors
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            BridgeError::Lua(err) => Some(FaultKind::classify(err)),
            _ => None,
        }
    }
}

/// Reason a guest call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Source did not compile
    Syntax,
    /// Allocation failure inside the guest
    Memory,
    /// A host handler invoked from the guest failed
    Handler,
    /// Error raised by guest code
    Runtime,
}

impl FaultKind {
    pub fn classify(err: &mlua::Error) -> FaultKind {
        match err {
            mlua::Error::SyntaxError { .. } => FaultKind::Syntax,
            mlua::Error::MemoryError(_) => FaultKind::Memory,
            mlua::Error::CallbackError { cause, .. } => match FaultKind::classify(cause) {
                FaultKind::Memory => FaultKind::Memory,
                _ => FaultKind::Handler,
            },
            mlua::Error::WithContext { cause, .. } => FaultKind::classify(cause),
            mlua::Error::ExternalError(_) => FaultKind::Handler,
            _ => FaultKind::Runtime,
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FaultKind::Syntax => "syntax error",
            FaultKind::Memory => "memory allocation failure",
            FaultKind::Handler => "handler invocation failure",
            FaultKind::Runtime => "runtime error",
        };
        f.write_str(name)
    }
}
