//! # void_core - Void Engine Core
//!
//! Zero-dependency primitives shared by the reflection and scripting
//! crates:
//! - **Handles**: generation-checked indices that detect use-after-free
//! - **Pools**: free lists that recycle values instead of reallocating
//! - **Errors**: why a handle fails to resolve

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod handle;
pub mod pool;
pub mod error;

pub use handle::*;
pub use pool::*;
pub use error::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::handle::{Handle, HandleMap};
    pub use crate::pool::{Pool, PoolStats, Recycle};
    pub use crate::error::HandleError;
}
