//! # void_lua - Lua Script Bridge
//!
//! Exposes reflected host objects to Lua 5.4:
//! - **Wrappers**: object, method, signal and slot userdata resolved by
//!   name against a [`HostObject`](void_rtti::HostObject)
//! - **Marshalling**: guest calls travel as parameter strings (text mode)
//!   or as typed values (typed mode), selected by [`BridgeConfig`]
//! - **Events**: host signals call guest closures
//! - **Lifecycle**: pooled wrapper records invalidated when their host
//!   object is destroyed, shared state started and stopped by reference
//!   counting in [`ScriptSystem`]
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use void_lua::prelude::*;
//! use void_rtti::prelude::*;
//!
//! let objects = Rc::new(ObjectTable::new());
//! let handle = objects.insert(
//!     HostObject::builder("player", Rc::new(Class::new("Player")))
//!         .var("Health", Var::direct(100i32))
//!         .build(),
//! );
//!
//! let system = ScriptSystem::with_defaults(objects);
//! let mut runtime = ScriptRuntime::new(&system)?;
//! runtime.set_object("player", Some(handle))?;
//! runtime.execute("player.Health = player.Health - 10")?;
//! ```

pub mod config;
pub mod error;
mod events;
mod marshal;
pub mod pool;
pub mod runtime;
pub mod signature;
pub mod system;
pub mod wrapper;

pub use config::{BridgeConfig, ConfigError, MarshalConfig, MarshalMode, PoolConfig, RuntimeConfig};
pub use error::{BridgeError, FaultKind, Result};
pub use pool::{WrapperKind, WrapperState};
pub use runtime::ScriptRuntime;
pub use signature::Signature;
pub use system::ScriptSystem;
pub use wrapper::{MethodWrapper, ObjectWrapper, SignalWrapper, SlotWrapper};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{BridgeConfig, MarshalMode};
    pub use crate::error::{BridgeError, FaultKind};
    pub use crate::pool::WrapperKind;
    pub use crate::runtime::ScriptRuntime;
    pub use crate::system::ScriptSystem;
}
