//! # void_rtti - Runtime Type Information
//!
//! Dynamic reflection for host objects:
//! - **Variants**: one logical value behind a type-erased [`DynVar`]
//!   interface with typed getters and setters for every primitive kind
//! - **Policies**: where a value lives ([`DirectValue`], [`GetSet`],
//!   [`ModifyAttr`]) and whether it may change ([`ReadWrite`], [`ReadOnly`])
//! - **Descriptors**: name-addressable member metadata
//! - **Host objects**: attributes, methods, signals and slots owned by an
//!   [`ObjectTable`] and addressed by generation-checked handles
//! - **Parameter strings**: the text format calls travel in
//!
//! ## Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use void_rtti::prelude::*;
//!
//! let class = Rc::new(Class::new("Counter").with_property("Category", "Demo"));
//! let object = HostObject::builder("counter", class)
//!     .var("Count", Var::direct(0i32))
//!     .signal(Signal::new("Changed", ParamDesc::positional(&[VarType::Int32])))
//!     .build();
//!
//! let table = ObjectTable::new();
//! let handle = table.insert(object);
//! let count = table.get(handle).and_then(|o| o.var("Count")).unwrap();
//! count.set_double(5.0);
//! assert_eq!(count.get_int(), 5);
//! ```

pub mod types;
pub mod value;
pub mod dyn_var;
pub mod storage;
pub mod access;
pub mod var;
pub mod attribute;
pub mod descriptor;
pub mod class;
pub mod object;
pub mod signal;
pub mod method;
pub mod params;
pub mod error;

pub use types::{RawPointer, RawReference, VarType, VarTypeInfo};
pub use value::VarValue;
pub use dyn_var::DynVar;
pub use storage::{DirectValue, GetSet, ModifyAttr, StorageKind, VarStorage};
pub use access::{AccessPolicy, ReadOnly, ReadWrite, VarAccess};
pub use var::Var;
pub use attribute::Attribute;
pub use descriptor::{MemberDesc, MemberKind, ParamDesc, VarDesc};
pub use class::Class;
pub use object::{HostObject, HostObjectBuilder, Member, ObjectHandle, ObjectTable, SubscriptionId};
pub use signal::{Signal, Slot};
pub use method::{Invokable, Method};
pub use params::{ParamBlock, ParamToken, ParamWriter, TempStrings};
pub use error::{Result, RttiError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::types::{VarType, VarTypeInfo};
    pub use crate::value::VarValue;
    pub use crate::dyn_var::DynVar;
    pub use crate::storage::{DirectValue, GetSet, ModifyAttr, StorageKind};
    pub use crate::access::{ReadOnly, ReadWrite};
    pub use crate::var::Var;
    pub use crate::attribute::Attribute;
    pub use crate::descriptor::{MemberDesc, MemberKind, ParamDesc, VarDesc};
    pub use crate::class::Class;
    pub use crate::object::{HostObject, Member, ObjectHandle, ObjectTable};
    pub use crate::signal::{Signal, Slot};
    pub use crate::method::{Invokable, Method};
    pub use crate::error::RttiError;
}
