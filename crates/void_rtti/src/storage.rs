//! Storage policies
//!
//! A storage policy decides where a variant's value physically lives:
//! - [`DirectValue`]: inline in the variant
//! - [`GetSet`]: behind an accessor pair bound to the owning object
//! - [`ModifyAttr`]: in another, already registered attribute

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::dyn_var::DynVar;
use crate::types::VarTypeInfo;

/// Which storage policy backs a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Direct,
    GetSet,
    ModifyAttr,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Direct => "direct",
            StorageKind::GetSet => "get/set",
            StorageKind::ModifyAttr => "modify-attr",
        };
        f.write_str(name)
    }
}

pub trait VarStorage {
    type Value: VarTypeInfo;

    fn read(&self) -> Self::Value;

    fn write(&self, value: Self::Value);

    fn kind(&self) -> StorageKind;

    /// Storage kind at the end of any delegation chain
    fn base_kind(&self) -> StorageKind {
        self.kind()
    }
}

/// Value embedded in the variant
pub struct DirectValue<T> {
    value: RefCell<T>,
}

impl<T: VarTypeInfo> DirectValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }
}

impl<T: VarTypeInfo> VarStorage for DirectValue<T> {
    type Value = T;

    fn read(&self) -> T {
        self.value.borrow().clone()
    }

    fn write(&self, value: T) {
        *self.value.borrow_mut() = value;
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Direct
    }
}

type Getter<T> = Box<dyn Fn() -> T>;
type Setter<T> = Box<dyn Fn(T)>;

/// Value behind accessor closures supplied by the owner.
///
/// The closures capture whatever owner state they need; the storage never
/// calls them on its own, so building one cannot run owner code early.
pub struct GetSet<T> {
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T: VarTypeInfo> GetSet<T> {
    pub fn new(getter: impl Fn() -> T + 'static, setter: impl Fn(T) + 'static) -> Self {
        Self {
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }
}

impl<T: VarTypeInfo> VarStorage for GetSet<T> {
    type Value = T;

    fn read(&self) -> T {
        (self.getter)()
    }

    fn write(&self, value: T) {
        (self.setter)(value)
    }

    fn kind(&self) -> StorageKind {
        StorageKind::GetSet
    }
}

/// Value delegated to an existing attribute.
///
/// Holds a non-owning reference; once the target is gone reads yield the
/// type default and writes are dropped.
pub struct ModifyAttr<T> {
    target: Weak<dyn DynVar>,
    base_kind: StorageKind,
    _marker: PhantomData<T>,
}

impl<T: VarTypeInfo> ModifyAttr<T> {
    pub fn new(target: &Rc<dyn DynVar>) -> Self {
        Self {
            target: Rc::downgrade(target),
            base_kind: target.base_storage_kind(),
            _marker: PhantomData,
        }
    }

    pub fn target(&self) -> Option<Rc<dyn DynVar>> {
        self.target.upgrade()
    }
}

impl<T: VarTypeInfo> VarStorage for ModifyAttr<T> {
    type Value = T;

    fn read(&self) -> T {
        match self.target.upgrade() {
            Some(target) => T::from_value(&target.get()),
            None => T::default_value(),
        }
    }

    fn write(&self, value: T) {
        match self.target.upgrade() {
            Some(target) => {
                target.set(value.into_value());
            }
            None => log::debug!("modify-attr write dropped: target attribute is gone"),
        }
    }

    fn kind(&self) -> StorageKind {
        StorageKind::ModifyAttr
    }

    fn base_kind(&self) -> StorageKind {
        self.base_kind
    }
}
