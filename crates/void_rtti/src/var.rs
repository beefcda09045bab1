//! Concrete variants
//!
//! [`Var`] joins one storage policy and one access policy over a single
//! static type and implements [`DynVar`] for it.
//!
//! ```ignore
//! use void_rtti::{Var, ReadOnly, DynVar};
//!
//! let count = Var::direct(0i32);
//! count.set_double(5.0);
//! assert_eq!(count.get_int(), 5);
//!
//! let id = Var::<_, ReadOnly>::direct_with_access(7u32);
//! id.set_uint32(1); // ignored
//! ```

use std::rc::Rc;

use crate::access::{AccessPolicy, ReadWrite, VarAccess};
use crate::dyn_var::DynVar;
use crate::storage::{DirectValue, GetSet, ModifyAttr, StorageKind, VarStorage};
use crate::types::{VarType, VarTypeInfo};
use crate::value::VarValue;

pub struct Var<S: VarStorage, A: AccessPolicy = ReadWrite> {
    access: VarAccess<S, A>,
    default: S::Value,
}

impl<T: VarTypeInfo> Var<DirectValue<T>, ReadWrite> {
    /// Inline, mutable variant initialized to `default`
    pub fn direct(default: T) -> Self {
        Self::direct_with_access(default)
    }
}

impl<T: VarTypeInfo, A: AccessPolicy> Var<DirectValue<T>, A> {
    pub fn direct_with_access(default: T) -> Self {
        Self {
            access: VarAccess::new(DirectValue::new(default.clone())),
            default,
        }
    }
}

impl<T: VarTypeInfo> Var<GetSet<T>, ReadWrite> {
    /// Variant behind owner accessors. The accessors are not called here:
    /// the owner may not be fully built yet.
    pub fn get_set(
        default: T,
        getter: impl Fn() -> T + 'static,
        setter: impl Fn(T) + 'static,
    ) -> Self {
        Self::get_set_with_access(default, getter, setter)
    }
}

impl<T: VarTypeInfo, A: AccessPolicy> Var<GetSet<T>, A> {
    pub fn get_set_with_access(
        default: T,
        getter: impl Fn() -> T + 'static,
        setter: impl Fn(T) + 'static,
    ) -> Self {
        Self {
            access: VarAccess::new(GetSet::new(getter, setter)),
            default,
        }
    }
}

impl<T: VarTypeInfo> Var<ModifyAttr<T>, ReadWrite> {
    /// Variant delegating to an existing attribute. The default is written
    /// through unless the chain bottoms out in accessor storage.
    pub fn modify(default: T, target: &Rc<dyn DynVar>) -> Self {
        Self::modify_with_access(default, target)
    }
}

impl<T: VarTypeInfo, A: AccessPolicy> Var<ModifyAttr<T>, A> {
    pub fn modify_with_access(default: T, target: &Rc<dyn DynVar>) -> Self {
        let storage = ModifyAttr::new(target);
        if storage.base_kind() != StorageKind::GetSet {
            storage.write(default.clone());
        }
        Self {
            access: VarAccess::new(storage),
            default,
        }
    }
}

impl<S: VarStorage, A: AccessPolicy> Var<S, A> {
    pub fn read(&self) -> S::Value {
        self.access.read()
    }

    pub fn write(&self, value: S::Value) -> bool {
        self.access.write(value)
    }

    pub fn storage(&self) -> &S {
        self.access.storage()
    }

    /// Erase into a shareable handle
    pub fn into_dyn(self) -> Rc<dyn DynVar>
    where
        S: 'static,
    {
        Rc::new(self)
    }
}

impl<S: VarStorage, A: AccessPolicy> DynVar for Var<S, A> {
    fn var_type(&self) -> VarType {
        <S::Value as VarTypeInfo>::TYPE
    }

    fn get(&self) -> VarValue {
        self.access.read().into_value()
    }

    fn set(&self, value: VarValue) -> bool {
        self.access.write(<S::Value as VarTypeInfo>::from_value(&value))
    }

    fn default_value(&self) -> VarValue {
        self.default.clone().into_value()
    }

    fn is_read_only(&self) -> bool {
        self.access.is_read_only()
    }

    fn base_storage_kind(&self) -> StorageKind {
        self.access.storage().base_kind()
    }

    fn is_default(&self) -> bool {
        self.access.read() == self.default
    }
}
