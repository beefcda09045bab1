//! Guest-visible wrappers
//!
//! Each wrapper userdata holds a [`WrapperRef`]: a generation-checked handle
//! to a pooled record plus a weak link to the bridge. Every operation first
//! resolves the record to its live host object; an invalidated record, a
//! destroyed host or a shut down bridge all resolve to nothing, and the
//! operation returns its safe default (`nil`, no results, `false`).
//!
//! Attribute writes keep Lua's number subtypes apart: integers go through
//! `set_int64` and floats through `set_double`, so large integers stay exact.
//!
//! Guest view:
//!
//! ```lua
//! obj.Count = 5.0            -- attribute write
//! local n = obj.Count        -- attribute read
//! local kind = obj.Category  -- class property, read-only
//! obj:Reset(1, "x")          -- method call
//! obj.Changed:connect(fn)    -- signal
//! obj.OnChanged(3)           -- slot call
//! ```

use std::rc::{Rc, Weak};

use mlua::{Lua, MetaMethod, MultiValue, UserData, UserDataMethods, Value};
use void_rtti::{
    Invokable, Member, ObjectHandle, ParamDesc, RttiError, Signal, Slot, VarType, VarValue,
};

use crate::events;
use crate::marshal;
use crate::pool::{MemberRef, WrapperHandle, WrapperKind};
use crate::system::{BridgeState, Bound};

/// Handle from a userdata to its pooled record. Dropping it, which happens
/// when Lua finalizes the userdata, returns the record to its pool.
pub(crate) struct WrapperRef {
    handle: WrapperHandle,
    bridge: Weak<BridgeState>,
}

impl WrapperRef {
    pub(crate) fn new(handle: WrapperHandle, bridge: Weak<BridgeState>) -> Self {
        Self { handle, bridge }
    }

    pub(crate) fn bound(&self) -> Option<Bound> {
        let bridge = self.bridge.upgrade()?;
        BridgeState::resolve(&bridge, self.handle)
    }

    pub(crate) fn target(&self) -> Option<ObjectHandle> {
        self.bridge.upgrade()?.target(self.handle)
    }

    /// Same host object, and same member for member wrappers
    fn same_binding(&self, other: &WrapperRef) -> bool {
        let (Some(a), Some(b)) = (self.bound(), other.bound()) else {
            return false;
        };
        if a.target != b.target {
            return false;
        }
        match (&a.member, &b.member) {
            (None, None) => true,
            (Some(x), Some(y)) => x.ptr_eq(y),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        let kind = match self.handle.kind {
            WrapperKind::Object => "object",
            WrapperKind::Method => "method",
            WrapperKind::Signal => "signal",
            WrapperKind::Slot => "slot",
        };
        match self.bound() {
            Some(bound) => match &bound.member {
                Some(member) => format!("{kind} {:?} of '{}'", member, bound.object.name()),
                None => format!("{kind} '{}' ({})", bound.object.name(), bound.object.class().name()),
            },
            None => format!("{kind} (invalid)"),
        }
    }
}

impl Drop for WrapperRef {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.upgrade() {
            bridge.release_wrapper(self.handle);
        }
    }
}

trait Wrapped: 'static {
    fn wrapper(&self) -> &WrapperRef;
}

fn equals<T: Wrapped>(this: &T, other: &Value) -> bool {
    let Value::UserData(userdata) = other else {
        return false;
    };
    match userdata.borrow::<T>() {
        Ok(other) => this.wrapper().same_binding(other.wrapper()),
        Err(_) => false,
    }
}

fn no_such_member(object: &str, member: &str) -> mlua::Error {
    mlua::Error::external(RttiError::NoSuchMember {
        object: object.to_string(),
        member: member.to_string(),
    })
}

/// Wrapper around a host object
pub struct ObjectWrapper(pub(crate) WrapperRef);

impl Wrapped for ObjectWrapper {
    fn wrapper(&self) -> &WrapperRef {
        &self.0
    }
}

impl ObjectWrapper {
    /// Target handle while the wrapper is bound
    pub fn target(&self) -> Option<ObjectHandle> {
        self.0.target()
    }
}

impl UserData for ObjectWrapper {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, name: String| {
            match this.0.bound() {
                Some(bound) => resolve_member(lua, &bound, &name),
                None => Ok(Value::Nil),
            }
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, this, (name, value): (String, Value)| match this.0.bound() {
                Some(bound) => assign_member(&bound, &name, &value),
                None => Ok(()),
            },
        );

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| Ok(equals(this, &other)));

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.describe()));
    }
}

/// Look `name` up on the bound object: attribute, class property, method,
/// signal, then slot
fn resolve_member(lua: &Lua, bound: &Bound, name: &str) -> mlua::Result<Value> {
    let member = match bound.object.resolve(name) {
        Some(member) => member,
        None => return Err(no_such_member(bound.object.name(), name)),
    };
    match member {
        Member::Attribute(var) => marshal::push_value(lua, &bound.bridge, &var.get()),
        Member::Property(value) => Ok(Value::String(lua.create_string(&value)?)),
        Member::Method(method) => BridgeState::wrap(
            &bound.bridge,
            lua,
            WrapperKind::Method,
            bound.target,
            Some(MemberRef::Method(method)),
        ),
        Member::Signal(signal) => BridgeState::wrap(
            &bound.bridge,
            lua,
            WrapperKind::Signal,
            bound.target,
            Some(MemberRef::Signal(signal)),
        ),
        Member::Slot(slot) => BridgeState::wrap(
            &bound.bridge,
            lua,
            WrapperKind::Slot,
            bound.target,
            Some(MemberRef::Slot(slot)),
        ),
    }
}

/// Write a guest value into the named attribute with the setter matching
/// the value's kind. Values with no matching setter are dropped.
fn assign_member(bound: &Bound, name: &str, value: &Value) -> mlua::Result<()> {
    let Some(var) = bound.object.var(name) else {
        return Err(no_such_member(bound.object.name(), name));
    };
    let written = match value {
        Value::Nil => match var.var_type() {
            ty if ty.is_address() => var.set(VarValue::default_for(ty)),
            ty => {
                log::debug!("ignored nil assigned to {} attribute '{}'", ty, name);
                false
            }
        },
        Value::Boolean(b) => var.set_bool(*b),
        Value::Integer(n) => var.set_int64(*n),
        Value::Number(n) => var.set_double(*n),
        Value::String(s) => var.set_string(&s.to_string_lossy()),
        Value::UserData(_) => match marshal::object_target(value) {
            Some(handle) => var.set_object(handle),
            None => {
                log::debug!("ignored non-object userdata assigned to '{}'", name);
                false
            }
        },
        other => {
            log::debug!("ignored Lua {} assigned to '{}'", other.type_name(), name);
            false
        }
    };
    if !written {
        log::trace!("assignment to '{}' on '{}' had no effect", name, bound.object.name());
    }
    Ok(())
}

/// Drop a leading `obj:` receiver. A leading argument equal to the target
/// is kept when the first declared parameter takes an object and there is
/// no surplus argument.
fn strip_receiver(mut args: Vec<Value>, target: ObjectHandle, params: &[ParamDesc]) -> Vec<Value> {
    let leads_with_target = args
        .first()
        .and_then(marshal::object_target)
        .is_some_and(|h| h == target);
    if !leads_with_target {
        return args;
    }
    let first_takes_object = params
        .first()
        .is_some_and(|p| p.var_type == VarType::ObjectPointer);
    if !first_takes_object || args.len() > params.len() {
        args.remove(0);
    }
    args
}

fn call_member(lua: &Lua, this: &WrapperRef, args: MultiValue) -> mlua::Result<MultiValue> {
    let Some(bound) = this.bound() else {
        return Ok(MultiValue::new());
    };
    let args: Vec<Value> = args.into_iter().collect();
    match &bound.member {
        Some(MemberRef::Method(method)) => {
            let args = strip_receiver(args, bound.target, method.params());
            marshal::invoke(lua, &bound.bridge, &bound.object, method.as_ref(), &args)
        }
        Some(MemberRef::Slot(slot)) => {
            let args = strip_receiver(args, bound.target, slot.params());
            marshal::invoke(lua, &bound.bridge, &bound.object, slot.as_ref(), &args)
        }
        _ => Ok(MultiValue::new()),
    }
}

/// Wrapper around one method of a host object
pub struct MethodWrapper(pub(crate) WrapperRef);

impl Wrapped for MethodWrapper {
    fn wrapper(&self) -> &WrapperRef {
        &self.0
    }
}

impl UserData for MethodWrapper {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Call, |lua, this, args: MultiValue| {
            call_member(lua, &this.0, args)
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| Ok(equals(this, &other)));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.describe()));
    }
}

/// Wrapper around one signal of a host object
pub struct SignalWrapper(pub(crate) WrapperRef);

impl Wrapped for SignalWrapper {
    fn wrapper(&self) -> &WrapperRef {
        &self.0
    }
}

impl SignalWrapper {
    fn signal(&self) -> Option<(Bound, Rc<Signal>)> {
        let bound = self.0.bound()?;
        match &bound.member {
            Some(MemberRef::Signal(signal)) => {
                let signal = signal.clone();
                Some((bound, signal))
            }
            _ => None,
        }
    }
}

impl UserData for SignalWrapper {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("connect", |lua, this, handler: Value| {
            let Some((bound, signal)) = this.signal() else {
                return Ok(false);
            };
            match handler {
                Value::Function(callable) => events::connect(lua, &bound.bridge, &signal, callable),
                Value::UserData(userdata) => match userdata.borrow::<SlotWrapper>() {
                    Ok(slot) => Ok(slot.slot().is_some_and(|s| signal.connect(&s))),
                    Err(_) => Ok(false),
                },
                other => Err(mlua::Error::RuntimeError(format!(
                    "cannot connect a {} to signal '{}'",
                    other.type_name(),
                    signal.name()
                ))),
            }
        });

        methods.add_method("disconnect", |lua, this, handler: Value| {
            let Some((bound, signal)) = this.signal() else {
                return Ok(false);
            };
            let disconnected = match handler {
                Value::Function(callable) => {
                    events::disconnect(lua, &bound.bridge, &signal, &callable)
                }
                Value::UserData(userdata) => match userdata.borrow::<SlotWrapper>() {
                    Ok(slot) => slot.slot().is_some_and(|s| signal.disconnect(&s)),
                    Err(_) => false,
                },
                _ => false,
            };
            Ok(disconnected)
        });

        methods.add_method("emit", |_, this, args: MultiValue| {
            let Some((_bound, signal)) = this.signal() else {
                return Ok(0);
            };
            let args: Vec<Value> = args.into_iter().collect();
            let values: Vec<VarValue> = if signal.params().is_empty() {
                args.iter().map(marshal::infer_value).collect()
            } else {
                signal
                    .params()
                    .iter()
                    .enumerate()
                    .map(|(i, param)| match args.get(i) {
                        Some(arg) => marshal::read_value(arg, param.var_type),
                        None => VarValue::default_for(param.var_type),
                    })
                    .collect()
            };
            Ok(signal.emit(&values))
        });

        methods.add_method("connections", |_, this, ()| {
            Ok(this.signal().map(|(_, s)| s.connection_count()).unwrap_or(0))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| Ok(equals(this, &other)));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.describe()));
    }
}

/// Wrapper around one slot of a host object
pub struct SlotWrapper(pub(crate) WrapperRef);

impl Wrapped for SlotWrapper {
    fn wrapper(&self) -> &WrapperRef {
        &self.0
    }
}

impl SlotWrapper {
    fn slot(&self) -> Option<Rc<Slot>> {
        match self.0.bound()?.member {
            Some(MemberRef::Slot(slot)) => Some(slot),
            _ => None,
        }
    }
}

impl UserData for SlotWrapper {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Call, |lua, this, args: MultiValue| {
            call_member(lua, &this.0, args)
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| Ok(equals(this, &other)));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.describe()));
    }
}
