//! Host signal to guest closure bridge
//!
//! A guest closure connected to a host signal is registered under
//! `(runtime, signal, closure)` identity. Connecting the same closure to the
//! same signal again reuses the registered slot, so a signal never calls a
//! closure twice per emission. Disconnecting detaches the slot but keeps the
//! registration until its runtime is torn down.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use mlua::{Function, Lua, MultiValue, RegistryKey, WeakLua};
use void_rtti::{Signal, Slot, VarValue};

use crate::marshal;
use crate::system::BridgeState;

/// Identity of one guest runtime inside a script system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RuntimeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EventKey {
    runtime: u64,
    signal: usize,
    callable: usize,
}

pub(crate) struct Registration {
    slot: Rc<Slot>,
    signal: Weak<Signal>,
}

impl Registration {
    /// Detach the slot from its signal, if the signal is still around
    pub(crate) fn disconnect(&self) {
        if let Some(signal) = self.signal.upgrade() {
            signal.disconnect(&self.slot);
        }
    }
}

/// Everything needed to call a guest closure from a host signal
struct DispatchRecord {
    lua: WeakLua,
    callback: RegistryKey,
    bridge: Weak<BridgeState>,
    signal_name: String,
}

impl DispatchRecord {
    /// Push the arguments and call the closure. Failures are logged and
    /// never reach the emitter.
    fn dispatch(&self, args: &[VarValue]) {
        let Some(lua) = self.lua.try_upgrade() else {
            log::debug!("signal '{}' fired after its runtime closed", self.signal_name);
            return;
        };
        let Some(bridge) = self.bridge.upgrade() else {
            log::debug!("signal '{}' fired after the bridge shut down", self.signal_name);
            return;
        };
        if let Err(err) = self.call(&lua, &bridge, args) {
            log::error!("handler for signal '{}' failed: {}", self.signal_name, err);
        }
    }

    fn call(&self, lua: &Lua, bridge: &Rc<BridgeState>, args: &[VarValue]) -> mlua::Result<()> {
        let callback: Function = lua.registry_value(&self.callback)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(marshal::push_value(lua, bridge, arg)?);
        }
        callback.call::<()>(MultiValue::from_vec(values))
    }
}

#[derive(Default)]
pub(crate) struct EventRegistry {
    registrations: HashMap<EventKey, Registration>,
}

impl EventRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    fn slot_for(&self, key: &EventKey) -> Option<Rc<Slot>> {
        self.registrations.get(key).map(|r| r.slot.clone())
    }

    /// Remove every registration made by `runtime`
    pub(crate) fn drain_runtime(&mut self, runtime: u64) -> Vec<Registration> {
        let keys: Vec<EventKey> = self
            .registrations
            .keys()
            .filter(|k| k.runtime == runtime)
            .copied()
            .collect();
        keys.iter()
            .filter_map(|k| self.registrations.remove(k))
            .collect()
    }

    pub(crate) fn drain_all(&mut self) -> Vec<Registration> {
        self.registrations.drain().map(|(_, r)| r).collect()
    }
}

fn event_key(lua: &Lua, signal: &Rc<Signal>, callable: &Function) -> EventKey {
    let runtime = lua.app_data_ref::<RuntimeId>().map(|id| id.0).unwrap_or(0);
    EventKey {
        runtime,
        signal: Rc::as_ptr(signal) as usize,
        callable: callable.to_pointer() as usize,
    }
}

/// Connect `callable` to `signal`. Returns `false` when it was already
/// connected.
pub(crate) fn connect(
    lua: &Lua,
    bridge: &Rc<BridgeState>,
    signal: &Rc<Signal>,
    callable: Function,
) -> mlua::Result<bool> {
    let key = event_key(lua, signal, &callable);
    let existing = bridge.events.borrow().slot_for(&key);
    if let Some(slot) = existing {
        return Ok(signal.connect(&slot));
    }

    let record = DispatchRecord {
        lua: lua.weak(),
        callback: lua.create_registry_value(callable)?,
        bridge: Rc::downgrade(bridge),
        signal_name: signal.name().to_string(),
    };
    let slot = Rc::new(Slot::new(
        format!("lua:{}", signal.name()),
        signal.params().to_vec(),
        move |args| record.dispatch(args),
    ));
    bridge.events.borrow_mut().registrations.insert(
        key,
        Registration {
            slot: slot.clone(),
            signal: Rc::downgrade(signal),
        },
    );
    log::trace!("registered guest handler for signal '{}'", signal.name());
    Ok(signal.connect(&slot))
}

/// Detach `callable` from `signal`, keeping its registration for a later
/// reconnect
pub(crate) fn disconnect(
    lua: &Lua,
    bridge: &Rc<BridgeState>,
    signal: &Rc<Signal>,
    callable: &Function,
) -> bool {
    let key = event_key(lua, signal, callable);
    let existing = bridge.events.borrow().slot_for(&key);
    match existing {
        Some(slot) => signal.disconnect(&slot),
        None => false,
    }
}

/// Drop every registration of one runtime
pub(crate) fn remove_runtime(bridge: &BridgeState, runtime: u64) {
    let removed = bridge.events.borrow_mut().drain_runtime(runtime);
    for registration in &removed {
        registration.disconnect();
    }
    if !removed.is_empty() {
        log::debug!(
            "dropped {} event registration(s) of runtime {}",
            removed.len(),
            runtime
        );
    }
}
