//! Host-side signals and slots
//!
//! A [`Signal`] is an event source with a declared parameter list; a
//! [`Slot`] is a handler that can be connected to any number of signals.
//! Emission is synchronous and reentrant: a slot may connect or disconnect
//! slots, or emit again, while being called.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::descriptor::{MemberDesc, MemberKind, ParamDesc};
use crate::value::VarValue;

type SlotHandler = Box<dyn Fn(&[VarValue])>;

pub struct Slot {
    desc: MemberDesc,
    params: Vec<ParamDesc>,
    handler: SlotHandler,
    invocations: Cell<u64>,
}

impl Slot {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamDesc>,
        handler: impl Fn(&[VarValue]) + 'static,
    ) -> Self {
        Self {
            desc: MemberDesc::new(MemberKind::EventHandler, name),
            params,
            handler: Box::new(handler),
            invocations: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn desc(&self) -> &MemberDesc {
        &self.desc
    }

    pub fn params(&self) -> &[ParamDesc] {
        &self.params
    }

    /// Run the handler. Arguments are converted to the declared parameter
    /// types; missing ones are filled with type defaults.
    pub fn invoke(&self, args: &[VarValue]) {
        self.invocations.set(self.invocations.get() + 1);
        if self.params.is_empty() {
            (self.handler)(args);
            return;
        }
        let typed = conform_args(&self.params, args);
        (self.handler)(&typed);
    }

    /// How many times the handler has run
    pub fn invocations(&self) -> u64 {
        self.invocations.get()
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.desc.name)
            .field("params", &self.params.len())
            .finish()
    }
}

pub struct Signal {
    desc: MemberDesc,
    params: Vec<ParamDesc>,
    connections: RefCell<Vec<Rc<Slot>>>,
}

impl Signal {
    pub fn new(name: impl Into<String>, params: Vec<ParamDesc>) -> Self {
        Self {
            desc: MemberDesc::new(MemberKind::Event, name),
            params,
            connections: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn desc(&self) -> &MemberDesc {
        &self.desc
    }

    pub fn params(&self) -> &[ParamDesc] {
        &self.params
    }

    /// Connect a slot. Connecting an already connected slot is a no-op
    /// and returns `false`.
    pub fn connect(&self, slot: &Rc<Slot>) -> bool {
        let mut connections = self.connections.borrow_mut();
        if connections.iter().any(|s| Rc::ptr_eq(s, slot)) {
            return false;
        }
        connections.push(slot.clone());
        true
    }

    pub fn disconnect(&self, slot: &Rc<Slot>) -> bool {
        let mut connections = self.connections.borrow_mut();
        let before = connections.len();
        connections.retain(|s| !Rc::ptr_eq(s, slot));
        connections.len() != before
    }

    pub fn is_connected(&self, slot: &Rc<Slot>) -> bool {
        self.connections.borrow().iter().any(|s| Rc::ptr_eq(s, slot))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.borrow().len()
    }

    pub fn disconnect_all(&self) {
        self.connections.borrow_mut().clear();
    }

    /// Call every connected slot in connection order. Returns how many
    /// slots ran.
    pub fn emit(&self, args: &[VarValue]) -> usize {
        let typed = conform_args(&self.params, args);
        // snapshot: slots may change the connection list while running
        let slots: Vec<Rc<Slot>> = self.connections.borrow().clone();
        for slot in &slots {
            slot.invoke(&typed);
        }
        log::trace!("signal '{}' delivered to {} slot(s)", self.desc.name, slots.len());
        slots.len()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.desc.name)
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// Convert `args` to the declared parameter types, padding with defaults
pub(crate) fn conform_args(params: &[ParamDesc], args: &[VarValue]) -> Vec<VarValue> {
    if params.is_empty() {
        return args.to_vec();
    }
    params
        .iter()
        .enumerate()
        .map(|(i, p)| match args.get(i) {
            Some(v) => v.convert(p.var_type),
            None => VarValue::default_for(p.var_type),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VarType;

    fn recording_slot(log: Rc<RefCell<Vec<VarValue>>>) -> Rc<Slot> {
        Rc::new(Slot::new(
            "record",
            vec![ParamDesc::new("value", VarType::Int32)],
            move |args| log.borrow_mut().extend_from_slice(args),
        ))
    }

    #[test]
    fn test_emit_converts_and_pads() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new(
            "Changed",
            vec![
                ParamDesc::new("a", VarType::Int32),
                ParamDesc::new("b", VarType::String),
            ],
        );
        let slot = Rc::new(Slot::new("any", Vec::new(), {
            let log = log.clone();
            move |args| log.borrow_mut().extend_from_slice(args)
        }));
        signal.connect(&slot);
        assert_eq!(signal.emit(&[VarValue::Double(4.0)]), 1);
        assert_eq!(
            *log.borrow(),
            vec![VarValue::Int32(4), VarValue::String(String::new())]
        );
    }

    #[test]
    fn test_connect_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new("Tick", Vec::new());
        let slot = recording_slot(log.clone());
        assert!(signal.connect(&slot));
        assert!(!signal.connect(&slot));
        signal.emit(&[VarValue::Int32(1)]);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(slot.invocations(), 1);
    }

    #[test]
    fn test_emit_without_connections() {
        let signal = Signal::new("Idle", vec![ParamDesc::new("n", VarType::Int32)]);
        assert_eq!(signal.emit(&[VarValue::Int32(3)]), 0);
    }

    #[test]
    fn test_disconnect_during_emit() {
        let signal = Rc::new(Signal::new("Once", Vec::new()));
        let holder: Rc<RefCell<Option<Rc<Slot>>>> = Rc::new(RefCell::new(None));
        let slot = Rc::new(Slot::new("once", Vec::new(), {
            let signal = Rc::downgrade(&signal);
            let holder = holder.clone();
            move |_| {
                if let (Some(signal), Some(me)) = (signal.upgrade(), holder.borrow().clone()) {
                    signal.disconnect(&me);
                }
            }
        }));
        *holder.borrow_mut() = Some(slot.clone());
        signal.connect(&slot);
        assert_eq!(signal.emit(&[]), 1);
        assert_eq!(signal.emit(&[]), 0);
        holder.borrow_mut().take();
    }
}
