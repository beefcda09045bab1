//! Host objects and the object table
//!
//! A [`HostObject`] is a named instance of a [`Class`] that owns its
//! attributes, methods, signals and slots. The [`ObjectTable`] owns host
//! objects and hands out [`ObjectHandle`]s; a handle whose object has been
//! destroyed resolves to nothing instead of dangling.
//!
//! Destruction raises each destroy subscription exactly once, before the
//! object leaves the table. Subscribers run without any table borrow held
//! and may call back into the table.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use void_core::{Handle, HandleError, HandleMap};

use crate::access::AccessPolicy;
use crate::attribute::Attribute;
use crate::class::Class;
use crate::dyn_var::DynVar;
use crate::method::Method;
use crate::signal::{Signal, Slot};
use crate::storage::VarStorage;
use crate::var::Var;

/// Generation-checked reference to an object in an [`ObjectTable`]
pub type ObjectHandle = Handle<HostObject>;

/// Identifies one destroy subscription
pub type SubscriptionId = u64;

/// A resolved member, in lookup precedence order
#[derive(Clone)]
pub enum Member {
    Attribute(Rc<dyn DynVar>),
    /// Read-only class property
    Property(String),
    Method(Rc<Method>),
    Signal(Rc<Signal>),
    Slot(Rc<Slot>),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Attribute(var) => write!(f, "Attribute({}: {})", var.var_type(), var.get_string()),
            Member::Property(value) => write!(f, "Property({value:?})"),
            Member::Method(m) => write!(f, "Method({:?})", m),
            Member::Signal(s) => write!(f, "Signal({:?})", s),
            Member::Slot(s) => write!(f, "Slot({:?})", s),
        }
    }
}

pub struct HostObject {
    name: String,
    class: Rc<Class>,
    attributes: BTreeMap<String, Attribute>,
    methods: BTreeMap<String, Rc<Method>>,
    signals: BTreeMap<String, Rc<Signal>>,
    slots: BTreeMap<String, Rc<Slot>>,
}

impl HostObject {
    pub fn builder(name: impl Into<String>, class: Rc<Class>) -> HostObjectBuilder {
        HostObjectBuilder {
            object: HostObject {
                name: name.into(),
                class,
                attributes: BTreeMap::new(),
                methods: BTreeMap::new(),
                signals: BTreeMap::new(),
                slots: BTreeMap::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Variant for `name`, through the class descriptor when there is one
    pub fn var(&self, name: &str) -> Option<Rc<dyn DynVar>> {
        if let Some(desc) = self.class.var_desc(name) {
            if let Some(var) = desc.fetch(self) {
                return Some(var);
            }
        }
        self.attributes.get(name).map(Attribute::var)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.class.property(name)
    }

    pub fn method(&self, name: &str) -> Option<Rc<Method>> {
        self.methods.get(name).cloned()
    }

    pub fn signal(&self, name: &str) -> Option<Rc<Signal>> {
        self.signals.get(name).cloned()
    }

    pub fn slot(&self, name: &str) -> Option<Rc<Slot>> {
        self.slots.get(name).cloned()
    }

    pub fn signals(&self) -> impl Iterator<Item = &Rc<Signal>> {
        self.signals.values()
    }

    /// Look `name` up as attribute, class property, method, signal, then
    /// slot
    pub fn resolve(&self, name: &str) -> Option<Member> {
        if let Some(var) = self.var(name) {
            return Some(Member::Attribute(var));
        }
        if let Some(value) = self.property(name) {
            return Some(Member::Property(value.to_string()));
        }
        if let Some(method) = self.method(name) {
            return Some(Member::Method(method));
        }
        if let Some(signal) = self.signal(name) {
            return Some(Member::Signal(signal));
        }
        self.slot(name).map(Member::Slot)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("name", &self.name)
            .field("class", &self.class.name())
            .field("attributes", &self.attributes.len())
            .field("methods", &self.methods.len())
            .field("signals", &self.signals.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

pub struct HostObjectBuilder {
    object: HostObject,
}

impl HostObjectBuilder {
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.object
            .attributes
            .insert(attribute.name().to_string(), attribute);
        self
    }

    /// Register `var` as an attribute named `name`
    pub fn var<S, A>(self, name: impl Into<String>, var: Var<S, A>) -> Self
    where
        S: VarStorage + 'static,
        A: AccessPolicy,
    {
        self.attribute(Attribute::new(name, var))
    }

    /// An attribute registered earlier, e.g. as the target of a
    /// `ModifyAttr` variant
    pub fn existing(&self, name: &str) -> Option<Rc<dyn DynVar>> {
        self.object.attributes.get(name).map(Attribute::var)
    }

    pub fn method(mut self, method: Method) -> Self {
        use crate::method::Invokable;
        self.object
            .methods
            .insert(method.name().to_string(), Rc::new(method));
        self
    }

    pub fn signal(mut self, signal: Signal) -> Self {
        self.object
            .signals
            .insert(signal.name().to_string(), Rc::new(signal));
        self
    }

    pub fn slot(mut self, slot: Slot) -> Self {
        self.object
            .slots
            .insert(slot.name().to_string(), Rc::new(slot));
        self
    }

    pub fn build(self) -> HostObject {
        self.object
    }
}

type DestroyCallback = Box<dyn FnOnce(ObjectHandle)>;

struct ObjectEntry {
    object: Rc<HostObject>,
    ref_count: u32,
    dying: bool,
    subscribers: Vec<(SubscriptionId, DestroyCallback)>,
}

/// Owner of host objects, addressed by generation-checked handles
pub struct ObjectTable {
    entries: RefCell<HandleMap<ObjectEntry>>,
    next_subscription: Cell<SubscriptionId>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HandleMap::new()),
            next_subscription: Cell::new(1),
        }
    }

    /// Take ownership of `object`. The caller holds the first reference.
    pub fn insert(&self, object: HostObject) -> ObjectHandle {
        let name = object.name.clone();
        let handle = self.entries.borrow_mut().insert(ObjectEntry {
            object: Rc::new(object),
            ref_count: 1,
            dying: false,
            subscribers: Vec::new(),
        });
        log::debug!("object '{}' inserted as {:?}", name, handle);
        handle.cast()
    }

    /// The live object behind `handle`
    pub fn get(&self, handle: ObjectHandle) -> Option<Rc<HostObject>> {
        self.resolve(handle).ok()
    }

    pub fn resolve(&self, handle: ObjectHandle) -> Result<Rc<HostObject>, HandleError> {
        self.with_entry(handle, |entry| {
            if entry.dying {
                Err(HandleError::Dying)
            } else {
                Ok(entry.object.clone())
            }
        })
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Add a reference. Returns the new count.
    pub fn retain(&self, handle: ObjectHandle) -> Result<u32, HandleError> {
        self.with_entry_mut(handle, |entry| {
            if entry.dying {
                return Err(HandleError::Dying);
            }
            entry.ref_count += 1;
            Ok(entry.ref_count)
        })
    }

    /// Drop a reference, destroying the object when none are left.
    /// Returns the new count.
    pub fn release(&self, handle: ObjectHandle) -> Result<u32, HandleError> {
        let (count, destroy) = self.with_entry_mut(handle, |entry| {
            entry.ref_count = entry.ref_count.saturating_sub(1);
            Ok((entry.ref_count, entry.ref_count == 0 && !entry.dying))
        })?;
        if destroy {
            self.destroy(handle);
        }
        Ok(count)
    }

    pub fn ref_count(&self, handle: ObjectHandle) -> Option<u32> {
        self.with_entry(handle, |entry| Ok(entry.ref_count)).ok()
    }

    /// Notify subscribers, then remove the object. Returns `false` if the
    /// handle is stale or the object is already being destroyed.
    pub fn destroy(&self, handle: ObjectHandle) -> bool {
        let subscribers = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.get_mut(handle.cast()) else {
                return false;
            };
            if entry.dying {
                return false;
            }
            entry.dying = true;
            std::mem::take(&mut entry.subscribers)
        };

        log::debug!(
            "destroying object {:?}, notifying {} subscriber(s)",
            handle,
            subscribers.len()
        );
        for (_, callback) in subscribers {
            callback(handle);
        }

        let removed = self.entries.borrow_mut().remove(handle.cast());
        // the object itself drops outside the borrow
        drop(removed);
        true
    }

    /// Call `callback` once when `handle` is destroyed
    pub fn subscribe_destroy(
        &self,
        handle: ObjectHandle,
        callback: impl FnOnce(ObjectHandle) + 'static,
    ) -> Result<SubscriptionId, HandleError> {
        let id = self.next_subscription.get();
        self.with_entry_mut(handle, |entry| {
            if entry.dying {
                return Err(HandleError::Dying);
            }
            entry.subscribers.push((id, Box::new(callback)));
            Ok(())
        })?;
        self.next_subscription.set(id + 1);
        Ok(id)
    }

    pub fn unsubscribe_destroy(&self, handle: ObjectHandle, id: SubscriptionId) -> bool {
        // dropping the callback may release captured state; keep it outside the borrow
        let removed = self
            .with_entry_mut(handle, |entry| {
                Ok(entry
                    .subscribers
                    .iter()
                    .position(|(sub, _)| *sub == id)
                    .map(|i| entry.subscribers.remove(i)))
            })
            .ok()
            .flatten();
        removed.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn handles(&self) -> Vec<ObjectHandle> {
        self.entries
            .borrow()
            .handles()
            .into_iter()
            .map(Handle::cast)
            .collect()
    }

    fn with_entry<R>(
        &self,
        handle: ObjectHandle,
        f: impl FnOnce(&ObjectEntry) -> Result<R, HandleError>,
    ) -> Result<R, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        let entries = self.entries.borrow();
        let entry = entries.get(handle.cast()).ok_or(HandleError::Stale)?;
        f(entry)
    }

    fn with_entry_mut<R>(
        &self,
        handle: ObjectHandle,
        f: impl FnOnce(&mut ObjectEntry) -> Result<R, HandleError>,
    ) -> Result<R, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        let mut entries = self.entries.borrow_mut();
        let entry = entries.get_mut(handle.cast()).ok_or(HandleError::Stale)?;
        f(entry)
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTable").field("len", &self.len()).finish()
    }
}
