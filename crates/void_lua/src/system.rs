//! Script system lifecycle
//!
//! [`ScriptSystem`] is the reference-counted owner of the state every
//! runtime shares: the wrapper pools and the event registrations. The
//! first reference starts it, releasing the last one tears it down.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mlua::{Lua, Value};
use void_core::PoolStats;
use void_rtti::{HostObject, ObjectHandle, ObjectTable};

use crate::config::BridgeConfig;
use crate::events::EventRegistry;
use crate::pool::{MemberRef, WrapperHandle, WrapperKind, WrapperPools, WrapperState};
use crate::wrapper::{MethodWrapper, ObjectWrapper, SignalWrapper, SlotWrapper, WrapperRef};

/// Shared state living between the first and the last reference
pub(crate) struct BridgeState {
    pub(crate) objects: Rc<ObjectTable>,
    pub(crate) config: BridgeConfig,
    pub(crate) pools: RefCell<WrapperPools>,
    pub(crate) events: RefCell<EventRegistry>,
}

/// A bound wrapper resolved for the duration of one operation
pub(crate) struct Bound {
    pub(crate) bridge: Rc<BridgeState>,
    pub(crate) target: ObjectHandle,
    pub(crate) object: Rc<HostObject>,
    pub(crate) member: Option<MemberRef>,
}

impl BridgeState {
    fn new(objects: Rc<ObjectTable>, config: BridgeConfig) -> Self {
        let pools = WrapperPools::new(config.pool.initial_capacity);
        Self {
            objects,
            config,
            pools: RefCell::new(pools),
            events: RefCell::new(EventRegistry::new()),
        }
    }

    /// Attach a fresh record to `target`. Fails for null, stale or dying
    /// objects.
    pub(crate) fn bind(
        this: &Rc<Self>,
        kind: WrapperKind,
        target: ObjectHandle,
        member: Option<MemberRef>,
    ) -> Option<WrapperHandle> {
        if target.is_null() {
            return None;
        }
        if let Err(err) = this.objects.retain(target) {
            log::debug!("cannot bind {:?} wrapper to {:?}: {}", kind, target, err);
            return None;
        }

        let handle = this.pools.borrow_mut().acquire(kind);
        let weak = Rc::downgrade(this);
        let subscription = this.objects.subscribe_destroy(target, move |_| {
            if let Some(bridge) = weak.upgrade() {
                bridge.invalidate(handle);
            }
        });
        let subscription = match subscription {
            Ok(id) => id,
            Err(err) => {
                log::debug!("cannot watch {:?} for destruction: {}", target, err);
                this.pools.borrow_mut().release(handle);
                let _ = this.objects.release(target);
                return None;
            }
        };

        if let Some(data) = this.pools.borrow_mut().get_mut(handle) {
            data.state = WrapperState::Bound;
            data.target = target;
            data.member = member;
            data.destroy_sub = Some(subscription);
        }
        Some(handle)
    }

    /// Bind a record and hand it to the guest. A failed bind yields `nil`.
    pub(crate) fn wrap(
        this: &Rc<Self>,
        lua: &Lua,
        kind: WrapperKind,
        target: ObjectHandle,
        member: Option<MemberRef>,
    ) -> mlua::Result<Value> {
        let Some(handle) = BridgeState::bind(this, kind, target, member) else {
            return Ok(Value::Nil);
        };
        let wrapper = WrapperRef::new(handle, Rc::downgrade(this));
        let userdata = match kind {
            WrapperKind::Object => lua.create_userdata(ObjectWrapper(wrapper))?,
            WrapperKind::Method => lua.create_userdata(MethodWrapper(wrapper))?,
            WrapperKind::Signal => lua.create_userdata(SignalWrapper(wrapper))?,
            WrapperKind::Slot => lua.create_userdata(SlotWrapper(wrapper))?,
        };
        Ok(Value::UserData(userdata))
    }

    pub(crate) fn wrap_object(this: &Rc<Self>, lua: &Lua, target: ObjectHandle) -> mlua::Result<Value> {
        BridgeState::wrap(this, lua, WrapperKind::Object, target, None)
    }

    /// Resolve a record to its live host object
    pub(crate) fn resolve(this: &Rc<Self>, handle: WrapperHandle) -> Option<Bound> {
        let (target, member) = {
            let pools = this.pools.borrow();
            let data = pools.get(handle)?;
            if data.state != WrapperState::Bound {
                return None;
            }
            (data.target, data.member.clone())
        };
        let object = this.objects.get(target)?;
        Some(Bound {
            bridge: this.clone(),
            target,
            object,
            member,
        })
    }

    /// Target of a bound record
    pub(crate) fn target(&self, handle: WrapperHandle) -> Option<ObjectHandle> {
        let pools = self.pools.borrow();
        let data = pools.get(handle)?;
        (data.state == WrapperState::Bound).then_some(data.target)
    }

    /// Bound -> Invalidated. Drops the host reference taken by `bind`;
    /// repeated calls do nothing.
    pub(crate) fn invalidate(&self, handle: WrapperHandle) {
        let detached = {
            let mut pools = self.pools.borrow_mut();
            match pools.get_mut(handle) {
                Some(data) if data.state == WrapperState::Bound => {
                    data.state = WrapperState::Invalidated;
                    data.member = None;
                    Some((data.target, data.destroy_sub.take()))
                }
                _ => None,
            }
        };
        let Some((target, subscription)) = detached else {
            return;
        };
        if let Some(id) = subscription {
            // already consumed when the object itself is being destroyed
            self.objects.unsubscribe_destroy(target, id);
        }
        if let Err(err) = self.objects.release(target) {
            log::trace!("release of {:?} after invalidation: {}", target, err);
        }
    }

    /// Invalidate if needed and return the record to its pool
    pub(crate) fn release_wrapper(&self, handle: WrapperHandle) {
        self.invalidate(handle);
        self.pools.borrow_mut().release(handle);
    }

    fn shutdown(&self) {
        let bound = self.pools.borrow().bound_handles();
        for handle in &bound {
            self.invalidate(*handle);
        }
        let removed = self.events.borrow_mut().drain_all();
        let count = removed.len();
        for registration in removed {
            registration.disconnect();
        }
        log::debug!(
            "script bridge shut down: {} wrapper(s) invalidated, {} event registration(s) dropped",
            bound.len(),
            count
        );
    }
}

struct SystemInner {
    objects: Rc<ObjectTable>,
    config: BridgeConfig,
    references: Cell<usize>,
    state: RefCell<Option<Rc<BridgeState>>>,
    next_runtime_id: Cell<u64>,
}

/// Reference-counted lifecycle of the script bridge
#[derive(Clone)]
pub struct ScriptSystem {
    inner: Rc<SystemInner>,
}

impl ScriptSystem {
    pub fn new(objects: Rc<ObjectTable>, config: BridgeConfig) -> Self {
        Self {
            inner: Rc::new(SystemInner {
                objects,
                config,
                references: Cell::new(0),
                state: RefCell::new(None),
                next_runtime_id: Cell::new(1),
            }),
        }
    }

    pub fn with_defaults(objects: Rc<ObjectTable>) -> Self {
        Self::new(objects, BridgeConfig::default())
    }

    pub fn objects(&self) -> &Rc<ObjectTable> {
        &self.inner.objects
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Take a reference, starting the shared state on the first one.
    /// Returns the new count.
    pub fn add_reference(&self) -> usize {
        let count = self.inner.references.get() + 1;
        self.inner.references.set(count);
        if count == 1 {
            let state = BridgeState::new(self.inner.objects.clone(), self.inner.config.clone());
            *self.inner.state.borrow_mut() = Some(Rc::new(state));
            log::debug!(
                "script bridge started ({} pooled record(s) per kind)",
                self.inner.config.pool.initial_capacity
            );
        }
        count
    }

    /// Drop a reference, tearing the shared state down at zero. Returns the
    /// new count.
    pub fn release_reference(&self) -> usize {
        let count = self.inner.references.get();
        if count == 0 {
            log::warn!("release_reference called on a stopped script system");
            return 0;
        }
        let count = count - 1;
        self.inner.references.set(count);
        if count == 0 {
            let state = self.inner.state.borrow_mut().take();
            if let Some(state) = state {
                state.shutdown();
            }
        }
        count
    }

    pub fn reference_count(&self) -> usize {
        self.inner.references.get()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    /// Pool counters for one wrapper kind, while running
    pub fn pool_stats(&self, kind: WrapperKind) -> Option<PoolStats> {
        let state = self.state()?;
        let stats = state.pools.borrow().stats(kind);
        Some(stats)
    }

    /// Wrappers currently bound to a live host object
    pub fn bound_wrappers(&self) -> usize {
        self.state()
            .map(|s| s.pools.borrow().bound_handles().len())
            .unwrap_or(0)
    }

    /// Guest closures registered with host signals, connected or not
    pub fn event_registrations(&self) -> usize {
        self.state().map(|s| s.events.borrow().len()).unwrap_or(0)
    }

    pub(crate) fn state(&self) -> Option<Rc<BridgeState>> {
        self.inner.state.borrow().clone()
    }

    pub(crate) fn next_runtime_id(&self) -> u64 {
        let id = self.inner.next_runtime_id.get();
        self.inner.next_runtime_id.set(id + 1);
        id
    }
}

impl std::fmt::Debug for ScriptSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSystem")
            .field("references", &self.reference_count())
            .field("running", &self.is_running())
            .finish()
    }
}
