//! Wrapper record pools
//!
//! Every guest-visible wrapper is backed by a [`WrapperData`] record taken
//! from the pool for its kind. Records are recycled, not freed: a released
//! record has every field cleared and its generation bumped, so a handle
//! from its previous use no longer resolves.

use std::rc::Rc;

use void_core::{Handle, Pool, PoolStats, Recycle};
use void_rtti::{Method, ObjectHandle, Signal, Slot, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    Object,
    Method,
    Signal,
    Slot,
}

impl WrapperKind {
    pub const ALL: [WrapperKind; 4] = [
        WrapperKind::Object,
        WrapperKind::Method,
        WrapperKind::Signal,
        WrapperKind::Slot,
    ];
}

/// Lifecycle of a wrapper record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapperState {
    /// Taken from the pool, not yet attached to a host object
    #[default]
    Unbound,
    /// Attached; holds one host reference and a destroy subscription
    Bound,
    /// Host destroyed or bridge shut down; operations return safe defaults
    Invalidated,
    /// Parked on the free list
    Released,
}

/// The specific member a member wrapper stands for
#[derive(Clone)]
pub enum MemberRef {
    Method(Rc<Method>),
    Signal(Rc<Signal>),
    Slot(Rc<Slot>),
}

impl MemberRef {
    pub fn ptr_eq(&self, other: &MemberRef) -> bool {
        match (self, other) {
            (MemberRef::Method(a), MemberRef::Method(b)) => Rc::ptr_eq(a, b),
            (MemberRef::Signal(a), MemberRef::Signal(b)) => Rc::ptr_eq(a, b),
            (MemberRef::Slot(a), MemberRef::Slot(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use void_rtti::Invokable;
        match self {
            MemberRef::Method(m) => write!(f, "Method({})", m.name()),
            MemberRef::Signal(s) => write!(f, "Signal({})", s.name()),
            MemberRef::Slot(s) => write!(f, "Slot({})", s.name()),
        }
    }
}

#[derive(Debug, Default)]
pub struct WrapperData {
    pub state: WrapperState,
    pub target: ObjectHandle,
    pub member: Option<MemberRef>,
    pub destroy_sub: Option<SubscriptionId>,
}

impl Recycle for WrapperData {
    fn recycle(&mut self) {
        self.state = WrapperState::Released;
        self.target = ObjectHandle::null();
        self.member = None;
        self.destroy_sub = None;
    }
}

/// Pooled record of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WrapperHandle {
    pub kind: WrapperKind,
    pub handle: Handle<WrapperData>,
}

/// One free-list pool per wrapper kind
pub struct WrapperPools {
    objects: Pool<WrapperData>,
    methods: Pool<WrapperData>,
    signals: Pool<WrapperData>,
    slots: Pool<WrapperData>,
}

impl WrapperPools {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            objects: Pool::with_prewarmed(initial_capacity),
            methods: Pool::with_prewarmed(initial_capacity),
            signals: Pool::with_prewarmed(initial_capacity),
            slots: Pool::with_prewarmed(initial_capacity),
        }
    }

    fn pool(&self, kind: WrapperKind) -> &Pool<WrapperData> {
        match kind {
            WrapperKind::Object => &self.objects,
            WrapperKind::Method => &self.methods,
            WrapperKind::Signal => &self.signals,
            WrapperKind::Slot => &self.slots,
        }
    }

    fn pool_mut(&mut self, kind: WrapperKind) -> &mut Pool<WrapperData> {
        match kind {
            WrapperKind::Object => &mut self.objects,
            WrapperKind::Method => &mut self.methods,
            WrapperKind::Signal => &mut self.signals,
            WrapperKind::Slot => &mut self.slots,
        }
    }

    /// Take an unbound record of `kind`
    pub fn acquire(&mut self, kind: WrapperKind) -> WrapperHandle {
        let pool = self.pool_mut(kind);
        let handle = pool.acquire();
        if let Some(data) = pool.get_mut(handle) {
            data.state = WrapperState::Unbound;
        }
        WrapperHandle { kind, handle }
    }

    pub fn get(&self, handle: WrapperHandle) -> Option<&WrapperData> {
        self.pool(handle.kind).get(handle.handle)
    }

    pub fn get_mut(&mut self, handle: WrapperHandle) -> Option<&mut WrapperData> {
        self.pool_mut(handle.kind).get_mut(handle.handle)
    }

    /// Clear the record and park it. Returns `false` for a stale handle.
    pub fn release(&mut self, handle: WrapperHandle) -> bool {
        self.pool_mut(handle.kind).release(handle.handle)
    }

    pub fn stats(&self, kind: WrapperKind) -> PoolStats {
        self.pool(kind).stats()
    }

    /// Every record currently in the `Bound` state
    pub fn bound_handles(&self) -> Vec<WrapperHandle> {
        WrapperKind::ALL
            .iter()
            .flat_map(|&kind| {
                let pool = self.pool(kind);
                pool.live_handles()
                    .into_iter()
                    .filter(move |h| {
                        pool.get(*h)
                            .is_some_and(|d| d.state == WrapperState::Bound)
                    })
                    .map(move |handle| WrapperHandle { kind, handle })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_leaves_no_residue() {
        let mut pools = WrapperPools::new(0);
        let first = pools.acquire(WrapperKind::Method);
        {
            let data = pools.get_mut(first).unwrap();
            data.state = WrapperState::Bound;
            data.target = ObjectHandle::new(4, 2);
            data.member = Some(MemberRef::Slot(Rc::new(Slot::new("s", Vec::new(), |_| {}))));
            data.destroy_sub = Some(9);
        }
        assert!(pools.release(first));
        assert!(pools.get(first).is_none());

        let second = pools.acquire(WrapperKind::Method);
        assert_eq!(second.handle.index(), first.handle.index());
        let data = pools.get(second).unwrap();
        assert_eq!(data.state, WrapperState::Unbound);
        assert!(data.target.is_null());
        assert!(data.member.is_none());
        assert!(data.destroy_sub.is_none());

        let stats = pools.stats(WrapperKind::Method);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.reused, 1);
    }

    #[test]
    fn test_kinds_are_separate() {
        let mut pools = WrapperPools::new(2);
        let obj = pools.acquire(WrapperKind::Object);
        pools.get_mut(obj).unwrap().state = WrapperState::Bound;
        let _sig = pools.acquire(WrapperKind::Signal);
        assert_eq!(pools.stats(WrapperKind::Object).live, 1);
        assert_eq!(pools.stats(WrapperKind::Slot).live, 0);
        assert_eq!(pools.bound_handles(), vec![obj]);
    }
}
