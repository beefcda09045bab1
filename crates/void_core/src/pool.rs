//! Recycling object pools
//!
//! A [`Pool`] never frees released values: it clears them through
//! [`Recycle`] and hands them out again on the next [`Pool::acquire`].
//! Released slots get a new generation, so handles to the previous
//! occupant go stale.

use alloc::vec::Vec;

use crate::handle::{next_generation, Handle};

/// Values that can be wiped back to their unbound state for reuse
pub trait Recycle {
    /// Clear every field that refers to a previous use
    fn recycle(&mut self);
}

/// Counters describing pool churn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Values constructed because the free list was empty
    pub created: usize,
    /// Acquisitions served from the free list
    pub reused: usize,
    /// Values currently handed out
    pub live: usize,
    /// Values parked on the free list
    pub free: usize,
}

struct PoolEntry<T> {
    generation: u32,
    live: bool,
    value: T,
}

/// Free-list pool addressed by generation-checked handles
pub struct Pool<T> {
    entries: Vec<PoolEntry<T>>,
    free_list: Vec<u32>,
    created: usize,
    reused: usize,
}

impl<T: Default + Recycle> Pool<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            created: 0,
            reused: 0,
        }
    }

    /// Create a pool with `count` values already parked on the free list
    pub fn with_prewarmed(count: usize) -> Self {
        let mut pool = Self::new();
        pool.prewarm(count);
        pool
    }

    /// Construct `count` values up front
    pub fn prewarm(&mut self, count: usize) {
        for _ in 0..count {
            let index = self.entries.len() as u32;
            self.entries.push(PoolEntry {
                generation: 1,
                live: false,
                value: T::default(),
            });
            self.free_list.push(index);
            self.created += 1;
        }
    }

    /// Take a value from the free list, or construct one
    pub fn acquire(&mut self) -> Handle<T> {
        if let Some(index) = self.free_list.pop() {
            let entry = &mut self.entries[index as usize];
            entry.live = true;
            self.reused += 1;
            return Handle::new(index, entry.generation);
        }

        let index = self.entries.len() as u32;
        self.entries.push(PoolEntry {
            generation: 1,
            live: true,
            value: T::default(),
        });
        self.created += 1;
        Handle::new(index, 1)
    }

    /// Recycle the value behind `handle` and park it on the free list.
    ///
    /// Returns `false` for null or stale handles.
    pub fn release(&mut self, handle: Handle<T>) -> bool {
        let Some(entry) = self.live_entry_mut(handle) else {
            return false;
        };
        entry.value.recycle();
        entry.live = false;
        entry.generation = next_generation(entry.generation);
        self.free_list.push(handle.index());
        true
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if handle.is_null() {
            return None;
        }
        let entry = self.entries.get(handle.index() as usize)?;
        (entry.live && entry.generation == handle.generation()).then_some(&entry.value)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.live_entry_mut(handle).map(|e| &mut e.value)
    }

    /// Handles of every value currently handed out
    pub fn live_handles(&self) -> Vec<Handle<T>> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.live)
            .map(|(i, e)| Handle::new(i as u32, e.generation))
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created,
            reused: self.reused,
            live: self.entries.len() - self.free_list.len(),
            free: self.free_list.len(),
        }
    }

    fn live_entry_mut(&mut self, handle: Handle<T>) -> Option<&mut PoolEntry<T>> {
        if handle.is_null() {
            return None;
        }
        let entry = self.entries.get_mut(handle.index() as usize)?;
        (entry.live && entry.generation == handle.generation()).then_some(entry)
    }
}

impl<T: Default + Recycle> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Record {
        owner: u32,
        uses: u32,
    }

    impl Recycle for Record {
        fn recycle(&mut self) {
            self.owner = 0;
        }
    }

    #[test]
    fn test_release_then_acquire_reuses_slot() {
        let mut pool: Pool<Record> = Pool::new();
        let h1 = pool.acquire();
        pool.get_mut(h1).unwrap().owner = 42;
        pool.get_mut(h1).unwrap().uses += 1;

        assert!(pool.release(h1));
        assert!(!pool.release(h1));
        assert!(pool.get(h1).is_none());

        let h2 = pool.acquire();
        assert_eq!(h2.index(), h1.index());
        assert_ne!(h2, h1);
        let record = pool.get(h2).unwrap();
        assert_eq!(record.owner, 0);
        // recycle() decides what is cleared; untouched fields survive
        assert_eq!(record.uses, 1);

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.live, 1);
    }

    #[test]
    fn test_prewarm() {
        let mut pool: Pool<Record> = Pool::with_prewarmed(3);
        assert_eq!(pool.stats().free, 3);
        let _ = pool.acquire();
        let stats = pool.stats();
        assert_eq!(stats.created, 3);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.live, 1);
        assert_eq!(stats.free, 2);
    }

    #[test]
    fn test_live_handles() {
        let mut pool: Pool<Record> = Pool::new();
        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        assert_eq!(pool.live_handles(), [b]);
        assert!(pool.get(a).is_none());
        assert_eq!(pool.stats().live, 1);
    }
}
