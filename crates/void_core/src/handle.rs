//! Generation-checked handles into slot storage
//!
//! A handle is an index plus a generation. Freeing a slot bumps its
//! generation, so any handle still pointing at the old occupant resolves
//! to nothing instead of aliasing the new one.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use alloc::vec::Vec;

/// A typed, copyable reference to a slot in a [`HandleMap`] or [`crate::Pool`]
#[repr(transparent)]
pub struct Handle<T> {
    /// Upper 32 bits: generation (never 0 for a live handle), lower 32 bits: index
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Create a handle from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
            _marker: PhantomData,
        }
    }

    /// The null handle. Its bit pattern is 0.
    #[inline]
    pub const fn null() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// Check if this handle is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.generation() == 0
    }

    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Raw bits, stable for the lifetime of the slot occupant
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    /// Reinterpret as a handle to another type
    #[inline]
    pub const fn cast<U>(self) -> Handle<U> {
        Handle {
            bits: self.bits,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({}v{})", self.index(), self.generation())
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

/// Next live generation after `generation`, skipping the null generation
#[inline]
pub(crate) fn next_generation(generation: u32) -> u32 {
    match generation.wrapping_add(1) {
        0 => 1,
        g => g,
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by [`Handle`]s
pub struct HandleMap<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> HandleMap<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Insert a value and get a handle to it
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        Handle::new(index, 1)
    }

    /// Remove a value, invalidating every copy of `handle`
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.live_slot_mut(handle)?;
        let value = slot.value.take();
        slot.generation = next_generation(slot.generation);
        self.free_list.push(handle.index());
        self.len -= 1;
        value
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if handle.is_null() {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.live_slot_mut(handle)?.value.as_mut()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Collect the handles of every live value
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(i, slot)| Handle::new(i as u32, slot.generation))
            .collect()
    }

    fn live_slot_mut(&mut self, handle: Handle<T>) -> Option<&mut Slot<T>> {
        if handle.is_null() {
            return None;
        }
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return None;
        }
        Some(slot)
    }
}

impl<T> Default for HandleMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
