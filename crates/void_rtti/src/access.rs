//! Access policies

use std::marker::PhantomData;

use crate::storage::VarStorage;

/// Marker deciding whether a variant may be mutated
pub trait AccessPolicy: 'static {
    const READ_ONLY: bool;
}

/// `write` reaches the storage
pub struct ReadWrite;

/// `write` is silently ignored; reads are unaffected
pub struct ReadOnly;

impl AccessPolicy for ReadWrite {
    const READ_ONLY: bool = false;
}

impl AccessPolicy for ReadOnly {
    const READ_ONLY: bool = true;
}

/// A storage guarded by an access policy
pub struct VarAccess<S, A> {
    storage: S,
    _access: PhantomData<A>,
}

impl<S: VarStorage, A: AccessPolicy> VarAccess<S, A> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            _access: PhantomData,
        }
    }

    pub fn read(&self) -> S::Value {
        self.storage.read()
    }

    /// Write through to storage. Returns `false` if the policy ignored it.
    pub fn write(&self, value: S::Value) -> bool {
        if A::READ_ONLY {
            log::trace!("ignored write to read-only {} storage", self.storage.kind());
            return false;
        }
        self.storage.write(value);
        true
    }

    pub fn is_read_only(&self) -> bool {
        A::READ_ONLY
    }

    /// The underlying storage, bypassing the access policy
    pub fn storage(&self) -> &S {
        &self.storage
    }
}
