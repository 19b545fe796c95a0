// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily populated table of per-key mutexes.

use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

/// One mutex per key, created on first use and kept for the table's lifetime.
///
/// Lookups take the read lock only. A miss re-checks and inserts under the
/// write lock, so two callers can never obtain distinct mutexes for one key.
///
/// The table's own lock is separate from the cache's dirty-set mutex and is
/// never held together with it. It is released before [`get_or_insert`]
/// returns, so it is also never held while a key's mutex is locked; a
/// caller blocked on one key does not stall lookups of any other.
///
/// [`get_or_insert`]: Self::get_or_insert
#[derive(Debug)]
pub(crate) struct LockTable<K> {
    locks: RwLock<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }
}

impl<K> LockTable<K>
where
    K: Copy + Eq + Hash,
{
    /// Returns the mutex guarding `key`, creating it if needed.
    pub(crate) fn get_or_insert(&self, key: K) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().get(&key) {
            return Arc::clone(lock);
        }
        Arc::clone(self.locks.write().entry(key).or_default())
    }

    /// Returns the number of keys that have a mutex.
    pub(crate) fn len(&self) -> usize {
        self.locks.read().len()
    }
}
