// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty set: accumulated dirty keys with per-key mark stamps.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::stamp::Stamp;

/// Accumulated dirty keys with generation tracking and per-key stamps.
///
/// `DirtySet` records which keys are stale. Every mutation bumps a generation
/// counter, and every mark records the generation at which the key was marked
/// (its [`Stamp`]). Re-marking an already dirty key refreshes its stamp.
///
/// Stamps make the usual "check dirty, recompute, clear dirty" sequence safe
/// when marks may arrive while the recomputation is running: observe the
/// stamp before computing, and clear with
/// [`clear_if_unchanged`](Self::clear_if_unchanged) afterwards. If the key was
/// marked again in between, the clear is refused and the key stays dirty.
///
/// # Type Parameters
///
/// - `K`: The key type, typically a block identity. Must be `Copy + Eq + Hash`.
///
/// # Example
///
/// ```
/// use tessera_dirty::DirtySet;
///
/// let mut dirty = DirtySet::<u32>::new();
/// dirty.mark(1);
/// dirty.mark(2);
///
/// // A recompute of key 1 starts.
/// let seen = dirty.stamp(1).unwrap();
///
/// // An invalidation lands while it runs.
/// dirty.mark(1);
///
/// // The recompute finishes, but its clear is refused: 1 is still dirty.
/// assert!(!dirty.clear_if_unchanged(1, seen));
/// assert!(dirty.is_dirty(1));
///
/// // The next pass succeeds.
/// let seen = dirty.stamp(1).unwrap();
/// assert!(dirty.clear_if_unchanged(1, seen));
/// assert!(!dirty.is_dirty(1));
/// ```
#[derive(Debug, Clone)]
pub struct DirtySet<K>
where
    K: Copy + Eq + Hash,
{
    /// Dirty keys and the stamp of their latest mark.
    keys: HashMap<K, Stamp>,
    /// Generation counter, incremented on each mutation.
    generation: u64,
}

impl<K> Default for DirtySet<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DirtySet<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates a new empty dirty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            generation: 0,
        }
    }

    /// Returns the current generation.
    ///
    /// The generation is incremented on every mutation (mark, clear). This can
    /// be used to detect whether the dirty set has changed since a previous
    /// observation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) -> Stamp {
        self.generation = self.generation.wrapping_add(1);
        Stamp::new(self.generation)
    }

    /// Marks a key as dirty, refreshing its stamp if it already was.
    ///
    /// Returns `true` if the key was newly inserted, `false` if it was already dirty.
    pub fn mark(&mut self, key: K) -> bool {
        let stamp = self.bump();
        self.keys.insert(key, stamp).is_none()
    }

    /// Marks every key yielded by `keys`.
    ///
    /// Returns the number of keys that were newly inserted.
    pub fn mark_all<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().filter(|&k| self.mark(k)).count()
    }

    /// Returns `true` if the key is dirty.
    #[must_use]
    pub fn is_dirty(&self, key: K) -> bool {
        self.keys.contains_key(&key)
    }

    /// Returns the stamp of the key's latest mark, or `None` if it is clean.
    #[must_use]
    pub fn stamp(&self, key: K) -> Option<Stamp> {
        self.keys.get(&key).copied()
    }

    /// Returns `true` if there are no dirty keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the number of dirty keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns an iterator over the dirty keys.
    ///
    /// This does not clear the dirty state. Iteration order follows hash order
    /// and is not deterministic; see [`snapshot_sorted`](Self::snapshot_sorted).
    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.keys.keys().copied()
    }

    /// Returns the dirty keys as a vector, leaving the set untouched.
    #[must_use]
    pub fn snapshot(&self) -> Vec<K> {
        self.iter().collect()
    }

    /// Returns the dirty keys as a vector sorted by `Ord`, leaving the set untouched.
    #[must_use]
    pub fn snapshot_sorted(&self) -> Vec<K>
    where
        K: Ord,
    {
        let mut keys = self.snapshot();
        keys.sort_unstable();
        keys
    }

    /// Removes a key unconditionally.
    ///
    /// Returns `true` if the key was dirty.
    pub fn clear(&mut self, key: K) -> bool {
        let removed = self.keys.remove(&key).is_some();
        if removed {
            self.bump();
        }
        removed
    }

    /// Removes a key only if it has not been marked again since `stamp` was observed.
    ///
    /// Returns `true` if the key was removed. Returns `false` if the key is
    /// clean already or carries a newer stamp.
    pub fn clear_if_unchanged(&mut self, key: K, stamp: Stamp) -> bool {
        if self.keys.get(&key) != Some(&stamp) {
            return false;
        }
        self.keys.remove(&key);
        self.bump();
        true
    }

    /// Clears all dirty keys.
    pub fn clear_all(&mut self) {
        self.bump();
        self.keys.clear();
    }
}

impl<K> Extend<K> for DirtySet<K>
where
    K: Copy + Eq + Hash,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.mark_all(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_query() {
        let mut dirty = DirtySet::<u32>::new();

        assert!(!dirty.is_dirty(1));
        assert!(dirty.is_empty());

        let inserted = dirty.mark(1);
        assert!(inserted);
        assert!(dirty.is_dirty(1));
        assert!(!dirty.is_empty());

        // Marking again returns false
        let inserted_again = dirty.mark(1);
        assert!(!inserted_again);
        assert_eq!(dirty.len(), 1);
    }

    #[test]
    fn remark_refreshes_stamp() {
        let mut dirty = DirtySet::<u32>::new();
        dirty.mark(7);
        let first = dirty.stamp(7).unwrap();
        dirty.mark(7);
        let second = dirty.stamp(7).unwrap();
        assert!(second > first);
    }

    #[test]
    fn clear_if_unchanged_refuses_stale_stamps() {
        let mut dirty = DirtySet::<u32>::new();
        dirty.mark(1);
        let stale = dirty.stamp(1).unwrap();
        dirty.mark(1);

        assert!(!dirty.clear_if_unchanged(1, stale));
        assert!(dirty.is_dirty(1));

        let fresh = dirty.stamp(1).unwrap();
        assert!(dirty.clear_if_unchanged(1, fresh));
        assert!(!dirty.is_dirty(1));

        // Already clean: nothing to do.
        assert!(!dirty.clear_if_unchanged(1, fresh));
    }

    #[test]
    fn stamps_of_other_keys_do_not_clear() {
        let mut dirty = DirtySet::<u32>::new();
        dirty.mark(1);
        dirty.mark(2);
        let two = dirty.stamp(2).unwrap();
        assert!(!dirty.clear_if_unchanged(1, two));
        assert!(dirty.is_dirty(1));
    }

    #[test]
    fn snapshot_does_not_remove() {
        let mut dirty = DirtySet::<u32>::new();
        dirty.mark_all([5, 3, 9]);

        assert_eq!(dirty.snapshot_sorted(), [3, 5, 9]);
        assert_eq!(dirty.snapshot().len(), 3);
        assert_eq!(dirty.len(), 3);
    }

    #[test]
    fn mark_all_counts_new_keys() {
        let mut dirty = DirtySet::<u32>::new();
        dirty.mark(1);
        assert_eq!(dirty.mark_all([1, 2, 3, 2]), 2);
        assert_eq!(dirty.len(), 3);
    }

    #[test]
    fn clear_and_clear_all() {
        let mut dirty = DirtySet::<u32>::new();
        dirty.extend([1, 2, 3]);

        assert!(dirty.clear(2));
        assert!(!dirty.clear(2));
        assert!(!dirty.is_dirty(2));

        dirty.clear_all();
        assert!(dirty.is_empty());
    }

    #[test]
    fn generation_increments() {
        let mut dirty = DirtySet::<u32>::new();
        let initial = dirty.generation();

        dirty.mark(1);
        assert_eq!(dirty.generation(), initial + 1);

        dirty.mark(2);
        assert_eq!(dirty.generation(), initial + 2);

        // Clearing a clean key is not a mutation.
        dirty.clear(3);
        assert_eq!(dirty.generation(), initial + 2);

        dirty.clear(1);
        assert_eq!(dirty.generation(), initial + 3);

        dirty.clear_all();
        assert_eq!(dirty.generation(), initial + 4);
    }
}
