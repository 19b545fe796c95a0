// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Dirty: stamped dirty sets for incremental recomputation.
//!
//! A cache that recomputes entries lazily needs to know which entries are
//! stale. This crate provides [`DirtySet`], a set of stale keys in which every
//! key remembers *when* it was last marked ([`Stamp`]). The stamp lets a
//! recompute pass clear exactly the mark it acted on, so an invalidation that
//! arrives while the pass is running is never lost.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera_dirty::DirtySet;
//!
//! let mut dirty = DirtySet::<(u32, u32)>::new();
//! dirty.mark_all([(0, 0), (0, 64), (64, 0)]);
//!
//! // Plan a pass without consuming the set.
//! for key in dirty.snapshot_sorted() {
//!     let Some(stamp) = dirty.stamp(key) else { continue };
//!     // recompute(key);
//!     dirty.clear_if_unchanged(key, stamp);
//! }
//! assert!(dirty.is_empty());
//! ```
//!
//! ## Concurrency
//!
//! `DirtySet` itself is a plain data structure. Concurrent embedders keep it
//! behind a lock that is held only while the set is mutated, never across a
//! recomputation; the stamp protocol makes that safe.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod set;
mod stamp;

pub use set::DirtySet;
pub use stamp::Stamp;
