// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mark stamps.

/// The generation at which a key was last marked dirty.
///
/// Stamps are only meaningful for the [`DirtySet`](crate::DirtySet) that
/// issued them. Within one set, a later mark always carries a larger stamp.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Stamp(u64);

impl Stamp {
    pub(crate) const fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Returns the raw generation value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}
