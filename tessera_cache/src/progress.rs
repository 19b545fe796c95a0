// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Progress reporting for cache reads.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

type Observer = Arc<dyn Fn(f64) + Send + Sync>;

/// Handle returned by [`Progress::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Ordered set of progress observers.
///
/// During one [`get_matrix`](crate::FeatureMatrixCache::get_matrix) call,
/// observers receive percentages in `[0, 100]` that never decrease. The last
/// value of a read is always `100.0`. Callbacks run synchronously on whichever
/// worker finished a block, one emission at a time, in subscription order.
/// Observers must not call back into the `Progress` that is notifying them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use tessera_cache::Progress;
///
/// let progress = Progress::default();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let id = progress.subscribe(move |p| sink.lock().push(p));
/// assert_eq!(progress.observer_count(), 1);
/// assert!(progress.unsubscribe(id));
/// ```
pub struct Progress {
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_id: AtomicU64,
    last: Mutex<f64>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            last: Mutex::new(0.0),
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("observers", &self.observer_count())
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Registers `observer`; it is called after every observer registered before it.
    pub fn subscribe<O>(&self, observer: O) -> ObserverId
    where
        O: Fn(f64) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(other, _)| *other != id);
        observers.len() != before
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns the most recently emitted percentage.
    #[must_use]
    pub fn last(&self) -> f64 {
        *self.last.lock()
    }

    /// Starts a new read. Nothing is emitted.
    pub(crate) fn begin(&self) {
        *self.last.lock() = 0.0;
    }

    /// Emits `percent`, raised to the previous emission of this read if lower.
    pub(crate) fn report(&self, percent: f64) {
        // Held across the callbacks so emissions cannot interleave.
        let mut last = self.last.lock();
        let value = percent.max(*last).min(100.0);
        *last = value;
        let observers: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer(value);
        }
    }
}
