// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tessera Cache: a blockwise, incrementally maintained label/feature matrix.
//!
//! Interactive classifiers need the feature vectors of every labeled point.
//! Computing them from scratch after each brush stroke means fetching the
//! whole feature array. This crate keeps the answer cached per block instead
//! and only refetches the blocks an edit touched.
//!
//! - [`FeatureMatrixCache`]: the operator. Invalidate regions, read the
//!   aggregate matrix.
//! - [`ArraySource`]: how the cache reads upstream data; [`MemorySource`] is
//!   an in-memory implementation.
//! - [`CacheConfig`]: block-volume budget and worker limit.
//! - [`Progress`]: percentage observers for reads.
//!
//! Blocks are laid out by [`tessera_grid`] and dirty tracking is done by
//! [`tessera_dirty`].
//!
//! ## Quick Start
//!
//! ```
//! use ndarray::{ArrayD, IxDyn};
//! use std::sync::Arc;
//! use tessera_cache::{CacheConfig, FeatureMatrixCache, MemorySource};
//!
//! // 4x4x4 volume, one label channel and one feature channel.
//! let mut labels = ArrayD::<u32>::zeros(IxDyn(&[4, 4, 4, 1]));
//! labels[[0, 0, 0, 0]] = 1;
//! labels[[3, 3, 3, 0]] = 2;
//! let features = ArrayD::from_shape_fn(IxDyn(&[4, 4, 4, 1]), |ix| (ix[0] + ix[1] + ix[2]) as f32);
//!
//! let cache = FeatureMatrixCache::new(
//!     Arc::new(MemorySource::new(labels)),
//!     Arc::new(MemorySource::new(features)),
//!     CacheConfig::default(),
//! )
//! .unwrap();
//!
//! let matrix = cache.get_matrix().unwrap();
//! assert_eq!(matrix.dim(), (2, 2));
//! assert_eq!(matrix.row(0).to_vec(), [1.0, 0.0]);
//! assert_eq!(matrix.row(1).to_vec(), [2.0, 9.0]);
//! ```
//!
//! ## Concurrency
//!
//! Every block has its own lock, created on first use. Recomputations of
//! distinct blocks run in parallel on a dedicated [`rayon`] pool; the shared
//! bookkeeping locks are held only while the dirty set or the store is being
//! updated, never during a fetch.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` for setup and reads, `trace`
//! per block and per invalidation, `warn` for failed blocks. No subscriber is
//! installed.

mod cache;
mod config;
mod engine;
mod error;
mod locks;
mod progress;
mod source;
mod store;

pub use cache::FeatureMatrixCache;
pub use config::{CacheConfig, ConfigError, DEFAULT_BLOCK_VOLUME};
pub use engine::Recompute;
pub use error::{BlockFailure, CacheError, RecomputeFailure};
pub use progress::{ObserverId, Progress};
pub use source::{ArraySource, FetchError, MemorySource};

/// The aggregate output: one row per labeled point, label first.
///
/// Entries are `f64` so that every `u32` label and every `f32` feature is
/// represented exactly.
pub type FeatureMatrix = ndarray::Array2<f64>;
