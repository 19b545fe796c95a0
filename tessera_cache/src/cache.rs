// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The feature-matrix cache operator.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array2;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tessera_dirty::DirtySet;
use tessera_grid::{BlockGrid, BlockId, Region};
use tracing::{debug, trace, warn};

use crate::FeatureMatrix;
use crate::config::CacheConfig;
use crate::engine::{Layout, Recompute, extract_block_matrix};
use crate::error::{BlockFailure, CacheError, RecomputeFailure};
use crate::locks::LockTable;
use crate::progress::Progress;
use crate::source::ArraySource;
use crate::store::BlockStore;

/// Share of the progress range covered by block recomputation. The rest is
/// reported once the aggregate matrix is assembled.
const RECOMPUTE_SHARE: f64 = 95.0;

/// Blockwise, incrementally maintained matrix of labeled feature vectors.
///
/// The cache tracks a label source (one channel, `0` meaning unlabeled) and a
/// feature source (`K` channels) over the same spatial axes. Its output has
/// one row per labeled point: the label in column 0, then the point's `K`
/// feature values.
///
/// The spatial index space is split into blocks. Invalidations mark the
/// blocks they touch as dirty; [`get_matrix`](Self::get_matrix) recomputes
/// only the dirty blocks, in parallel, and concatenates every cached block
/// matrix in [`BlockId`] order.
///
/// All methods take `&self`; the cache can be shared between threads, and
/// invalidations may race reads. A block recomputed just before a racing
/// invalidation stays dirty and is recomputed on the next read.
///
/// # Example
///
/// ```
/// use ndarray::{ArrayD, IxDyn};
/// use std::sync::Arc;
/// use tessera_cache::{CacheConfig, FeatureMatrixCache, MemorySource};
/// use tessera_grid::Region;
///
/// let labels = Arc::new(MemorySource::new(ArrayD::<u32>::zeros(IxDyn(&[16, 16, 1]))));
/// let features = Arc::new(MemorySource::new(ArrayD::<f32>::ones(IxDyn(&[16, 16, 3]))));
/// let cache = FeatureMatrixCache::new(
///     Arc::clone(&labels),
///     features,
///     CacheConfig::default().with_block_volume(64),
/// )
/// .unwrap();
/// assert_eq!(cache.get_matrix().unwrap().dim(), (0, 4));
///
/// // Paint one label and tell the cache where.
/// labels.update(|a| a[[9, 2, 0]] = 1);
/// cache.on_region_invalidated(&Region::new(&[9, 2], &[10, 3]).unwrap()).unwrap();
///
/// let matrix = cache.get_matrix().unwrap();
/// assert_eq!(matrix.row(0).to_vec(), [1.0, 1.0, 1.0, 1.0]);
/// ```
pub struct FeatureMatrixCache<L, F> {
    labels: L,
    features: F,
    config: CacheConfig,
    pool: ThreadPool,
    layout: RwLock<Arc<Layout>>,
    dirty: Mutex<DirtySet<BlockId>>,
    locks: LockTable<BlockId>,
    store: BlockStore,
    progress: Progress,
}

impl<L, F> fmt::Debug for FeatureMatrixCache<L, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = self.layout.read();
        f.debug_struct("FeatureMatrixCache")
            .field("config", &self.config)
            .field("grid", &layout.grid)
            .field("dirty", &self.dirty.lock().len())
            .field("cached", &self.store.len())
            .field("workers", &self.pool.current_num_threads())
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl<L, F> FeatureMatrixCache<L, F>
where
    L: ArraySource<u32>,
    F: ArraySource<f32>,
{
    /// Creates a cache over `labels` and `features`.
    ///
    /// Fails before any block work if the configuration is invalid or the two
    /// sources do not share their spatial axes. Every block starts dirty.
    pub fn new(labels: L, features: F, config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let layout = Layout::resolve(&labels.shape(), &features.shape(), config.block_volume)?;

        let mut builder =
            ThreadPoolBuilder::new().thread_name(|i| format!("tessera-recompute-{i}"));
        if let Some(workers) = config.max_workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build()?;

        let cache = Self {
            labels,
            features,
            config,
            pool,
            layout: RwLock::new(Arc::new(layout.clone())),
            dirty: Mutex::new(DirtySet::new()),
            locks: LockTable::default(),
            store: BlockStore::default(),
            progress: Progress::default(),
        };
        cache.install_layout(layout);
        Ok(cache)
    }

    /// Re-reads both source shapes and rebuilds the block grid.
    ///
    /// Drops every cached block matrix and marks every block dirty. This runs
    /// automatically when a read notices that a source changed shape.
    pub fn setup(&self) -> Result<(), CacheError> {
        let layout = Layout::resolve(
            &self.labels.shape(),
            &self.features.shape(),
            self.config.block_volume,
        )?;
        self.install_layout(layout);
        Ok(())
    }

    fn install_layout(&self, layout: Layout) -> Arc<Layout> {
        let layout = Arc::new(layout);
        let mut current = self.layout.write();
        self.store.clear();
        let mut dirty = self.dirty.lock();
        dirty.clear_all();
        let blocks = dirty.mark_all(layout.grid.blocks());
        debug!(
            labels = ?layout.label_shape.as_slice(),
            features = ?layout.feature_shape.as_slice(),
            block_shape = ?layout.grid.block_shape(),
            blocks,
            "cache setup"
        );
        *current = Arc::clone(&layout);
        layout
    }

    fn refresh_layout(&self) -> Result<Arc<Layout>, CacheError> {
        let labels = self.labels.shape();
        let features = self.features.shape();
        let current = self.layout.read().clone();
        if current.matches(&labels, &features) {
            return Ok(current);
        }
        debug!(
            labels = ?labels.as_slice(),
            features = ?features.as_slice(),
            "source shape changed"
        );
        let layout = Layout::resolve(&labels, &features, self.config.block_volume)?;
        Ok(self.install_layout(layout))
    }

    /// Marks every block overlapping `region` as dirty.
    ///
    /// `region` may carry the channel axis (which is ignored) or only the
    /// spatial axes. Parts outside the array are ignored. Returns the number
    /// of blocks that were clean before the call.
    pub fn mark_dirty(&self, region: &Region) -> Result<usize, CacheError> {
        let layout = self.layout.read();
        let spatial = layout.spatial_region(region)?;
        let blocks = layout.grid.intersecting_blocks(&spatial)?;
        let newly = self.dirty.lock().mark_all(blocks);
        trace!(%region, newly, "region invalidated");
        Ok(newly)
    }

    /// Upstream notification that labels or features inside `region` changed.
    ///
    /// Same as [`mark_dirty`](Self::mark_dirty).
    pub fn on_region_invalidated(&self, region: &Region) -> Result<usize, CacheError> {
        self.mark_dirty(region)
    }

    /// Marks every block dirty without dropping the cached matrices.
    pub fn invalidate_all(&self) -> usize {
        let layout = self.layout.read();
        self.dirty.lock().mark_all(layout.grid.blocks())
    }

    /// Returns the aggregate matrix, recomputing dirty blocks first.
    ///
    /// Blocks dirty when the call starts are recomputed on the worker pool.
    /// Blocks dirtied while it runs wait for the next call. Progress
    /// observers see `95 * done / dirty` as blocks finish, then `100` once
    /// the matrix is assembled.
    ///
    /// If [`setup`](Self::setup) replaces the block layout during the call,
    /// the results of the old layout are discarded and the read starts
    /// another pass over the new one. Progress does not step back for it.
    ///
    /// If any block fails, the other blocks still finish, the failed ones
    /// stay dirty and a single [`CacheError::Recompute`] lists them.
    pub fn get_matrix(&self) -> Result<FeatureMatrix, CacheError> {
        self.progress.begin();
        loop {
            let layout = self.refresh_layout()?;
            self.recompute_pending(&layout)?;

            let current = self.layout.read();
            if Arc::ptr_eq(&*current, &layout) {
                // Setup clears the store under the write lock, so it cannot run here.
                let matrix = self.store.concatenate(layout.columns())?;
                drop(current);
                self.progress.report(100.0);
                debug!(rows = matrix.nrows(), blocks = self.store.len(), "feature matrix assembled");
                return Ok(matrix);
            }
            drop(current);
            debug!("layout replaced during read, starting another pass");
        }
    }

    fn recompute_pending(&self, layout: &Arc<Layout>) -> Result<(), RecomputeFailure> {
        let pending = self.dirty.lock().snapshot_sorted();
        let total = pending.len();
        debug!(dirty = total, cached = self.store.len(), "reading feature matrix");

        let done = AtomicUsize::new(0);
        let failures: Vec<BlockFailure> = self.pool.install(|| {
            pending
                .par_iter()
                .filter_map(|&block| {
                    let outcome = self.recompute_in(layout, block);
                    let finished = done.fetch_add(1, Ordering::AcqRel) + 1;
                    self.progress
                        .report(RECOMPUTE_SHARE * finished as f64 / total as f64);
                    outcome.err()
                })
                .collect()
        });

        if failures.is_empty() {
            return Ok(());
        }
        for failure in &failures {
            warn!(block = %failure.block, error = %failure.source, "block recompute failed");
        }
        Err(RecomputeFailure::new(failures, total))
    }

    /// Recomputes one block if it is dirty.
    ///
    /// Returns [`Recompute::Skipped`] if the block is already clean, for
    /// instance because a racing recompute got there first.
    pub fn recompute_block(&self, block: BlockId) -> Result<Recompute, BlockFailure> {
        let layout = self.layout.read().clone();
        self.recompute_in(&layout, block)
    }

    fn recompute_in(&self, layout: &Arc<Layout>, block: BlockId) -> Result<Recompute, BlockFailure> {
        let lock = self.locks.get_or_insert(block);
        let _guard = lock.lock();

        let Some(stamp) = self.dirty.lock().stamp(block) else {
            return Ok(Recompute::Skipped);
        };
        let bounds = layout
            .grid
            .block_bounds(block)
            .map_err(|err| BlockFailure {
                block,
                region: None,
                source: err.into(),
            })?;
        let matrix = extract_block_matrix(&self.labels, &self.features, layout, &bounds)
            .map_err(|source| BlockFailure {
                block,
                region: Some(bounds.clone()),
                source,
            })?;

        let current = self.layout.read();
        if !Arc::ptr_eq(&*current, layout) {
            // Setup ran meanwhile; this block belongs to the old grid.
            return Ok(Recompute::Skipped);
        }
        let rows = matrix.nrows();
        self.store.install(block, matrix);
        let cleared = self.dirty.lock().clear_if_unchanged(block, stamp);
        drop(current);
        trace!(%block, %bounds, rows, cleared, "block recomputed");
        Ok(Recompute::Installed { rows })
    }

    /// Returns a copy of the current block grid.
    #[must_use]
    pub fn grid(&self) -> BlockGrid {
        self.layout.read().grid.clone()
    }

    /// Returns `true` if `block` is waiting to be recomputed.
    #[must_use]
    pub fn is_dirty(&self, block: BlockId) -> bool {
        self.dirty.lock().is_dirty(block)
    }

    /// Returns the dirty blocks in block order.
    #[must_use]
    pub fn dirty_blocks(&self) -> Vec<BlockId> {
        self.dirty.lock().snapshot_sorted()
    }

    /// Returns the blocks that have a cached matrix, in block order.
    #[must_use]
    pub fn cached_blocks(&self) -> Vec<BlockId> {
        self.store.keys()
    }

    /// Returns the cached matrix of one block, if any.
    #[must_use]
    pub fn block_matrix(&self, block: BlockId) -> Option<Arc<Array2<f64>>> {
        self.store.get(block)
    }

    /// Returns the number of per-block locks created so far.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Returns the number of feature channels `K`.
    #[must_use]
    pub fn feature_channels(&self) -> usize {
        self.layout.read().feature_channels()
    }

    /// Returns the column count of the output, `1 + K`.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.layout.read().columns()
    }

    /// Returns the configuration the cache was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the progress reporter of this cache.
    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Returns the label source.
    #[must_use]
    pub fn labels(&self) -> &L {
        &self.labels
    }

    /// Returns the feature source.
    #[must_use]
    pub fn features(&self) -> &F {
        &self.features
    }
}
