// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block cache store and aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis};
use parking_lot::RwLock;
use tessera_grid::BlockId;

/// Most recently computed matrix of every clean or once-computed block.
///
/// Entries are replaced wholesale. Iteration and aggregation follow
/// [`BlockId`] order.
#[derive(Debug, Default)]
pub(crate) struct BlockStore {
    blocks: RwLock<BTreeMap<BlockId, Arc<Array2<f64>>>>,
}

impl BlockStore {
    /// Installs `matrix` for `block`, replacing any previous entry.
    pub(crate) fn install(&self, block: BlockId, matrix: Array2<f64>) {
        self.blocks.write().insert(block, Arc::new(matrix));
    }

    pub(crate) fn get(&self, block: BlockId) -> Option<Arc<Array2<f64>>> {
        self.blocks.read().get(&block).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub(crate) fn keys(&self) -> Vec<BlockId> {
        self.blocks.read().keys().copied().collect()
    }

    pub(crate) fn clear(&self) {
        self.blocks.write().clear();
    }

    /// Concatenates every stored matrix row-wise, in block order.
    ///
    /// An empty store yields a zero-row matrix with `columns` columns.
    pub(crate) fn concatenate(&self, columns: usize) -> Result<Array2<f64>, ndarray::ShapeError> {
        // Clone the handles so the lock is not held while copying rows.
        let parts: Vec<Arc<Array2<f64>>> = self.blocks.read().values().cloned().collect();
        if parts.is_empty() {
            return Ok(Array2::zeros((0, columns)));
        }
        let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|m| m.view()).collect();
        ndarray::concatenate(Axis(0), &views)
    }
}
