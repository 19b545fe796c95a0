// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache configuration.

use thiserror::Error;

/// Default target number of spatial elements per block.
pub const DEFAULT_BLOCK_VOLUME: usize = 1_000_000;

/// Tunables for a [`FeatureMatrixCache`](crate::FeatureMatrixCache).
///
/// The block-volume budget is applied at setup time and again whenever the
/// shape of the tracked arrays changes.
///
/// # Example
///
/// ```
/// use tessera_cache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_block_volume(250_000)
///     .with_max_workers(4);
/// assert!(config.validate().is_ok());
/// assert!(CacheConfig::default().with_block_volume(0).validate().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    /// Upper bound on the number of spatial elements in one block. The channel
    /// axis is not counted; blocks always span every channel.
    pub block_volume: usize,
    /// Maximum number of blocks recomputed concurrently. `None` uses one
    /// worker per available CPU.
    pub max_workers: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_volume: DEFAULT_BLOCK_VOLUME,
            max_workers: None,
        }
    }
}

impl CacheConfig {
    /// Sets the block-volume budget.
    #[must_use]
    pub fn with_block_volume(mut self, block_volume: usize) -> Self {
        self.block_volume = block_volume;
        self
    }

    /// Bounds the number of concurrent recompute workers.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Checks the configuration for values that can never work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_volume == 0 {
            return Err(ConfigError::ZeroBlockVolume);
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

/// A [`CacheConfig`] value that was rejected by [`CacheConfig::validate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The block-volume budget was zero.
    #[error("block volume budget must be positive")]
    ZeroBlockVolume,
    /// A worker limit of zero was requested.
    #[error("max_workers must be positive when set")]
    ZeroWorkers,
}
