//! Cache configuration and sizing policy

use core_runtime::config::{CoreConfig, DEFAULT_CACHE_FLOOR_BYTES, DEFAULT_CACHE_USABLE_FRACTION};
use std::path::PathBuf;

/// Minimum capacity regardless of reported free space (2 GiB).
pub const CACHE_FLOOR_BYTES: u64 = DEFAULT_CACHE_FLOOR_BYTES;

/// File holding the persisted recency index.
pub const INDEX_FILE_NAME: &str = "index.json";

/// How capacity follows the measured usable space.
///
/// `capacity = max(usable × usable_fraction, floor_bytes)`. The result is
/// monotonically non-decreasing in `usable` and never below the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    pub usable_fraction: f64,
    pub floor_bytes: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            usable_fraction: DEFAULT_CACHE_USABLE_FRACTION,
            floor_bytes: CACHE_FLOOR_BYTES,
        }
    }
}

impl CachePolicy {
    pub fn capacity_for(&self, usable_bytes: u64) -> u64 {
        let share = (usable_bytes as f64 * self.usable_fraction) as u64;
        share.max(self.floor_bytes)
    }
}

/// Configuration for [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding entry files and the index
    pub base_dir: PathBuf,
    pub policy: CachePolicy,
}

impl CacheConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            policy: CachePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cache settings taken from the core configuration.
    pub fn from_core(config: &CoreConfig) -> Self {
        Self::new(config.cache_dir.clone()).with_policy(CachePolicy {
            usable_fraction: config.cache_usable_fraction,
            floor_bytes: config.cache_floor_bytes,
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE_NAME)
    }
}
