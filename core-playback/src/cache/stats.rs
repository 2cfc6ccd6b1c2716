//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,

    /// Bytes held by entry files, including writes in flight
    pub used_bytes: u64,

    pub capacity_bytes: u64,

    /// Entries currently being read
    pub pinned_entries: usize,

    pub hits: u64,

    pub misses: u64,

    pub evictions: u64,

    /// Writes refused (oversized entry, no evictable space, or I/O failure)
    pub rejected_writes: u64,
}

impl CacheStats {
    /// Calculate cache usage as a percentage of capacity.
    pub fn usage_percentage(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 0.0;
        }

        (self.used_bytes as f64 / self.capacity_bytes as f64) * 100.0
    }

    /// Returns true if the cache is near capacity (>90%).
    pub fn is_near_capacity(&self) -> bool {
        self.usage_percentage() > 90.0
    }

    /// Fraction of lookups served from disk, in `[0, 1]`.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
