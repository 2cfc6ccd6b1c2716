//! Storage Probing
//!
//! The cache sizes itself from the space the host reports as usable on the
//! volume holding the cache directory.

use std::path::Path;

use crate::error::Result;

/// Space figures for one volume, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageSpace {
    /// Bytes the process may still write.
    pub usable_bytes: u64,
    pub total_bytes: u64,
}

/// Measures disk space.
///
/// # Errors
///
/// Implementations return [`BridgeError::NotAvailable`](crate::error::BridgeError::NotAvailable)
/// when no mounted volume contains `path`.
pub trait StorageProbe: Send + Sync {
    fn measure(&self, path: &Path) -> Result<StorageSpace>;
}
