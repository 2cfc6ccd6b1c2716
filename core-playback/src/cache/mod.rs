//! # Media Cache Module
//!
//! Bounded, disk-backed LRU store for remote media bytes.
//!
//! ## Overview
//!
//! The cache is consulted transparently by the data-source factory the
//! engine reads through; sessions never touch it directly. Key features:
//! - Capacity derived once at open from measured usable space
//!   (`max(0.6 × usable, 2 GiB)` by default)
//! - Least-recently-used eviction, never evicting an entry mid-read
//! - One file per entry, named by the SHA-256 of its key, plus `index.json`
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  CacheDataSourceFactory      │  (engine fetch path)
//! └────────┬─────────────────────┘
//!          │ get / put
//! ┌────────▼─────────────────────┐
//! │  CacheStore                  │
//! │  - LruCache<CacheKey, meta>  │──> <dir>/<sha256>.bin
//! │  - pins, stats               │──> <dir>/index.json
//! └──────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, CacheKey, CacheStore};
//!
//! let store = CacheStore::open(CacheConfig::new("/data/cache"), probe.as_ref()).await?;
//! let key = CacheKey::new("https://cdn/loop.mp4", 0, Some(65536));
//! if store.get(&key).await?.is_none() {
//!     store.put(key, bytes).await?;
//! }
//! ```

pub mod config;
pub mod key;
pub mod stats;
pub mod store;

pub use config::{CacheConfig, CachePolicy, CACHE_FLOOR_BYTES};
pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::{CachePin, CacheStore};
