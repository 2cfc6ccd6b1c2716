//! Disk-backed LRU store

use bridge_traits::StorageProbe;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::config::{CacheConfig, INDEX_FILE_NAME};
use super::key::CacheKey;
use super::stats::CacheStats;
use crate::error::{PlaybackError, Result};

const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct EntryMeta {
    file_name: String,
    size: u64,
    last_access: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    rejected_writes: u64,
}

struct State {
    entries: LruCache<CacheKey, EntryMeta>,
    /// Includes bytes reserved by writes still in flight.
    used_bytes: u64,
    pins: HashMap<CacheKey, usize>,
    writing: HashSet<CacheKey>,
    counters: Counters,
    released: bool,
}

impl State {
    fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            used_bytes: 0,
            pins: HashMap::new(),
            writing: HashSet::new(),
            counters: Counters::default(),
            released: false,
        }
    }

    fn evictable_bytes(&self) -> u64 {
        self.entries
            .iter()
            .filter(|(key, _)| !self.pins.contains_key(*key))
            .map(|(_, meta)| meta.size)
            .sum()
    }

    /// Evict least-recently-used unpinned entries until `needed` more bytes
    /// fit. Nothing is evicted when the space cannot be found.
    fn make_room(&mut self, needed: u64, capacity: u64) -> Result<Vec<String>> {
        let over = (self.used_bytes + needed).saturating_sub(capacity);
        if over == 0 {
            return Ok(Vec::new());
        }
        if self.evictable_bytes() < over {
            return Err(PlaybackError::Cache(
                "not enough evictable space; remaining entries are being read".to_string(),
            ));
        }

        let mut victims = Vec::new();
        while self.used_bytes + needed > capacity {
            let candidate = self
                .entries
                .iter()
                .rev()
                .find(|(key, _)| !self.pins.contains_key(*key))
                .map(|(key, _)| key.clone());
            let Some(key) = candidate else { break };
            if let Some(meta) = self.entries.pop(&key) {
                self.used_bytes -= meta.size;
                self.counters.evictions += 1;
                debug!(key = %key, size = meta.size, "Evicted cache entry");
                victims.push(meta.file_name);
            }
        }
        Ok(victims)
    }

    fn records(&self) -> Vec<IndexRecord> {
        self.entries
            .iter()
            .rev()
            .map(|(key, meta)| IndexRecord {
                key: key.clone(),
                file: meta.file_name.clone(),
                size: meta.size,
                last_access: meta.last_access,
            })
            .collect()
    }
}

/// On-disk index. Records are ordered least to most recently used.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    entries: Vec<IndexRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    key: CacheKey,
    file: String,
    size: u64,
    last_access: DateTime<Utc>,
}

struct Inner {
    dir: PathBuf,
    index_path: PathBuf,
    capacity: u64,
    state: Mutex<State>,
}

/// Bounded LRU byte cache shared by every engine fetch.
///
/// Cloning is cheap; clones share the same store. Bookkeeping sits behind a
/// `parking_lot::Mutex` that is never held across file I/O.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

/// Keeps an entry from being evicted while it is held.
pub struct CachePin {
    inner: Arc<Inner>,
    key: CacheKey,
    file_name: String,
}

impl CachePin {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    fn path(&self) -> PathBuf {
        self.inner.dir.join(&self.file_name)
    }
}

impl Drop for CachePin {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if let Some(count) = state.pins.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                state.pins.remove(&self.key);
            }
        }
    }
}

impl CacheStore {
    /// Open (or create) the cache under `config.base_dir`.
    ///
    /// Capacity is computed once from the usable space `probe` reports.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::StorageUnavailable`] when the directory cannot be
    /// created or measured.
    #[instrument(skip(config, probe), fields(dir = %config.base_dir.display()))]
    pub async fn open(config: CacheConfig, probe: &dyn StorageProbe) -> Result<Self> {
        let dir = config.base_dir.clone();
        fs::create_dir_all(&dir).await.map_err(|e| {
            PlaybackError::StorageUnavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let space = probe
            .measure(&dir)
            .map_err(|e| PlaybackError::StorageUnavailable(e.to_string()))?;
        let capacity = config.policy.capacity_for(space.usable_bytes);

        let mut state = State::new();
        let index_path = config.index_path();
        for record in read_index(&index_path).await {
            match fs::metadata(dir.join(&record.file)).await {
                Ok(meta) if meta.len() == record.size => {
                    state.used_bytes += record.size;
                    state.entries.put(
                        record.key,
                        EntryMeta {
                            file_name: record.file,
                            size: record.size,
                            last_access: record.last_access,
                        },
                    );
                }
                _ => debug!(file = %record.file, "Dropping index record without a matching file"),
            }
        }

        let overflow = state.make_room(0, capacity).unwrap_or_default();
        let known: HashSet<String> = state
            .entries
            .iter()
            .map(|(_, meta)| meta.file_name.clone())
            .collect();
        let entries = state.entries.len();
        let used_bytes = state.used_bytes;

        let store = Self {
            inner: Arc::new(Inner {
                dir,
                index_path,
                capacity,
                state: Mutex::new(state),
            }),
        };
        store.remove_files(overflow);
        store.remove_orphans(&known).await;

        info!(
            capacity_bytes = capacity,
            usable_bytes = space.usable_bytes,
            entries,
            used_bytes,
            "Media cache opened"
        );
        Ok(store)
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.inner.capacity
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Returns `true` if `key` is cached. Does not affect recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.state.lock().entries.contains(key)
    }

    /// Promote `key` and protect it from eviction until the pin drops.
    pub fn pin(&self, key: &CacheKey) -> Option<CachePin> {
        let mut state = self.inner.state.lock();
        if state.released {
            return None;
        }
        let meta = state.entries.get_mut(key)?;
        meta.last_access = Utc::now();
        let file_name = meta.file_name.clone();
        *state.pins.entry(key.clone()).or_insert(0) += 1;
        Some(CachePin {
            inner: Arc::clone(&self.inner),
            key: key.clone(),
            file_name,
        })
    }

    /// Read a cached entry, promoting it to most recently used.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>> {
        let Some(pin) = self.pin(key) else {
            self.inner.state.lock().counters.misses += 1;
            return Ok(None);
        };

        match fs::read(pin.path()).await {
            Ok(data) => {
                self.inner.state.lock().counters.hits += 1;
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                drop(pin);
                warn!(key = %key, "Cache file vanished; dropping entry");
                self.forget(key);
                self.inner.state.lock().counters.misses += 1;
                Ok(None)
            }
            Err(e) => Err(PlaybackError::Cache(format!("read {} failed: {}", key, e))),
        }
    }

    /// Store `data` under `key`, evicting least-recently-used entries first.
    ///
    /// Storing an already cached key is a no-op.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Cache`] when the entry is larger than the capacity,
    /// when only pinned entries could make room, or when the write fails.
    pub async fn put(&self, key: CacheKey, data: Bytes) -> Result<()> {
        let size = data.len() as u64;
        let file_name = key.file_name();

        let victims = {
            let mut state = self.inner.state.lock();
            if state.released {
                return Err(PlaybackError::Cache("cache has been released".to_string()));
            }
            if state.entries.contains(&key) || state.writing.contains(&key) {
                return Ok(());
            }
            if size > self.inner.capacity {
                state.counters.rejected_writes += 1;
                return Err(PlaybackError::Cache(format!(
                    "entry of {} bytes exceeds capacity of {} bytes",
                    size, self.inner.capacity
                )));
            }
            let victims = match state.make_room(size, self.inner.capacity) {
                Ok(victims) => victims,
                Err(e) => {
                    state.counters.rejected_writes += 1;
                    return Err(e);
                }
            };
            state.used_bytes += size;
            state.writing.insert(key.clone());
            victims
        };

        self.remove_files(victims);
        let written = write_atomically(&self.inner.dir, &file_name, &data).await;

        let mut state = self.inner.state.lock();
        state.writing.remove(&key);
        match written {
            Ok(()) => {
                state.entries.put(
                    key,
                    EntryMeta {
                        file_name,
                        size,
                        last_access: Utc::now(),
                    },
                );
                Ok(())
            }
            Err(e) => {
                state.used_bytes -= size;
                state.counters.rejected_writes += 1;
                Err(PlaybackError::Cache(format!("write {} failed: {}", key, e)))
            }
        }
    }

    /// Remove an entry. Returns `false` when it is absent or being read.
    pub async fn remove(&self, key: &CacheKey) -> Result<bool> {
        let file_name = {
            let mut state = self.inner.state.lock();
            if state.pins.contains_key(key) {
                return Ok(false);
            }
            match state.entries.pop(key) {
                Some(meta) => {
                    state.used_bytes -= meta.size;
                    meta.file_name
                }
                None => return Ok(false),
            }
        };
        match fs::remove_file(self.inner.dir.join(file_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.entries.len(),
            used_bytes: state.used_bytes,
            capacity_bytes: self.inner.capacity,
            pinned_entries: state.pins.len(),
            hits: state.counters.hits,
            misses: state.counters.misses,
            evictions: state.counters.evictions,
            rejected_writes: state.counters.rejected_writes,
        }
    }

    /// Persist the recency index.
    pub async fn flush(&self) -> Result<()> {
        let index = IndexFile {
            version: INDEX_VERSION,
            entries: self.inner.state.lock().records(),
        };
        let json = serde_json::to_vec(&index)
            .map_err(|e| PlaybackError::Cache(format!("index serialization failed: {}", e)))?;
        write_atomically(&self.inner.dir, INDEX_FILE_NAME, &json).await?;
        debug!(entries = index.entries.len(), "Cache index flushed");
        Ok(())
    }

    /// Flush the index and refuse further writes. Called at process teardown
    /// after every session has been released.
    pub async fn release(&self) -> Result<()> {
        let result = self.flush().await;
        self.inner.state.lock().released = true;
        info!(dir = %self.inner.dir.display(), "Media cache released");
        result
    }

    fn forget(&self, key: &CacheKey) {
        let mut state = self.inner.state.lock();
        if state.pins.contains_key(key) {
            return;
        }
        if let Some(meta) = state.entries.pop(key) {
            state.used_bytes -= meta.size;
        }
    }

    /// Delete evicted files. Names a later `put` has claimed again are kept;
    /// the check and the unlink happen under the state lock.
    fn remove_files(&self, names: Vec<String>) {
        if names.is_empty() {
            return;
        }
        let state = self.inner.state.lock();
        let live: HashSet<String> = state
            .entries
            .iter()
            .map(|(_, meta)| meta.file_name.clone())
            .chain(state.writing.iter().map(CacheKey::file_name))
            .collect();
        for name in names {
            if live.contains(&name) {
                debug!(file = %name, "Evicted file was claimed again; keeping it");
                continue;
            }
            if let Err(e) = std::fs::remove_file(self.inner.dir.join(&name)) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(file = %name, error = %e, "Failed to delete evicted cache file");
                }
            }
        }
    }

    async fn remove_orphans(&self, known: &HashSet<String>) {
        let mut dir = match fs::read_dir(&self.inner.dir).await {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "Cannot scan cache directory for orphans");
                return;
            }
        };
        let mut orphans = Vec::new();
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && name != INDEX_FILE_NAME && !known.contains(&name) {
                orphans.push(name);
            }
        }
        if !orphans.is_empty() {
            debug!(count = orphans.len(), "Removing orphaned cache files");
        }
        self.remove_files(orphans);
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("dir", &self.inner.dir)
            .field("capacity", &self.inner.capacity)
            .finish_non_exhaustive()
    }
}

async fn read_index(path: &Path) -> Vec<IndexRecord> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Cache index unreadable; starting empty");
            return Vec::new();
        }
    };
    match serde_json::from_slice::<IndexFile>(&raw) {
        Ok(index) if index.version == INDEX_VERSION => index.entries,
        Ok(index) => {
            warn!(version = index.version, "Unknown cache index version; starting empty");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Cache index corrupt; starting empty");
            Vec::new()
        }
    }
}

async fn write_atomically(dir: &Path, name: &str, data: &[u8]) -> std::io::Result<()> {
    let partial = dir.join(format!("{}.part", name));
    fs::write(&partial, data).await?;
    fs::rename(&partial, dir.join(name)).await
}
