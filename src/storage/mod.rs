//! Persistence layer.
//!
//! `ItemCache` is the id → `ItemRecord` store shared by every concurrent
//! scan task. A single lock guards the map; it is held for one map
//! operation at a time and never across a network call.
//!
//! The cache persists to one JSON file by whole-file replace: the new
//! contents go to a sibling temp file which is then renamed over the old
//! one, so a crash mid-save loses at most that save. The file is private
//! to one process.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::types::ItemRecord;

/// Default cache file path.
pub const DEFAULT_CACHE_FILE: &str = "item_cache.json";

struct CacheState {
    items: BTreeMap<i64, ItemRecord>,
    read_enabled: bool,
}

/// Lock-guarded item metadata cache.
pub struct ItemCache {
    path: PathBuf,
    state: Mutex<CacheState>,
    /// Serialises file writes. Taken before `state`, never after.
    save_lock: Mutex<()>,
}

impl ItemCache {
    /// Create an empty cache bound to `path`. Nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(CacheState {
                items: BTreeMap::new(),
                read_enabled: true,
            }),
            save_lock: Mutex::new(()),
        }
    }

    /// Create a cache bound to `path` and load it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let cache = Self::new(path);
        cache.load()?;
        Ok(cache)
    }

    // -- Map operations --------------------------------------------------

    /// Cached record for `id`, or `None` if absent or reads are disabled.
    pub fn read(&self, id: i64) -> Option<ItemRecord> {
        let state = self.state.lock();
        if !state.read_enabled {
            return None;
        }
        state.items.get(&id).cloned()
    }

    /// Store `record` under `id`.
    ///
    /// A record older than the one already stored is ignored so timestamps
    /// never go backwards. Returns whether the write was applied.
    pub fn write(&self, id: i64, record: ItemRecord) -> bool {
        let mut state = self.state.lock();
        if let Some(existing) = state.items.get(&id) {
            if existing.updated > record.updated {
                debug!(item_id = id, "Ignoring write older than cached record");
                return false;
            }
        }
        state.items.insert(id, record);
        true
    }

    /// Remove `id`, returning the record that was stored.
    pub fn delete(&self, id: i64) -> Option<ItemRecord> {
        self.state.lock().items.remove(&id)
    }

    /// All cached ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        self.state.lock().items.keys().copied().collect()
    }

    /// Snapshot of all records in ascending id order.
    ///
    /// Ignores the read switch: maintenance listings always see the cache.
    pub fn entries(&self) -> Vec<ItemRecord> {
        self.state.lock().items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Read switch -----------------------------------------------------

    /// Force every `read` to miss without clearing the cache.
    pub fn disable_read(&self) {
        self.state.lock().read_enabled = false;
    }

    pub fn enable_read(&self) {
        self.state.lock().read_enabled = true;
    }

    pub fn read_enabled(&self) -> bool {
        self.state.lock().read_enabled
    }

    // -- Persistence -----------------------------------------------------

    /// Write the whole cache to disk, replacing the previous file.
    ///
    /// Saves are serialised and each one snapshots the map after taking the
    /// file lock, so the last save to finish holds the newest contents.
    pub fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        let snapshot = self.state.lock().items.clone();
        let json = serde_json::to_string(&snapshot).context("Failed to serialise item cache")?;

        let tmp = self.temp_path();
        let cleanup_and_err = |e: std::io::Error| {
            let _ = std::fs::remove_file(&tmp);
            e
        };

        std::fs::write(&tmp, &json)
            .map_err(cleanup_and_err)
            .with_context(|| format!("Failed to write item cache to {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(cleanup_and_err)
            .with_context(|| format!("Failed to replace item cache at {}", self.path.display()))?;

        debug!(path = %self.path.display(), items = snapshot.len(), "Item cache saved");
        Ok(())
    }

    /// Replace the in-memory contents with the file on disk.
    ///
    /// A missing file leaves the cache empty. Returns the number of records.
    pub fn load(&self) -> Result<usize> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No item cache found, starting empty");
            return Ok(0);
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read item cache from {}", self.path.display()))?;
        let items: BTreeMap<i64, ItemRecord> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse item cache from {}", self.path.display()))?;

        let count = items.len();
        self.state.lock().items = items;

        info!(path = %self.path.display(), items = count, "Item cache loaded from disk");
        Ok(count)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_CACHE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
