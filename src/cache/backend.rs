//! Storage backends for [`super::CacheManager`]

use super::{CacheEntry, CacheError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the on-disk cache inside the cache directory
pub const CACHE_FILE: &str = "cache.json";

/// Key/entry storage. Expiry is enforced by the manager; backends may also expire natively.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Returns whether the key existed
    fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove everything, returning the number of entries removed
    fn clear(&self) -> Result<usize, CacheError>;

    fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Number of stored entries
    fn size(&self) -> Result<usize, CacheError>;

    fn name(&self) -> &'static str;
}

/// Single JSON file holding every entry, mirrored in memory and rewritten after each mutation
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
}

impl FileBackend {
    /// Open `dir/cache.json`. A missing file starts empty; a corrupt one is logged and replaced on
    /// the next write.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(CACHE_FILE);
        let entries = load_entries(&path);
        debug!("Loaded {} cache entries from {}", entries.len(), path.display());

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write to a sibling temp file and rename over the cache file
    fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, CacheEntry> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!("Could not read cache file {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_slice(&content) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cache file {} is corrupt, starting empty: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

impl CacheBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        entries.insert(entry.key.clone(), entry);
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        self.persist(&entries)?;
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn size(&self) -> Result<usize, CacheError> {
        Ok(self.entries.lock().len())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
