//! On-disk embedding cache keyed by content hash

use super::EmbeddingError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const VECTORS_FILE: &str = "embeddings.bin";
const META_FILE: &str = "embeddings_meta.json";

/// Bookkeeping stored beside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMeta {
    /// RFC 3339 time the vector was stored
    pub timestamp: String,
    /// Where the text came from (file path, "task", ...)
    pub source: String,
    /// Length of the embedded text in characters
    pub length: usize,
}

#[derive(Default)]
struct Store {
    vectors: HashMap<String, Vec<f32>>,
    meta: HashMap<String, EmbeddingMeta>,
}

/// Embedding cache; identical text shares one entry regardless of source
pub struct EmbeddingCache {
    dir: Option<PathBuf>,
    store: Mutex<Store>,
}

impl EmbeddingCache {
    /// Open (or start) a cache persisted under `dir`.
    ///
    /// Missing or corrupt files yield an empty cache with a warning.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let vectors = load_vectors(&dir.join(VECTORS_FILE));
        let meta = load_meta(&dir.join(META_FILE));
        debug!("Loaded {} cached embeddings from {}", vectors.len(), dir.display());

        Self {
            dir: Some(dir),
            store: Mutex::new(Store { vectors, meta }),
        }
    }

    /// Cache that lives only for this process
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            store: Mutex::new(Store::default()),
        }
    }

    /// SHA-256 hex of the text
    pub fn key_for(text: &str) -> String {
        hex::encode(Sha256::digest(text.as_bytes()))
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.store.lock().vectors.get(&Self::key_for(text)).cloned()
    }

    pub fn set(&self, text: &str, embedding: Vec<f32>, source: &str) {
        self.insert_at(text, embedding, source, Utc::now());
    }

    fn insert_at(&self, text: &str, embedding: Vec<f32>, source: &str, at: DateTime<Utc>) {
        let key = Self::key_for(text);
        let mut store = self.store.lock();
        store.vectors.insert(key.clone(), embedding);
        store.meta.insert(
            key,
            EmbeddingMeta {
                timestamp: at.to_rfc3339(),
                source: source.to_string(),
                length: text.chars().count(),
            },
        );
        self.persist(&store);
    }

    /// Metadata for the text's entry, if cached
    pub fn meta(&self, text: &str) -> Option<EmbeddingMeta> {
        self.store.lock().meta.get(&Self::key_for(text)).cloned()
    }

    /// Remove entries older than `days`; entries without a readable timestamp count as expired
    pub fn clear_old(&self, days: u32) -> usize {
        self.clear_older_than(Utc::now() - Duration::days(i64::from(days)))
    }

    fn clear_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut store = self.store.lock();
        let Store { vectors, meta } = &mut *store;

        let before = vectors.len();
        vectors.retain(|key, _| {
            meta.get(key)
                .and_then(|m| DateTime::parse_from_rfc3339(&m.timestamp).ok())
                .map(|ts| ts.with_timezone(&Utc) >= cutoff)
                .unwrap_or(false)
        });
        meta.retain(|key, _| vectors.contains_key(key));

        let removed = before - vectors.len();
        if removed > 0 {
            debug!("Pruned {} cached embeddings", removed);
            self.persist(&store);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.lock().vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, store: &Store) {
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(e) = write_files(dir, store) {
            warn!("Failed to persist embedding cache to {}: {}", dir.display(), e);
        }
    }
}

fn write_files(dir: &Path, store: &Store) -> Result<(), EmbeddingError> {
    std::fs::create_dir_all(dir)?;

    let vectors = bincode::serialize(&store.vectors).map_err(|e| EmbeddingError::Encoding(e.to_string()))?;
    std::fs::write(dir.join(VECTORS_FILE), vectors)?;

    let meta = serde_json::to_vec_pretty(&store.meta).map_err(|e| EmbeddingError::Encoding(e.to_string()))?;
    std::fs::write(dir.join(META_FILE), meta)?;
    Ok(())
}

fn load_vectors(path: &Path) -> HashMap<String, Vec<f32>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Could not read embedding cache {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    bincode::deserialize(&bytes).unwrap_or_else(|e| {
        warn!("Embedding cache {} is corrupt, starting empty: {}", path.display(), e);
        HashMap::new()
    })
}

fn load_meta(path: &Path) -> HashMap<String, EmbeddingMeta> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Could not read embedding metadata {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!("Embedding metadata {} is corrupt, starting empty: {}", path.display(), e);
        HashMap::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_by_content() {
        let cache = EmbeddingCache::in_memory();
        cache.set("same text", vec![1.0, 2.0], "a.md");
        cache.set("same text", vec![1.0, 2.0], "b.md");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("same text"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.meta("same text").unwrap().source, "b.md");
        assert!(cache.get("other text").is_none());
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = EmbeddingCache::open(dir.path());
            cache.set("hello", vec![0.5, 0.25], "task");
        }
        let reopened = EmbeddingCache::open(dir.path());
        assert_eq!(reopened.get("hello"), Some(vec![0.5, 0.25]));
        assert_eq!(reopened.meta("hello").unwrap().length, 5);
    }

    #[test]
    fn test_corrupt_files_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VECTORS_FILE), b"not bincode at all").unwrap();
        std::fs::write(dir.path().join(META_FILE), b"{ broken json").unwrap();

        let cache = EmbeddingCache::open(dir.path());
        assert!(cache.is_empty());
        cache.set("recovers", vec![1.0], "x");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_old_removes_stale_and_unparsable() {
        let cache = EmbeddingCache::in_memory();
        let now = Utc::now();
        cache.insert_at("fresh", vec![1.0], "a", now);
        cache.insert_at("stale", vec![1.0], "b", now - Duration::days(40));
        cache.insert_at("broken", vec![1.0], "c", now);
        cache.store.lock().meta.get_mut(&EmbeddingCache::key_for("broken")).unwrap().timestamp =
            "yesterday-ish".to_string();

        let removed = cache.clear_old(30);
        assert_eq!(removed, 2);
        assert!(cache.get("fresh").is_some());
        assert!(cache.get("stale").is_none());
        assert!(cache.get("broken").is_none());
    }

    #[test]
    fn test_vector_without_meta_is_pruned() {
        let cache = EmbeddingCache::in_memory();
        cache
            .store
            .lock()
            .vectors
            .insert("orphan".to_string(), vec![1.0]);
        assert_eq!(cache.clear_old(365), 1);
    }
}
