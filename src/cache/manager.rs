//! TTL cache front-end with hit/miss accounting

use super::{CacheBackend, CacheEntry, CacheStats, Clock, FileBackend, KeyHits, RemoteBackend, StoredValue, SystemClock};
use crate::config::{CacheBackendKind, CacheSettings};
use parking_lot::ReentrantMutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache front-end shared by reference across the application.
///
/// Each operation runs under one reentrant lock, so a read-modify-write such as a hit-count
/// update never interleaves with another operation on the same manager.
pub struct CacheManager {
    backend: Box<dyn CacheBackend>,
    lock: ReentrantMutex<()>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    default_ttl: Option<Duration>,
    key_hash_threshold: usize,
}

impl CacheManager {
    /// Build the configured backend, falling back to the file backend if Redis is unusable
    pub fn open(settings: &CacheSettings) -> Self {
        let backend: Box<dyn CacheBackend> = match (&settings.backend, &settings.redis_url) {
            (CacheBackendKind::Redis, Some(url)) => match RemoteBackend::connect(url) {
                Ok(remote) => Box::new(remote),
                Err(e) => {
                    warn!("Redis cache unavailable ({}), using file cache in {}", e, settings.dir.display());
                    Box::new(FileBackend::open(&settings.dir))
                }
            },
            (CacheBackendKind::Redis, None) => {
                warn!("Redis cache requested without a URL, using file cache in {}", settings.dir.display());
                Box::new(FileBackend::open(&settings.dir))
            }
            (CacheBackendKind::File, _) => Box::new(FileBackend::open(&settings.dir)),
        };

        Self::new(backend)
            .with_default_ttl(settings.default_ttl())
            .with_key_hash_threshold(settings.key_hash_threshold)
    }

    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self {
            backend,
            lock: ReentrantMutex::new(()),
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            default_ttl: None,
            key_hash_threshold: 200,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// TTL applied by [`CacheManager::set`] when none is given
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_key_hash_threshold(mut self, threshold: usize) -> Self {
        self.key_hash_threshold = threshold;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Key as stored: long keys become `sha256:<hex>`
    pub fn storage_key(&self, key: &str) -> String {
        if key.len() > self.key_hash_threshold {
            format!("sha256:{}", hex::encode(Sha256::digest(key.as_bytes())))
        } else {
            key.to_string()
        }
    }

    /// Live entry for `key`, counting a hit or a miss.
    ///
    /// Expired entries are deleted and reported as misses.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        let _guard = self.lock.lock();
        let key = self.storage_key(key);
        let now = self.clock.now();

        let entry = match self.backend.get(&key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return self.miss(),
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return self.miss();
            }
        };

        if entry.is_expired_at(now) {
            debug!("Cache entry {} expired", key);
            self.remove(&key);
            return self.miss();
        }

        let mut entry = entry;
        entry.record_hit(now);
        if let Err(e) = self.backend.set(entry.clone()) {
            warn!("Failed to record cache hit for {}: {}", key, e);
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }

    /// Cached value for `key`, or `None` on a miss or if the value cannot be decoded as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry(key)?;
        match entry.value.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cached value for {} could not be decoded: {}", entry.key, e);
                None
            }
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Store `value`; `ttl` of `None` uses the manager's default TTL. Returns whether it was stored.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        let stored = match StoredValue::encode(value) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not serialize value for {}: {}", key, e);
                return false;
            }
        };

        let _guard = self.lock.lock();
        let key = self.storage_key(key);
        let entry = CacheEntry::new(&key, stored, self.clock.now(), ttl.or(self.default_ttl));

        match self.backend.set(entry) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Returns whether the key existed
    pub fn delete(&self, key: &str) -> bool {
        let _guard = self.lock.lock();
        let key = self.storage_key(key);
        self.remove(&key)
    }

    /// Remove everything (`None`) or every stored key containing `pattern`
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let _guard = self.lock.lock();

        let Some(pattern) = pattern else {
            return self.backend.clear().unwrap_or_else(|e| {
                warn!("Cache clear failed: {}", e);
                0
            });
        };

        self.stored_keys()
            .into_iter()
            .filter(|key| key.contains(pattern))
            .filter(|key| self.remove(key))
            .count()
    }

    /// Delete every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let _guard = self.lock.lock();
        let now = self.clock.now();

        let expired: Vec<String> = self
            .stored_keys()
            .into_iter()
            .filter(|key| matches!(self.backend.get(key), Ok(Some(entry)) if entry.is_expired_at(now)))
            .collect();

        let removed = expired.iter().filter(|key| self.remove(key)).count();
        if removed > 0 {
            debug!("Removed {} expired cache entries", removed);
        }
        removed
    }

    /// Whether a live entry exists; does not count as a hit or miss
    pub fn exists(&self, key: &str) -> bool {
        self.peek(key).is_some()
    }

    /// Seconds until expiry; `None` if the key is absent, expired, or never expires
    pub fn get_ttl(&self, key: &str) -> Option<u64> {
        let now = self.clock.now();
        self.peek(key)?.ttl_remaining(now)
    }

    /// Snapshot of counters and current contents, with the `top_n` most-hit keys
    pub fn get_stats(&self, top_n: usize) -> CacheStats {
        let _guard = self.lock.lock();
        let now = self.clock.now();

        let entries: Vec<CacheEntry> = self
            .stored_keys()
            .iter()
            .filter_map(|key| self.backend.get(key).ok().flatten())
            .collect();

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let size_bytes: usize = entries.iter().map(|e| e.size_bytes).sum();

        let mut top: Vec<KeyHits> = entries
            .iter()
            .filter(|e| e.hit_count > 0)
            .map(|e| KeyHits {
                key: e.key.clone(),
                hits: e.hit_count,
            })
            .collect();
        top.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.key.cmp(&b.key)));
        top.truncate(top_n);

        CacheStats {
            backend: self.backend_name().to_string(),
            hits,
            misses,
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
            total_entries: entries.len(),
            expired_entries: entries.iter().filter(|e| e.is_expired_at(now)).count(),
            size_bytes,
            total_size_mb: size_bytes as f64 / (1024.0 * 1024.0),
            avg_entry_size: if entries.is_empty() {
                0.0
            } else {
                size_bytes as f64 / entries.len() as f64
            },
            top_keys: top,
        }
    }

    /// Live entry without touching counters; expired entries are deleted
    fn peek(&self, key: &str) -> Option<CacheEntry> {
        let _guard = self.lock.lock();
        let key = self.storage_key(key);

        let entry = match self.backend.get(&key) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        if entry.is_expired_at(self.clock.now()) {
            self.remove(&key);
            return None;
        }
        Some(entry)
    }

    fn remove(&self, stored_key: &str) -> bool {
        let _guard = self.lock.lock();
        self.backend.delete(stored_key).unwrap_or_else(|e| {
            warn!("Cache delete failed for {}: {}", stored_key, e);
            false
        })
    }

    fn stored_keys(&self) -> Vec<String> {
        self.backend.keys().unwrap_or_else(|e| {
            warn!("Listing cache keys failed: {}", e);
            Vec::new()
        })
    }

    fn miss<T>(&self) -> Option<T> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, ManualClock};
    use std::collections::HashMap;

    fn manager(dir: &std::path::Path) -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let manager = CacheManager::new(Box::new(FileBackend::open(dir))).with_clock(clock.clone());
        (manager, clock)
    }

    /// Backend whose every operation fails
    struct BrokenBackend;

    impl CacheBackend for BrokenBackend {
        fn get(&self, _: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn set(&self, _: CacheEntry) -> Result<(), CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn delete(&self, _: &str) -> Result<bool, CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn clear(&self) -> Result<usize, CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn keys(&self) -> Result<Vec<String>, CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn size(&self) -> Result<usize, CacheError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());

        let value = serde_json::json!({"chunks": ["a.md", "b.md"], "tokens": 812});
        assert!(cache.set("selection", &value, Some(Duration::from_secs(60))));
        assert_eq!(cache.get::<serde_json::Value>("selection"), Some(value));
    }

    #[test]
    fn test_expiry_removes_key() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = manager(dir.path());

        cache.set("k", &"v", Some(Duration::from_secs(10)));
        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get::<String>("k").as_deref(), Some("v"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get_or("k", "default".to_string()), "default");
        assert!(cache.backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = manager(dir.path());

        assert_eq!(cache.get::<i32>("absent"), None);
        cache.set("present", &1, Some(Duration::from_secs(5)));
        assert_eq!(cache.get::<i32>("present"), Some(1));
        assert_eq!(cache.get::<i32>("present"), Some(1));

        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.get::<i32>("present"), None);

        let stats = cache.get_stats(10);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert!((stats.hit_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_exists_and_ttl_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = manager(dir.path());

        cache.set("k", &1, Some(Duration::from_secs(30)));
        cache.set("forever", &1, None);
        clock.advance(Duration::from_secs(10));

        assert!(cache.exists("k"));
        assert!(!cache.exists("nope"));
        assert_eq!(cache.get_ttl("k"), Some(20));
        assert_eq!(cache.get_ttl("forever"), None);
        assert_eq!(cache.get_ttl("nope"), None);

        let stats = cache.get_stats(10);
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn test_default_ttl_applies() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());
        let cache = cache.with_default_ttl(Some(Duration::from_secs(100)));

        cache.set("k", &1, None);
        assert_eq!(cache.get_ttl("k"), Some(100));
    }

    #[test]
    fn test_long_keys_are_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());
        let long_key = "x".repeat(201);

        cache.set(&long_key, &42, None);
        assert_eq!(cache.get::<i32>(&long_key), Some(42));

        let stored = cache.backend.keys().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].starts_with("sha256:"));
        assert_eq!(stored[0].len(), "sha256:".len() + 64);

        // at the threshold the key is kept as-is
        let edge = "y".repeat(200);
        assert_eq!(cache.storage_key(&edge), edge);
    }

    #[test]
    fn test_binary_values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());

        let mut graph: HashMap<(u32, u32), f32> = HashMap::new();
        graph.insert((1, 2), 0.5);
        cache.set("graph", &graph, None);

        let entry = cache.backend.get("graph").unwrap().unwrap();
        assert!(entry.value.is_binary());
        assert_eq!(cache.get::<HashMap<(u32, u32), f32>>("graph"), Some(graph));
    }

    #[test]
    fn test_invalidate_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());
        for key in ["select:a", "select:b", "tokens:a"] {
            cache.set(key, &1, None);
        }

        assert_eq!(cache.invalidate(Some("select:")), 2);
        assert!(cache.exists("tokens:a"));
        assert!(cache.delete("tokens:a"));
        assert!(!cache.delete("tokens:a"));

        cache.set("x", &1, None);
        cache.set("y", &1, None);
        assert_eq!(cache.invalidate(None), 2);
        assert_eq!(cache.backend.size().unwrap(), 0);
    }

    #[test]
    fn test_cleanup_expired() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = manager(dir.path());
        cache.set("short", &1, Some(Duration::from_secs(1)));
        cache.set("long", &1, Some(Duration::from_secs(100)));
        cache.set("forever", &1, None);

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get_stats(0).expired_entries, 1);
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.backend.keys().unwrap(), vec!["forever".to_string(), "long".to_string()]);
    }

    #[test]
    fn test_stats_top_keys_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());
        cache.set("a", &"aaaa", None);
        cache.set("b", &"bb", None);
        cache.get::<String>("b");
        cache.get::<String>("b");
        cache.get::<String>("a");

        let stats = cache.get_stats(1);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.size_bytes, "\"aaaa\"".len() + "\"bb\"".len());
        assert_eq!(
            stats.top_keys,
            vec![KeyHits {
                key: "b".to_string(),
                hits: 2
            }]
        );
        assert_eq!(stats.backend, "file");
    }

    #[test]
    fn test_hit_counts_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (cache, _) = manager(dir.path());
            cache.set("k", &1, None);
            cache.get::<i32>("k");
        }
        let (reopened, _) = manager(dir.path());
        let entry = reopened.backend.get("k").unwrap().unwrap();
        assert_eq!(entry.hit_count, 1);
        assert!(entry.last_accessed.is_some());
        // process-lifetime counters start over
        assert_eq!(reopened.get_stats(5).hits, 0);
    }

    #[test]
    fn test_backend_failures_are_misses() {
        let cache = CacheManager::new(Box::new(BrokenBackend));
        assert!(!cache.set("k", &1, None));
        assert_eq!(cache.get_or("k", 7), 7);
        assert!(!cache.delete("k"));
        assert!(!cache.exists("k"));
        assert_eq!(cache.invalidate(None), 0);
        assert_eq!(cache.cleanup_expired(), 0);
        assert_eq!(cache.get_stats(3).misses, 1);
    }

    #[test]
    fn test_open_falls_back_to_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings {
            dir: dir.path().to_path_buf(),
            backend: CacheBackendKind::Redis,
            redis_url: Some("redis://127.0.0.1:1/".to_string()),
            ..Default::default()
        };

        let cache = CacheManager::open(&settings);
        assert_eq!(cache.backend_name(), "file");
        assert!(cache.set("k", &1, None));
        assert!(dir.path().join(crate::cache::CACHE_FILE).exists());
    }

    #[test]
    fn test_decode_mismatch_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = manager(dir.path());
        cache.set("k", &"text", None);
        assert_eq!(cache.get::<u64>("k"), None);
    }
}
