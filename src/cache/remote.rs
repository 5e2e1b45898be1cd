//! Redis-backed cache storage

use super::{CacheBackend, CacheEntry, CacheError};
use parking_lot::Mutex;
use redis::{Client, Commands, Connection};
use std::time::Duration;
use tracing::info;

const KEY_PREFIX: &str = "context-kit:cache:";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Entries stored as JSON strings under a key prefix, expiring natively via `EX`
pub struct RemoteBackend {
    conn: Mutex<Connection>,
    prefix: String,
}

impl RemoteBackend {
    /// Connect and ping; any failure is returned so the caller can fall back
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let mut conn = client.get_connection_with_timeout(CONNECT_TIMEOUT)?;
        redis::cmd("PING").query::<String>(&mut conn)?;

        info!("Connected to Redis cache at {}", url);
        Ok(Self {
            conn: Mutex::new(conn),
            prefix: KEY_PREFIX.to_string(),
        })
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

/// Seconds for `EX`, measured from the entry's last write on the caller's clock.
/// EX needs at least one second; already-expired entries are dropped server-side soon after.
fn expiry_seconds(entry: &CacheEntry) -> Option<u64> {
    let written = entry.last_accessed.unwrap_or(entry.created_at);
    entry.ttl_remaining(written).map(|secs| secs.max(1))
}

impl CacheBackend for RemoteBackend {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let raw: Option<String> = self.conn.lock().get(self.redis_key(key))?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let key = self.redis_key(&entry.key);
        let payload = serde_json::to_string(&entry)?;
        let mut conn = self.conn.lock();

        match expiry_seconds(&entry) {
            Some(secs) => conn.set_ex::<_, _, ()>(key, payload, secs)?,
            None => conn.set::<_, _, ()>(key, payload)?,
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed: usize = self.conn.lock().del(self.redis_key(key))?;
        Ok(removed > 0)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let keys = self.keys()?;
        if keys.is_empty() {
            return Ok(0);
        }

        let full: Vec<String> = keys.iter().map(|k| self.redis_key(k)).collect();
        let removed: usize = self.conn.lock().del(full)?;
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.lock();
        let pattern = format!("{}*", self.prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query(&mut *conn)?;

            keys.extend(batch.into_iter().filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string)));
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn size(&self) -> Result<usize, CacheError> {
        Ok(self.keys()?.len())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
