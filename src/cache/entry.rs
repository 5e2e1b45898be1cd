//! Cache entries, stored payloads, stats, and the clock used for expiry

use super::CacheError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source of "now" for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
pub(crate) struct ManualClock(parking_lot::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self(parking_lot::Mutex::new(Utc::now()))
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// Serialized cache payload.
///
/// JSON when the value can be represented as JSON, otherwise hex-encoded bincode (maps with
/// non-string keys, for instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "data", rename_all = "snake_case")]
pub enum StoredValue {
    Json(serde_json::Value),
    Binary(String),
}

impl StoredValue {
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, CacheError> {
        match serde_json::to_value(value) {
            Ok(json) => Ok(Self::Json(json)),
            Err(_) => {
                let bytes = bincode::serialize(value)?;
                Ok(Self::Binary(hex::encode(bytes)))
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CacheError> {
        match self {
            Self::Json(json) => Ok(T::deserialize(json)?),
            Self::Binary(encoded) => {
                let bytes = hex::decode(encoded)?;
                Ok(bincode::deserialize(&bytes)?)
            }
        }
    }

    /// Size of the serialized payload
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Json(json) => json.to_string().len(),
            Self::Binary(encoded) => encoded.len() / 2,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// A cached value plus bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: StoredValue,
    pub created_at: DateTime<Utc>,
    /// `None` never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub hit_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub size_bytes: usize,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: StoredValue, now: DateTime<Utc>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            key: key.into(),
            size_bytes: value.size_bytes(),
            value,
            created_at: now,
            expires_at,
            hit_count: 0,
            last_accessed: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }

    /// Whole seconds until expiry; `None` if the entry never expires
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        self.expires_at
            .map(|expires| (expires - now).num_seconds().max(0) as u64)
    }

    pub fn record_hit(&mut self, now: DateTime<Utc>) {
        self.hit_count += 1;
        self.last_accessed = Some(now);
    }
}

/// Hit count for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyHits {
    pub key: String,
    pub hits: u64,
}

/// Point-in-time cache statistics; hits and misses cover this process only
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub total_entries: usize,
    pub expired_entries: usize,
    pub size_bytes: usize,
    pub total_size_mb: f64,
    pub avg_entry_size: f64,
    pub top_keys: Vec<KeyHits>,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Cache Stats ({}) ===", self.backend)?;
        writeln!(f, "Hits: {}", self.hits)?;
        writeln!(f, "Misses: {}", self.misses)?;
        writeln!(f, "Hit rate: {:.1}%", self.hit_rate * 100.0)?;
        writeln!(f, "Entries: {} ({} expired)", self.total_entries, self.expired_entries)?;
        writeln!(f, "Size: {:.3} MB (avg {:.0} bytes/entry)", self.total_size_mb, self.avg_entry_size)?;

        if !self.top_keys.is_empty() {
            writeln!(f, "\nMost hit keys:")?;
            for key in &self.top_keys {
                writeln!(f, "  {:>6}  {}", key.hits, key.key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_json_round_trip() {
        let value = vec!["a".to_string(), "b".to_string()];
        let stored = StoredValue::encode(&value).unwrap();
        assert!(!stored.is_binary());
        assert_eq!(stored.decode::<Vec<String>>().unwrap(), value);
        assert_eq!(stored.size_bytes(), r#"["a","b"]"#.len());
    }

    #[test]
    fn test_binary_fallback_for_non_string_keys() {
        let mut value: HashMap<(u32, u32), String> = HashMap::new();
        value.insert((1, 2), "edge".to_string());

        let stored = StoredValue::encode(&value).unwrap();
        assert!(stored.is_binary());
        assert_eq!(stored.decode::<HashMap<(u32, u32), String>>().unwrap(), value);
    }

    #[test]
    fn test_stored_value_serialized_shape() {
        let json = serde_json::to_value(StoredValue::Json(serde_json::json!(5))).unwrap();
        assert_eq!(json, serde_json::json!({"encoding": "json", "data": 5}));
    }

    #[test]
    fn test_expiry_is_strictly_after() {
        let now = Utc::now();
        let entry = CacheEntry::new("k", StoredValue::Json(1.into()), now, Some(Duration::from_secs(60)));

        assert!(!entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now + chrono::Duration::seconds(60)));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(61)));
        assert_eq!(entry.ttl_remaining(now + chrono::Duration::seconds(15)), Some(45));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let now = Utc::now();
        let entry = CacheEntry::new("k", StoredValue::Json(1.into()), now, None);
        assert!(!entry.is_expired_at(now + chrono::Duration::days(10_000)));
        assert_eq!(entry.ttl_remaining(now), None);
    }

    #[test]
    fn test_stats_display() {
        let stats = CacheStats {
            backend: "file".to_string(),
            hits: 3,
            misses: 1,
            hit_rate: 0.75,
            top_keys: vec![KeyHits {
                key: "popular".to_string(),
                hits: 3,
            }],
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("Hit rate: 75.0%"));
        assert!(text.contains("popular"));
    }
}
