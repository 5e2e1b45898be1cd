//! Memoizing computations through the cache

use super::CacheManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::time::Duration;
use tracing::debug;

/// Deterministic cache key for one call: `<function>:<sha256 of normalized arguments>`.
///
/// Simple arguments are normalized through `Display`, structured ones through `Debug`. Keyword
/// arguments are ordered by name so call-site ordering does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey(String);

impl MemoKey {
    pub fn builder(function: impl Into<String>) -> MemoKeyBuilder {
        MemoKeyBuilder {
            function: function.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MemoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct MemoKeyBuilder {
    function: String,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct NormalizedArgs<'a> {
    args: &'a [String],
    kwargs: &'a BTreeMap<String, String>,
}

impl MemoKeyBuilder {
    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    pub fn debug_arg(mut self, value: impl Debug) -> Self {
        self.args.push(format!("{:?}", value));
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.kwargs.insert(name.into(), value.to_string());
        self
    }

    pub fn debug_kwarg(mut self, name: impl Into<String>, value: impl Debug) -> Self {
        self.kwargs.insert(name.into(), format!("{:?}", value));
        self
    }

    pub fn build(self) -> MemoKey {
        let normalized = NormalizedArgs {
            args: &self.args,
            kwargs: &self.kwargs,
        };
        // serializing strings and a string map cannot fail
        let encoded = serde_json::to_vec(&normalized).unwrap_or_default();
        MemoKey(format!("{}:{}", self.function, hex::encode(Sha256::digest(&encoded))))
    }
}

impl CacheManager {
    /// Return the cached result for `key`, or run `compute` and cache what it returns
    pub fn cached<T, F>(&self, key: &MemoKey, ttl: Option<Duration>, compute: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(hit) = self.get::<T>(key.as_str()) {
            debug!("Memoized result for {}", key);
            return hit;
        }

        let value = compute();
        self.set(key.as_str(), &value, ttl);
        value
    }

    /// Like [`CacheManager::cached`] for fallible computations; errors are returned, never cached
    pub fn try_cached<T, E, F>(&self, key: &MemoKey, ttl: Option<Duration>, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(hit) = self.get::<T>(key.as_str()) {
            debug!("Memoized result for {}", key);
            return Ok(hit);
        }

        let value = compute()?;
        self.set(key.as_str(), &value, ttl);
        Ok(value)
    }
}
