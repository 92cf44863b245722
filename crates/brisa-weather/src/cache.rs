//! Expiring key-value cache layered over [`Storage`].
//!
//! Expiry policy is the reader's: the TTL is passed at read time, and an
//! entry is valid iff `now - stored_at < ttl`. Expired entries are lazily
//! purged on read, never proactively swept. All operations are synchronous;
//! no network I/O happens here.

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::storage::Storage;

/// Namespace-scoped view over the shared storage.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<Storage>,
    namespace: &'static str,
}

impl CacheStore {
    pub fn new(storage: Arc<Storage>, namespace: &'static str) -> Self {
        Self { storage, namespace }
    }

    /// Return the stored value if it is younger than `ttl`, removing the
    /// entry and returning None otherwise.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Result<Option<T>> {
        let Some((json, stored_at_ms)) = self.storage.kv_get_raw(self.namespace, key)? else {
            return Ok(None);
        };

        let age_ms = Storage::now_ms().saturating_sub(stored_at_ms);
        if age_ms >= ttl.as_millis() as i64 {
            tracing::debug!(key, age_ms, "cache entry expired, purging");
            self.storage.kv_delete(self.namespace, key)?;
            return Ok(None);
        }

        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Unreadable blob (schema drift): drop it and treat as a miss.
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                self.storage.kv_delete(self.namespace, key)?;
                Ok(None)
            }
        }
    }

    /// Return the stored value regardless of age, along with its storage
    /// timestamp. Offline fallback reads go through here.
    pub fn peek<T: DeserializeOwned>(&self, key: &str) -> Result<Option<(T, i64)>> {
        let Some((json, stored_at_ms)) = self.storage.kv_get_raw(self.namespace, key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some((value, stored_at_ms))),
            Err(_) => Ok(None),
        }
    }

    /// Store a value, overwriting any existing entry and stamping now.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.storage.kv_put(self.namespace, key, value)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.storage.kv_delete(self.namespace, key)
    }

    /// Remove every entry in this namespace.
    pub fn clear(&self) -> Result<()> {
        self.storage.kv_clear(self.namespace)
    }

    /// Bytes held by this namespace. Diagnostic only.
    pub fn size_bytes(&self) -> Result<u64> {
        self.storage.namespace_size_bytes(self.namespace)
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, key: &str, stored_at_ms: i64) -> Result<()> {
        self.storage.backdate(self.namespace, key, stored_at_ms)
    }

    #[cfg(test)]
    pub(crate) fn backdate_all(&self, stored_at_ms: i64) -> Result<()> {
        self.storage.backdate_all(stored_at_ms)
    }
}

/// Lower-case a query for cache keying so "São Paulo" and "são paulo"
/// share a cache line.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Key for query-shaped lookups: `<kind>:<normalized query>`.
pub fn query_key(kind: &str, query: &str) -> String {
    format!("{}:{}", kind, normalize_query(query))
}

/// Key for coordinate-shaped lookups, rounded to 2 decimal places (~1.1 km)
/// so nearby device fixes hit the same cache line.
pub fn coord_key(kind: &str, latitude: f64, longitude: f64) -> String {
    format!("{}:{:.2},{:.2}", kind, latitude, longitude)
}
