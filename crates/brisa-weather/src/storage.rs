//! SQLite-backed local storage shared by the cache, history and preferences.
//!
//! One `kv` table holds every persisted namespace as JSON blobs: the weather
//! cache, recent cities, favorites, the last-search singleton and preferences.
//! All writes are whole-value overwrites; the connection mutex is the only
//! synchronization (the runtime is single-threaded at the request level).

use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{LastSearch, Location, SavedCity, Theme};

/// Persisted namespaces. Key construction within a namespace is the
/// caller's responsibility.
pub mod ns {
    pub const WEATHER_CACHE: &str = "weather-cache";
    pub const OFFLINE: &str = "offline-records";
    pub const RECENT: &str = "recent-cities";
    pub const FAVORITES: &str = "favorite-cities";
    pub const LAST_SEARCH: &str = "last-search";
    pub const PREFS: &str = "prefs";
}

const RECENT_KEY: &str = "list";
const FAVORITES_KEY: &str = "set";
const LAST_SEARCH_KEY: &str = "current";
const THEME_KEY: &str = "theme";
const VISITED_KEY: &str = "has_visited";

/// Process-wide persistent storage. Outlives any single request.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open (or create) the storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory storage (for tests and ephemeral sessions).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                stored_at_ms INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            );

            CREATE INDEX IF NOT EXISTS idx_kv_namespace ON kv(namespace);
            "#,
        )?;
        Ok(())
    }

    pub(crate) fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ---- low-level kv ----

    /// Store a value, stamping the current time. Overwrites any existing entry.
    pub(crate) fn kv_put<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO kv (namespace, key, value, stored_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![namespace, key, json, Self::now_ms()],
        )?;
        Ok(())
    }

    /// Fetch a value and its storage timestamp without interpreting TTLs.
    pub(crate) fn kv_get_raw(&self, namespace: &str, key: &str) -> Result<Option<(String, i64)>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT value, stored_at_ms FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Fetch and deserialize a value, ignoring its age.
    pub(crate) fn kv_get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>> {
        match self.kv_get_raw(namespace, key)? {
            Some((json, _)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn kv_delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.conn.lock().execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(())
    }

    pub(crate) fn kv_clear(&self, namespace: &str) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE namespace = ?1", params![namespace])?;
        Ok(())
    }

    /// Stored bytes within one namespace. Diagnostic only.
    pub(crate) fn namespace_size_bytes(&self, namespace: &str) -> Result<u64> {
        let total: i64 = self.conn.lock().query_row(
            "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM kv WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    /// Rewrite an entry's storage timestamp (test support for TTL expiry).
    #[cfg(test)]
    pub(crate) fn backdate(&self, namespace: &str, key: &str, stored_at_ms: i64) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE kv SET stored_at_ms = ?3 WHERE namespace = ?1 AND key = ?2",
            params![namespace, key, stored_at_ms],
        )?;
        Ok(())
    }

    /// Rewrite every entry's storage timestamp (test support for TTL expiry).
    #[cfg(test)]
    pub(crate) fn backdate_all(&self, stored_at_ms: i64) -> Result<()> {
        self.conn
            .lock()
            .execute("UPDATE kv SET stored_at_ms = ?1", params![stored_at_ms])?;
        Ok(())
    }

    /// Total stored bytes across all namespaces. Diagnostic only.
    pub fn size_bytes(&self) -> Result<u64> {
        let total: i64 = self.conn.lock().query_row(
            "SELECT COALESCE(SUM(LENGTH(namespace) + LENGTH(key) + LENGTH(value)), 0) FROM kv",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    /// Remove every persisted namespace.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.lock().execute("DELETE FROM kv", [])?;
        Ok(())
    }

    // ---- recent cities ----

    /// Add a city to the recent list: deduped by (name, country), moved to
    /// the front, capped at `cap` entries (oldest evicted).
    pub fn add_recent(&self, location: &Location, cap: usize) -> Result<()> {
        self.add_recent_at(location, cap, Self::now_ms())
    }

    fn add_recent_at(&self, location: &Location, cap: usize, saved_at_ms: i64) -> Result<()> {
        let entry = SavedCity::from_location(location, saved_at_ms);
        let mut list = self.recent_cities()?;
        list.retain(|existing| !existing.same_city(&entry));
        list.insert(0, entry);
        list.truncate(cap);
        self.kv_put(ns::RECENT, RECENT_KEY, &list)
    }

    /// Most-recent-first list of recently searched cities.
    pub fn recent_cities(&self) -> Result<Vec<SavedCity>> {
        Ok(self
            .kv_get::<Vec<SavedCity>>(ns::RECENT, RECENT_KEY)?
            .unwrap_or_default())
    }

    pub fn clear_recent(&self) -> Result<()> {
        self.kv_clear(ns::RECENT)
    }

    // ---- favorites ----

    /// Add a city to the favorites set. Returns false if it was already there.
    pub fn add_favorite(&self, location: &Location) -> Result<bool> {
        let entry = SavedCity::from_location(location, Self::now_ms());
        let mut set = self.favorites()?;
        if set.iter().any(|existing| existing.same_city(&entry)) {
            return Ok(false);
        }
        set.push(entry);
        self.kv_put(ns::FAVORITES, FAVORITES_KEY, &set)?;
        Ok(true)
    }

    /// Remove a city from the favorites set. Returns false if it wasn't there.
    pub fn remove_favorite(&self, name: &str, country: &str) -> Result<bool> {
        let mut set = self.favorites()?;
        let before = set.len();
        set.retain(|c| {
            !(c.name.eq_ignore_ascii_case(name) && c.country.eq_ignore_ascii_case(country))
        });
        let removed = set.len() != before;
        if removed {
            self.kv_put(ns::FAVORITES, FAVORITES_KEY, &set)?;
        }
        Ok(removed)
    }

    pub fn is_favorite(&self, name: &str, country: &str) -> Result<bool> {
        Ok(self.favorites()?.iter().any(|c| {
            c.name.eq_ignore_ascii_case(name) && c.country.eq_ignore_ascii_case(country)
        }))
    }

    pub fn favorites(&self) -> Result<Vec<SavedCity>> {
        Ok(self
            .kv_get::<Vec<SavedCity>>(ns::FAVORITES, FAVORITES_KEY)?
            .unwrap_or_default())
    }

    // ---- last search ----

    pub fn set_last_search(&self, city_name: &str) -> Result<()> {
        let entry = LastSearch {
            city_name: city_name.to_string(),
            saved_at_ms: Self::now_ms(),
        };
        self.kv_put(ns::LAST_SEARCH, LAST_SEARCH_KEY, &entry)
    }

    /// The last successful search, or None if absent or older than `expiry`.
    /// Expired entries are removed as a side effect.
    pub fn last_search(&self, expiry: Duration) -> Result<Option<LastSearch>> {
        let Some(entry) = self.kv_get::<LastSearch>(ns::LAST_SEARCH, LAST_SEARCH_KEY)? else {
            return Ok(None);
        };
        let age_ms = Self::now_ms().saturating_sub(entry.saved_at_ms);
        if age_ms >= expiry.as_millis() as i64 {
            self.clear_last_search()?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub fn clear_last_search(&self) -> Result<()> {
        self.kv_clear(ns::LAST_SEARCH)
    }

    // ---- preferences ----

    pub fn theme(&self) -> Result<Theme> {
        Ok(self
            .kv_get::<Theme>(ns::PREFS, THEME_KEY)?
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.kv_put(ns::PREFS, THEME_KEY, &theme)
    }

    /// Whether this profile has opened the app before.
    pub fn has_visited(&self) -> Result<bool> {
        Ok(self
            .kv_get::<bool>(ns::PREFS, VISITED_KEY)?
            .unwrap_or(false))
    }

    pub fn mark_visited(&self) -> Result<()> {
        self.kv_put(ns::PREFS, VISITED_KEY, &true)
    }
}
