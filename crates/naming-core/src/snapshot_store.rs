//! Persisted name-map snapshots: short-term cache (DashMap) and long-term Sled DB.
//!
//! Each map is stored as one flat JSON object under a namespaced key. Every failure
//! (corrupt JSON, sled I/O) is logged and degrades to "no cache"; nothing propagates.

use crate::shared::{Sourced, ALL_STORAGE_KEYS, LAST_UPDATED_KEY};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_NAMESPACE: &str = "naming";

/// Snapshot store for the name maps.
#[derive(Clone)]
pub struct SnapshotStore {
    db: Db,
    namespace: String,
    /// Hot cache: namespaced key -> raw JSON bytes. Checked before Sled.
    cache: Arc<DashMap<String, Vec<u8>>>,
    /// Largest value a single write may store. Larger writes are refused.
    quota: Option<usize>,
}

impl SnapshotStore {
    /// Opens or creates a Sled database at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P, namespace: &str) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self::with_db(db, namespace))
    }

    /// Temporary database removed on drop.
    pub fn in_memory(namespace: &str) -> Result<Self, sled::Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::with_db(db, namespace))
    }

    fn with_db(db: Db, namespace: &str) -> Self {
        let namespace = match namespace.trim() {
            "" => DEFAULT_NAMESPACE.to_string(),
            ns => ns.to_string(),
        };
        Self {
            db,
            namespace,
            cache: Arc::new(DashMap::new()),
            quota: None,
        }
    }

    /// Caps every stored value at `max_bytes`. Oversized writes fail like a full disk:
    /// logged, nothing stored, the previous snapshot left in place.
    pub fn with_quota(mut self, max_bytes: usize) -> Self {
        self.quota = Some(max_bytes);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn read_raw(&self, key: &str) -> Option<Vec<u8>> {
        let full = self.full_key(key);
        if let Some(v) = self.cache.get(&full) {
            return Some(v.clone());
        }
        match self.db.get(full.as_bytes()) {
            Ok(Some(iv)) => {
                let bytes = iv.to_vec();
                self.cache.insert(full, bytes.clone());
                Some(bytes)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %full, error = %e, "snapshot read failed; treating as no cache");
                None
            }
        }
    }

    fn write_raw(&self, key: &str, bytes: Vec<u8>) -> bool {
        let full = self.full_key(key);
        if let Some(quota) = self.quota.filter(|q| bytes.len() > *q) {
            warn!(key = %full, size = bytes.len(), quota, "snapshot exceeds quota; in-memory state kept");
            return false;
        }
        if let Err(e) = self.db.insert(full.as_bytes(), bytes.as_slice()) {
            warn!(key = %full, error = %e, "snapshot write failed; in-memory state kept");
            return false;
        }
        if let Err(e) = self.db.flush() {
            warn!(key = %full, error = %e, "snapshot flush failed");
        }
        self.cache.insert(full, bytes);
        true
    }

    /// Reads a map snapshot. `CachedFallback` when present, `Empty` when absent or unreadable.
    pub fn load<V: DeserializeOwned>(&self, key: &str) -> Sourced<BTreeMap<String, V>> {
        let Some(bytes) = self.read_raw(key) else {
            return Sourced::Empty;
        };
        match serde_json::from_slice::<BTreeMap<String, V>>(&bytes) {
            Ok(map) => {
                debug!(key, entries = map.len(), "snapshot loaded");
                Sourced::CachedFallback(map)
            }
            Err(e) => {
                warn!(key, error = %e, "corrupt snapshot; falling back to empty map");
                Sourced::Empty
            }
        }
    }

    /// Writes a map snapshot as a flat JSON object. Returns false if the write failed.
    pub fn save<V: Serialize>(&self, key: &str, map: &BTreeMap<String, V>) -> bool {
        match serde_json::to_vec(map) {
            Ok(bytes) => self.write_raw(key, bytes),
            Err(e) => {
                warn!(key, error = %e, "snapshot serialize failed");
                false
            }
        }
    }

    /// Stores raw bytes under a key, bypassing JSON encoding.
    pub fn save_raw(&self, key: &str, bytes: &[u8]) -> bool {
        self.write_raw(key, bytes.to_vec())
    }

    pub fn load_timestamp(&self) -> Option<DateTime<Utc>> {
        let bytes = self.read_raw(LAST_UPDATED_KEY)?;
        let text = String::from_utf8(bytes).ok()?;
        match DateTime::parse_from_rfc3339(text.trim()) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                warn!(error = %e, "unreadable last-updated marker");
                None
            }
        }
    }

    pub fn save_timestamp(&self, ts: DateTime<Utc>) -> bool {
        self.write_raw(LAST_UPDATED_KEY, ts.to_rfc3339().into_bytes())
    }

    /// True when any data map snapshot holds at least one entry.
    pub fn has_entries(&self) -> bool {
        ALL_STORAGE_KEYS
            .iter()
            .filter(|k| **k != LAST_UPDATED_KEY)
            .any(|k| match self.load::<serde_json::Value>(k) {
                Sourced::CachedFallback(map) => !map.is_empty(),
                _ => false,
            })
    }

    /// Removes every key this store owns (user-triggered "clear caches").
    pub fn clear_all(&self) {
        for key in ALL_STORAGE_KEYS {
            let full = self.full_key(key);
            if let Err(e) = self.db.remove(full.as_bytes()) {
                warn!(key = %full, error = %e, "snapshot remove failed");
            }
            self.cache.remove(&full);
        }
        if let Err(e) = self.db.flush() {
            warn!(error = %e, "snapshot flush failed");
        }
    }
}
