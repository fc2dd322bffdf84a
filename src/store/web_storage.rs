//! Local/session storage tiers.
//!
//! These tiers mirror browser `localStorage`/`sessionStorage` behavior:
//! entries are kept as pre-serialized JSON text under a byte quota, and a
//! write that would blow the quota is dropped rather than failing the
//! caller. Size estimates come straight from stored string length.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::models::{CacheEntry, CacheType, KeyListing};

use super::CacheStore;

/// What actually sits in storage under each key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    data: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    related_keys: Vec<String>,
}

/// String-store tier with a byte quota. Two instances serve the
/// local-storage and session-storage tiers.
#[derive(Debug)]
pub struct WebStorageStore {
    tier: CacheType,
    quota_bytes: usize,
    entries: RwLock<HashMap<String, String>>,
}

impl WebStorageStore {
    /// Build a store for one of the web-storage tiers.
    pub fn new(tier: CacheType, quota_bytes: usize) -> Self {
        debug_assert!(tier.stores_serialized_text());
        Self {
            tier,
            quota_bytes,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.entries.read().values().map(|v| v.len()).sum()
    }

    /// Length of the stored text for a key.
    pub fn stored_len(&self, key: &str) -> Option<usize> {
        self.entries.read().get(key).map(|v| v.len())
    }

    /// Remove every expired entry, returning the removed keys.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut entries = self.entries.write();
        let expired: Vec<String> = entries
            .iter()
            .filter_map(|(k, raw)| {
                match serde_json::from_str::<StoredRecord>(raw) {
                    Ok(record) if record.expires_at <= now => Some(k.clone()),
                    Ok(_) => None,
                    // Unreadable text is as good as expired.
                    Err(_) => Some(k.clone()),
                }
            })
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        expired
    }

    fn decode(&self, key: &str, raw: &str) -> Option<CacheEntry> {
        match serde_json::from_str::<StoredRecord>(raw) {
            Ok(record) => Some(CacheEntry {
                key: key.to_string(),
                cache_type: self.tier,
                data: record.data,
                created_at: record.created_at,
                expires_at: record.expires_at,
                owner_id: None,
                related_keys: record.related_keys,
            }),
            Err(e) => {
                warn!(
                    cache_type = %self.tier,
                    key = %key,
                    error = %e,
                    "Discarding unreadable web-storage record"
                );
                None
            }
        }
    }
}

#[async_trait]
impl CacheStore for WebStorageStore {
    fn tier(&self) -> CacheType {
        self.tier
    }

    async fn get(&self, key: &str, _owner: Option<&str>) -> Option<CacheEntry> {
        let raw = self.entries.read().get(key).cloned()?;
        let decoded = self.decode(key, &raw);
        if decoded.is_none() {
            self.entries.write().remove(key);
        }
        decoded
    }

    async fn set(&self, entry: CacheEntry) {
        let record = StoredRecord {
            data: entry.data,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            related_keys: entry.related_keys,
        };

        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(cache_type = %self.tier, key = %entry.key, error = %e, "Failed to serialize entry; dropping write");
                return;
            }
        };

        let mut entries = self.entries.write();
        let replaced_len = entries.get(&entry.key).map(|v| v.len()).unwrap_or(0);
        let used: usize = entries.values().map(|v| v.len()).sum();
        if used - replaced_len + raw.len() > self.quota_bytes {
            warn!(
                cache_type = %self.tier,
                key = %entry.key,
                quota_bytes = self.quota_bytes,
                "Storage quota exceeded; dropping write"
            );
            return;
        }

        entries.insert(entry.key, raw);
    }

    async fn delete(&self, key: &str, _owner: Option<&str>) {
        self.entries.write().remove(key);
    }

    async fn list_keys(&self, _owner: Option<&str>) -> Vec<KeyListing> {
        let entries = self.entries.read();
        entries
            .iter()
            .filter_map(|(key, raw)| {
                serde_json::from_str::<StoredRecord>(raw)
                    .ok()
                    .map(|record| KeyListing {
                        key: key.clone(),
                        expires_at: record.expires_at,
                    })
            })
            .collect()
    }

    async fn entry_size(&self, key: &str, _owner: Option<&str>) -> Option<usize> {
        self.stored_len(key)
    }
}
