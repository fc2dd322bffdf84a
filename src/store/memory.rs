//! In-process memory tier.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{CacheEntry, CacheType, KeyListing};

use super::CacheStore;

/// Process-local map tier. Entries live until deleted or swept; reads hand
/// back the raw entry and leave expiry policy to the manager.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry, returning the removed keys.
    pub fn sweep_expired(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<String> {
        let mut entries = self.entries.write();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn tier(&self) -> CacheType {
        CacheType::Memory
    }

    async fn get(&self, key: &str, _owner: Option<&str>) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    async fn set(&self, entry: CacheEntry) {
        self.entries.write().insert(entry.key.clone(), entry);
    }

    async fn delete(&self, key: &str, _owner: Option<&str>) {
        self.entries.write().remove(key);
    }

    async fn list_keys(&self, _owner: Option<&str>) -> Vec<KeyListing> {
        self.entries
            .read()
            .values()
            .map(|e| KeyListing {
                key: e.key.clone(),
                expires_at: e.expires_at,
            })
            .collect()
    }
}
