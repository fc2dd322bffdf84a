//! # Unified Cache Manager
//!
//! The façade over the four cache tiers. Dispatches operations to the
//! matching store adapter, applies the TTL expiration policy, and maintains
//! the in-memory key-relationship index independent of where the underlying
//! data lives.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheManager                          │
//! │  ┌─────────┐ ┌─────────────┐ ┌───────────────┐ ┌─────────┐  │
//! │  │ Memory  │ │ LocalStorage│ │ SessionStorage│ │Persisted│  │
//! │  │ (map)   │ │ (text+quota)│ │ (text+quota)  │ │ (sqlx)  │  │
//! │  └─────────┘ └─────────────┘ └───────────────┘ └─────────┘  │
//! │           KeyRelationshipIndex (in-memory only)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manager is a plain dependency-injected service object: construct it
//! once at process startup and hand out `Arc` handles. There is no hidden
//! global instance.
//!
//! ## TTL Policy
//!
//! `expires_at` is fixed at write time and never extended by reads. An
//! expired entry is treated as a miss by every read path and deleted lazily
//! on the access that discovers it; `cleanup_expired` sweeps the remainder
//! on the configured interval.

pub mod relationship;

use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::logging::log_cache_operation;
use crate::models::{CacheEntry, CacheType};
use crate::store::{
    CacheStore, MemoryStore, NullBackend, PersistedBackend, PersistedStore, WebStorageStore,
};

pub use relationship::KeyRelationshipIndex;

/// Per-call options for cache operations.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Target tier. When absent, reads probe memory, then local storage,
    /// then session storage - never the persisted tier. Writes without a
    /// tier land in memory.
    pub cache_type: Option<CacheType>,
    /// Tenant scope; required for any persisted-tier access.
    pub owner: Option<String>,
    /// Per-call TTL override in minutes.
    pub ttl_minutes: Option<i64>,
    /// Keys this write relates to, tracked bidirectionally in the
    /// relationship index.
    pub related_keys: Vec<String>,
}

impl CacheOptions {
    /// Options pinned to one tier.
    pub fn tier(cache_type: CacheType) -> Self {
        Self {
            cache_type: Some(cache_type),
            ..Self::default()
        }
    }

    /// Type-less options: reads probe the in-process tiers in precedence
    /// order.
    pub fn probe() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_ttl_minutes(mut self, ttl_minutes: i64) -> Self {
        self.ttl_minutes = Some(ttl_minutes);
        self
    }

    pub fn with_related_keys(mut self, related_keys: Vec<String>) -> Self {
        self.related_keys = related_keys;
        self
    }

    pub(crate) fn owner_ref(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// The unified cache façade. See the module docs for the architecture.
pub struct CacheManager {
    config: CacheConfig,
    memory: MemoryStore,
    local_storage: WebStorageStore,
    session_storage: WebStorageStore,
    persisted: PersistedStore,
    relationships: KeyRelationshipIndex,
}

impl CacheManager {
    /// Build a manager over the given persisted backend.
    pub fn new(config: CacheConfig, backend: Arc<dyn PersistedBackend>) -> Self {
        let quota = config.web_storage_quota_bytes;
        Self {
            config,
            memory: MemoryStore::new(),
            local_storage: WebStorageStore::new(CacheType::LocalStorage, quota),
            session_storage: WebStorageStore::new(CacheType::SessionStorage, quota),
            persisted: PersistedStore::new(backend),
            relationships: KeyRelationshipIndex::new(),
        }
    }

    /// Build a manager with no persisted tier (every persisted read is a
    /// miss). Used by processes that only need the in-process tiers.
    pub fn without_persistence(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(NullBackend))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Typed seam for the inspector: adapter handle for one tier.
    pub(crate) fn store_for(&self, cache_type: CacheType) -> &dyn CacheStore {
        match cache_type {
            CacheType::Memory => &self.memory,
            CacheType::LocalStorage => &self.local_storage,
            CacheType::SessionStorage => &self.session_storage,
            CacheType::Persisted => &self.persisted,
        }
    }

    /// Typed seam for the inspector: read access to the relationship index.
    pub(crate) fn relationships(&self) -> &KeyRelationshipIndex {
        &self.relationships
    }

    /// Look up a key and return its payload, or `None` on miss. A hit on
    /// an expired entry deletes it lazily and reads as a miss.
    pub async fn get(&self, key: &str, options: &CacheOptions) -> Option<serde_json::Value> {
        if !self.config.enabled {
            return None;
        }

        let owner = options.owner_ref();
        for cache_type in self.read_tiers(options) {
            let store = self.store_for(cache_type);
            let Some(entry) = store.get(key, owner).await else {
                continue;
            };

            if entry.is_expired() {
                debug!(key = %key, cache_type = %cache_type, "Lazy-deleting expired entry");
                store.delete(key, owner).await;
                self.relationships.remove(key);
                continue;
            }

            return Some(entry.data);
        }

        None
    }

    /// `get` plus deserialization into a concrete type. A payload that no
    /// longer matches the expected shape reads as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        let value = self.get(key, options).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload shape mismatch; treating as miss");
                None
            }
        }
    }

    /// Write a payload to the requested tier (memory when unspecified) and
    /// record any related keys in the relationship index.
    pub async fn set(&self, key: &str, data: serde_json::Value, options: &CacheOptions) {
        if !self.config.enabled {
            return;
        }

        let cache_type = options.cache_type.unwrap_or(CacheType::Memory);
        let ttl_minutes = options
            .ttl_minutes
            .unwrap_or(self.config.default_ttl_minutes);

        let mut entry = CacheEntry::new(key, cache_type, data, ttl_minutes)
            .with_related_keys(options.related_keys.clone());
        if let Some(owner) = options.owner_ref() {
            entry = entry.with_owner(owner);
        }

        self.store_for(cache_type).set(entry).await;

        if !options.related_keys.is_empty() {
            self.relationships.record(key, &options.related_keys);
        }

        debug!(key = %key, cache_type = %cache_type, ttl_minutes, "Cache set");
    }

    /// Remove a key from its tier(s) and from the relationship index. Does
    /// not cascade to related keys; cascading invalidation is the
    /// administration component's policy decision.
    pub async fn delete(&self, key: &str, options: &CacheOptions) {
        self.delete_from_stores(key, options).await;
        self.relationships.remove(key);
    }

    /// Recursively discover keys related to `key` (bounded by the same
    /// depth/node limits as graph traversal, so cyclic relationship graphs
    /// terminate) and delete every one. Returns the full invalidated set
    /// for audit and reporting, discovery order first.
    pub async fn invalidate_with_related(&self, key: &str, options: &CacheOptions) -> Vec<String> {
        let max_depth = self.config.max_graph_depth;
        let max_nodes = self.config.max_graph_nodes;

        let mut visited: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut discovered: Vec<String> = Vec::new();
        let mut queue: std::collections::VecDeque<(String, usize)> =
            std::collections::VecDeque::new();

        visited.insert(key.to_string());
        discovered.push(key.to_string());
        queue.push_back((key.to_string(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for related in self.relationships.related_of(&current) {
                if visited.len() >= max_nodes {
                    break;
                }
                if visited.insert(related.clone()) {
                    discovered.push(related.clone());
                    queue.push_back((related, depth + 1));
                }
            }
        }

        for key in &discovered {
            self.delete_from_stores(key, options).await;
            self.relationships.remove(key);
        }

        log_cache_operation(
            "invalidate_with_related",
            options.cache_type.map(|t| t.to_string()).as_deref(),
            Some(key),
            "executed",
            Some(&format!("{} keys invalidated", discovered.len())),
        );

        discovered
    }

    /// Sweep expired entries from every tier: in-process maps are walked
    /// directly, the persisted tier gets one bulk range delete. Returns the
    /// number of entries removed.
    pub async fn cleanup_expired(&self) -> u64 {
        let now = Utc::now();
        let mut removed: u64 = 0;

        for key in self.memory.sweep_expired(now) {
            self.relationships.remove(&key);
            removed += 1;
        }
        for key in self.local_storage.sweep_expired(now) {
            self.relationships.remove(&key);
            removed += 1;
        }
        for key in self.session_storage.sweep_expired(now) {
            self.relationships.remove(&key);
            removed += 1;
        }

        removed += self.persisted.delete_expired_before(now).await;

        log_cache_operation(
            "cleanup_expired",
            None,
            None,
            "executed",
            Some(&format!("{removed} entries removed")),
        );
        removed
    }

    /// Write an entry preserving its original timestamps, registering its
    /// related keys. Used by import, which must not re-stamp TTLs.
    pub(crate) async fn restore_entry(&self, entry: CacheEntry) {
        if !self.config.enabled {
            return;
        }

        let related = entry.related_keys.clone();
        let key = entry.key.clone();
        self.store_for(entry.cache_type).set(entry).await;
        if !related.is_empty() {
            self.relationships.record(&key, &related);
        }
    }

    /// Probe for a raw entry (expired or not) without side effects, in the
    /// same precedence order as `get`, extended to the persisted tier when
    /// an owner is available. Used for graph node-type inference.
    pub(crate) async fn probe_entry(&self, key: &str, owner: Option<&str>) -> Option<CacheEntry> {
        for cache_type in CacheType::PROBE_PRECEDENCE {
            if let Some(entry) = self.store_for(cache_type).get(key, owner).await {
                return Some(entry);
            }
        }
        if owner.is_some() {
            if let Some(entry) = self.persisted.get(key, owner).await {
                return Some(entry);
            }
        }
        None
    }

    /// Tiers a read should consult for the given options.
    fn read_tiers(&self, options: &CacheOptions) -> Vec<CacheType> {
        match options.cache_type {
            Some(cache_type) => vec![cache_type],
            None => CacheType::PROBE_PRECEDENCE.to_vec(),
        }
    }

    /// Delete from the explicitly-requested tier, or - for type-less
    /// options - from every tier the options can reach, since related keys
    /// may live in different tiers.
    async fn delete_from_stores(&self, key: &str, options: &CacheOptions) {
        let owner = options.owner_ref();
        match options.cache_type {
            Some(cache_type) => {
                self.store_for(cache_type).delete(key, owner).await;
            }
            None => {
                for cache_type in CacheType::PROBE_PRECEDENCE {
                    self.store_for(cache_type).delete(key, owner).await;
                }
                if owner.is_some() {
                    self.persisted.delete(key, owner).await;
                }
            }
        }
    }
}

/// Spawn the periodic expired-entry sweep on the manager's configured
/// interval. Returns the task handle so the embedding process can abort it
/// on shutdown.
pub fn spawn_cleanup_task(manager: Arc<CacheManager>) -> tokio::task::JoinHandle<()> {
    let interval = manager.config().cleanup_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so sweeps start one
        // full interval after spawn.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            manager.cleanup_expired().await;
        }
    })
}
