//! # Entry Store Adapters
//!
//! One adapter per cache tier, each providing raw get/set/delete/list-keys
//! for its own storage. Adapters never know about the key-relationship
//! index; TTL policy is applied above them by the cache manager.
//!
//! ## Failure Semantics
//!
//! Adapter I/O failures (persisted store unreachable, storage quota
//! exceeded) are caught at the adapter boundary and surfaced as a cache
//! miss on read and a silent no-op on write - always logged, never thrown.
//! Cache operations must never fail a calling request; they degrade to
//! "act as if nothing was cached".

pub mod memory;
pub mod persisted;
pub mod web_storage;

use async_trait::async_trait;

use crate::models::{CacheEntry, CacheType, KeyListing};

pub use memory::MemoryStore;
pub use persisted::{BackendError, NullBackend, PersistedBackend, PersistedStore, PgPersistedBackend, CACHE_TABLE};
pub use web_storage::WebStorageStore;

/// Raw storage operations for a single cache tier.
///
/// `owner` is ignored by the in-process tiers and required by the persisted
/// tier (multi-tenant row scoping). `list_keys` is finite and restartable:
/// each call re-enumerates from scratch, carrying expiry alongside each key
/// so callers can skip or flag expired entries without a second fetch.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The tier this adapter serves.
    fn tier(&self) -> CacheType;

    /// Fetch the raw entry for a key, expired or not. Expiry policy is the
    /// manager's concern.
    async fn get(&self, key: &str, owner: Option<&str>) -> Option<CacheEntry>;

    /// Write an entry, overwriting any previous value for its key.
    async fn set(&self, entry: CacheEntry);

    /// Remove a key. Removing an absent key is a no-op.
    async fn delete(&self, key: &str, owner: Option<&str>);

    /// Enumerate keys with their expiry timestamps.
    async fn list_keys(&self, owner: Option<&str>) -> Vec<KeyListing>;

    /// Estimated size of the stored entry in bytes. The default
    /// serializes the payload and measures it; tiers that store
    /// pre-serialized text measure the stored string directly.
    async fn entry_size(&self, key: &str, owner: Option<&str>) -> Option<usize> {
        self.get(key, owner).await.map(|e| e.size_estimate())
    }
}
