//! Shared fixtures for the integration suite: an in-memory persisted
//! backend with call counting, a counting stats source, and manager
//! construction helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aprova_cache::config::CacheConfig;
use aprova_cache::domain::StatsSource;
use aprova_cache::error::{CacheError, Result};
use aprova_cache::manager::CacheManager;
use aprova_cache::models::{CachedRow, KeyListing};
use aprova_cache::store::{BackendError, PersistedBackend};

/// Persisted backend over a plain map, scoped by `(owner, key)` like the
/// real table. Counts row fetches so tests can assert how many entries
/// actually paid a data resolution.
#[derive(Default)]
pub struct InMemoryBackend {
    rows: RwLock<HashMap<(String, String), CachedRow>>,
    fetch_calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    /// Seed a row directly, bypassing the manager - the way another
    /// process or an earlier deploy would have left data behind.
    pub fn seed_row(
        &self,
        owner: &str,
        key: &str,
        data: Value,
        expires_at: DateTime<Utc>,
        related_keys: Option<Vec<String>>,
    ) {
        let now = Utc::now();
        self.rows.write().insert(
            (owner.to_string(), key.to_string()),
            CachedRow {
                owner_id: owner.to_string(),
                cache_key: key.to_string(),
                cache_data: data,
                related_keys,
                expires_at,
                created_at: now - Duration::minutes(20),
                updated_at: now,
            },
        );
    }
}

#[async_trait]
impl PersistedBackend for InMemoryBackend {
    async fn fetch(
        &self,
        owner: &str,
        key: &str,
    ) -> std::result::Result<Option<CachedRow>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .read()
            .get(&(owner.to_string(), key.to_string()))
            .cloned())
    }

    async fn upsert(&self, row: CachedRow) -> std::result::Result<(), BackendError> {
        self.rows
            .write()
            .insert((row.owner_id.clone(), row.cache_key.clone()), row);
        Ok(())
    }

    async fn remove(&self, owner: &str, key: &str) -> std::result::Result<(), BackendError> {
        self.rows
            .write()
            .remove(&(owner.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, owner: &str) -> std::result::Result<Vec<KeyListing>, BackendError> {
        let mut listings: Vec<KeyListing> = self
            .rows
            .read()
            .values()
            .filter(|row| row.owner_id == owner)
            .map(|row| KeyListing {
                key: row.cache_key.clone(),
                expires_at: row.expires_at,
            })
            .collect();
        listings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listings)
    }

    async fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> std::result::Result<u64, BackendError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, row| row.expires_at > cutoff);
        Ok((before - rows.len()) as u64)
    }
}

/// Stats source that returns fixed shapes and counts its invocations, so
/// tests can tell a cache hit from a recompute.
#[derive(Default)]
pub struct CountingSource {
    performance_calls: AtomicUsize,
    discipline_calls: AtomicUsize,
    activity_calls: AtomicUsize,
    fail: bool,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn performance_calls(&self) -> usize {
        self.performance_calls.load(Ordering::SeqCst)
    }

    pub fn discipline_calls(&self) -> usize {
        self.discipline_calls.load(Ordering::SeqCst)
    }

    pub fn activity_calls(&self) -> usize {
        self.activity_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for CountingSource {
    async fn performance_stats(
        &self,
        _owner: &str,
        _kind: &str,
        _period: Option<&str>,
    ) -> Result<Value> {
        if self.fail {
            return Err(CacheError::DataSource(
                "relational store offline".to_string(),
            ));
        }
        self.performance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"total": 3}))
    }

    async fn discipline_stats(&self, _owner: &str, discipline_id: &str) -> Result<Value> {
        if self.fail {
            return Err(CacheError::DataSource(
                "relational store offline".to_string(),
            ));
        }
        self.discipline_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"discipline": discipline_id, "accuracy": 0.72}))
    }

    async fn recent_activity(&self, _owner: &str, limit: usize) -> Result<Value> {
        if self.fail {
            return Err(CacheError::DataSource(
                "relational store offline".to_string(),
            ));
        }
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"sessions": [], "limit": limit}))
    }
}

/// Manager over in-process tiers only.
pub fn manager() -> Arc<CacheManager> {
    Arc::new(CacheManager::without_persistence(CacheConfig::for_test()))
}

/// Manager wired to a fresh in-memory persisted backend.
pub fn manager_with_backend() -> (Arc<CacheManager>, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let manager = Arc::new(CacheManager::new(CacheConfig::for_test(), backend.clone()));
    (manager, backend)
}
