//! Persisted tier.
//!
//! The cache manager talks to the remote persisted store through the narrow
//! [`PersistedBackend`] interface (get/set/delete by key+owner, key listing,
//! range delete by expiry). [`PgPersistedBackend`] is the production
//! implementation over Postgres; [`NullBackend`] stands in when a process
//! runs without a persisted tier.
//!
//! Every call on this tier requires an owner: rows are scoped per tenant
//! with a uniqueness constraint on `(owner_id, cache_key)` and writes are
//! upserts keyed on that pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::logging::log_error;
use crate::models::{CacheEntry, CacheType, CachedRow, KeyListing};
use crate::query_builder::{BindValue, CacheQuery};

use super::CacheStore;

/// Table backing the persisted tier.
pub const CACHE_TABLE: &str = "aprova_cache_entries";

/// Failures raised by a persisted backend. These never leave the adapter:
/// [`PersistedStore`] degrades them to a miss or a no-op.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Narrow interface to the persisted key-value store.
#[async_trait]
pub trait PersistedBackend: Send + Sync {
    async fn fetch(&self, owner: &str, key: &str) -> Result<Option<CachedRow>, BackendError>;

    async fn upsert(&self, row: CachedRow) -> Result<(), BackendError>;

    async fn remove(&self, owner: &str, key: &str) -> Result<(), BackendError>;

    async fn list_keys(&self, owner: &str) -> Result<Vec<KeyListing>, BackendError>;

    /// Bulk-delete every row whose expiry lies at or before the cutoff,
    /// across all owners. Returns the number of rows removed.
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, BackendError>;
}

/// Backend for processes that run without a persisted tier: every read is
/// a miss and every write a no-op.
#[derive(Debug, Default)]
pub struct NullBackend;

#[async_trait]
impl PersistedBackend for NullBackend {
    async fn fetch(&self, _owner: &str, _key: &str) -> Result<Option<CachedRow>, BackendError> {
        Ok(None)
    }

    async fn upsert(&self, _row: CachedRow) -> Result<(), BackendError> {
        Ok(())
    }

    async fn remove(&self, _owner: &str, _key: &str) -> Result<(), BackendError> {
        Ok(())
    }

    async fn list_keys(&self, _owner: &str) -> Result<Vec<KeyListing>, BackendError> {
        Ok(Vec::new())
    }

    async fn delete_expired_before(&self, _cutoff: DateTime<Utc>) -> Result<u64, BackendError> {
        Ok(0)
    }
}

/// Postgres implementation of the persisted backend.
pub struct PgPersistedBackend {
    pool: PgPool,
}

impl PgPersistedBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the cache table and its expiry index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS aprova_cache_entries (
                owner_id VARCHAR NOT NULL,
                cache_key VARCHAR NOT NULL,
                cache_data JSONB NOT NULL,
                related_keys TEXT[],
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (owner_id, cache_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_aprova_cache_expires_at \
             ON aprova_cache_entries (expires_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Single execution function for typed SELECT expressions.
    async fn fetch_rows(&self, query: &CacheQuery) -> Result<Vec<PgRow>, BackendError> {
        let sql = query.to_sql();
        let values = query.bind_values();
        let mut prepared = sqlx::query(&sql);
        for value in &values {
            prepared = bind_value(prepared, value);
        }
        Ok(prepared.fetch_all(&self.pool).await?)
    }

    /// Single execution function for typed DELETE expressions.
    async fn execute_query(&self, query: &CacheQuery) -> Result<u64, BackendError> {
        let sql = query.to_sql();
        let values = query.bind_values();
        let mut prepared = sqlx::query(&sql);
        for value in &values {
            prepared = bind_value(prepared, value);
        }
        Ok(prepared.execute(&self.pool).await?.rows_affected())
    }
}

/// Attach one typed bind value to a prepared query.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q BindValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        BindValue::Text(s) => query.bind(s),
        BindValue::Json(j) => query.bind(j),
        BindValue::Timestamp(t) => query.bind(t),
        BindValue::BigInt(i) => query.bind(i),
        BindValue::TextArray(a) => query.bind(a),
    }
}

#[async_trait]
impl PersistedBackend for PgPersistedBackend {
    async fn fetch(&self, owner: &str, key: &str) -> Result<Option<CachedRow>, BackendError> {
        let query = CacheQuery::select(CACHE_TABLE)
            .where_eq("owner_id", BindValue::Text(owner.to_string()))
            .where_eq("cache_key", BindValue::Text(key.to_string()));

        let rows = self.fetch_rows(&query).await?;
        match rows.first() {
            Some(row) => Ok(Some(CachedRow::from_row(row).map_err(BackendError::from)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, row: CachedRow) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO aprova_cache_entries (
                owner_id, cache_key, cache_data, related_keys,
                expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (owner_id, cache_key) DO UPDATE SET
                cache_data = EXCLUDED.cache_data,
                related_keys = EXCLUDED.related_keys,
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&row.owner_id)
        .bind(&row.cache_key)
        .bind(&row.cache_data)
        .bind(&row.related_keys)
        .bind(row.expires_at)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, owner: &str, key: &str) -> Result<(), BackendError> {
        let query = CacheQuery::delete(CACHE_TABLE)
            .where_eq("owner_id", BindValue::Text(owner.to_string()))
            .where_eq("cache_key", BindValue::Text(key.to_string()));

        self.execute_query(&query).await?;
        Ok(())
    }

    async fn list_keys(&self, owner: &str) -> Result<Vec<KeyListing>, BackendError> {
        let query = CacheQuery::select(CACHE_TABLE)
            .fields(&["cache_key", "expires_at"])
            .where_eq("owner_id", BindValue::Text(owner.to_string()))
            .order_asc("cache_key");

        let rows = self.fetch_rows(&query).await?;
        let mut listings = Vec::with_capacity(rows.len());
        for row in &rows {
            listings.push(KeyListing {
                key: row.try_get("cache_key").map_err(BackendError::from)?,
                expires_at: row.try_get("expires_at").map_err(BackendError::from)?,
            });
        }
        Ok(listings)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, BackendError> {
        let query =
            CacheQuery::delete(CACHE_TABLE).where_lte("expires_at", BindValue::Timestamp(cutoff));
        self.execute_query(&query).await
    }
}

/// Adapter wrapping a [`PersistedBackend`] with the tier's fail-soft
/// contract: backend failures and missing owners degrade to a miss or a
/// no-op, logged but never propagated.
pub struct PersistedStore {
    backend: Arc<dyn PersistedBackend>,
}

impl PersistedStore {
    pub fn new(backend: Arc<dyn PersistedBackend>) -> Self {
        Self { backend }
    }

    /// Bulk-delete expired rows across all owners.
    pub async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> u64 {
        match self.backend.delete_expired_before(cutoff).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Persisted cleanup failed; skipping this sweep");
                0
            }
        }
    }

    fn require_owner<'a>(&self, owner: Option<&'a str>, operation: &str) -> Option<&'a str> {
        if owner.is_none() {
            warn!(
                cache_type = %self.tier(),
                operation = %operation,
                "Persisted tier called without an owner; treating as miss"
            );
        }
        owner
    }
}

#[async_trait]
impl CacheStore for PersistedStore {
    fn tier(&self) -> CacheType {
        CacheType::Persisted
    }

    async fn get(&self, key: &str, owner: Option<&str>) -> Option<CacheEntry> {
        let owner = self.require_owner(owner, "get")?;
        match self.backend.fetch(owner, key).await {
            Ok(row) => row.map(CachedRow::into_entry),
            Err(e) => {
                log_error(
                    "persisted_store",
                    "fetch",
                    &e.to_string(),
                    Some(&format!("treating key `{key}` as a miss")),
                );
                None
            }
        }
    }

    async fn set(&self, entry: CacheEntry) {
        let Some(owner) = entry.owner_id.clone() else {
            warn!(key = %entry.key, "Persisted write without an owner; dropping");
            return;
        };

        let row = CachedRow {
            owner_id: owner,
            cache_key: entry.key.clone(),
            cache_data: entry.data,
            related_keys: if entry.related_keys.is_empty() {
                None
            } else {
                Some(entry.related_keys)
            },
            expires_at: entry.expires_at,
            created_at: entry.created_at,
            updated_at: Utc::now(),
        };

        if let Err(e) = self.backend.upsert(row).await {
            warn!(key = %entry.key, error = %e, "Persisted write failed; dropping");
        }
    }

    async fn delete(&self, key: &str, owner: Option<&str>) {
        let Some(owner) = self.require_owner(owner, "delete") else {
            return;
        };
        if let Err(e) = self.backend.remove(owner, key).await {
            warn!(key = %key, error = %e, "Persisted delete failed; skipping");
        }
    }

    async fn list_keys(&self, owner: Option<&str>) -> Vec<KeyListing> {
        let Some(owner) = self.require_owner(owner, "list_keys") else {
            return Vec::new();
        };
        match self.backend.list_keys(owner).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(error = %e, "Persisted key listing failed; returning empty");
                Vec::new()
            }
        }
    }
}
