//! # Cache Entry Model
//!
//! The unit of storage for every cache tier, plus the tier enum and the
//! derived metadata shapes handed to the presentation layer.
//!
//! ## Expiration Semantics
//!
//! `expires_at` is fixed at write time and never extended by reads (no
//! sliding expiration). An entry with `expires_at <= now` is logically
//! absent: every read path treats it as a miss and deletes it lazily on the
//! next access.
//!
//! ## Database Schema
//!
//! The persisted tier maps to the `aprova_cache_entries` table:
//! ```sql
//! CREATE TABLE aprova_cache_entries (
//!   owner_id VARCHAR NOT NULL,
//!   cache_key VARCHAR NOT NULL,
//!   cache_data JSONB NOT NULL,
//!   related_keys TEXT[],
//!   expires_at TIMESTAMPTZ NOT NULL,
//!   created_at TIMESTAMPTZ NOT NULL,
//!   updated_at TIMESTAMPTZ NOT NULL,
//!   PRIMARY KEY (owner_id, cache_key)
//! );
//! ```
//! Writes are upserts keyed on `(owner_id, cache_key)`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// The storage tier an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// In-process memory map.
    Memory,
    /// Local-storage-style string store (survives the session).
    LocalStorage,
    /// Session-storage-style string store (cleared per session).
    SessionStorage,
    /// Remote persisted table, scoped per owner.
    Persisted,
}

impl CacheType {
    /// Every tier, in statistics/reporting order.
    pub const ALL: [CacheType; 4] = [
        CacheType::Memory,
        CacheType::LocalStorage,
        CacheType::SessionStorage,
        CacheType::Persisted,
    ];

    /// Fixed probe order used when a lookup does not name a tier. The
    /// persisted tier is intentionally absent: it requires an owner and a
    /// network round-trip, and a type-less probe must stay cheap.
    pub const PROBE_PRECEDENCE: [CacheType; 3] = [
        CacheType::Memory,
        CacheType::LocalStorage,
        CacheType::SessionStorage,
    ];

    /// Whether every call against this tier must carry an owner id.
    pub fn requires_owner(&self) -> bool {
        matches!(self, Self::Persisted)
    }

    /// Whether this tier stores pre-serialized text, in which case size
    /// estimates are measured directly from stored string length.
    pub fn stores_serialized_text(&self) -> bool {
        matches!(self, Self::LocalStorage | Self::SessionStorage)
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::LocalStorage => write!(f, "local_storage"),
            Self::SessionStorage => write!(f, "session_storage"),
            Self::Persisted => write!(f, "persisted"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "local_storage" => Ok(Self::LocalStorage),
            "session_storage" => Ok(Self::SessionStorage),
            "persisted" => Ok(Self::Persisted),
            _ => Err(format!("Invalid cache type: {s}")),
        }
    }
}

/// The unit of storage. `key` is unique within a `(cache_type, owner)`
/// scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub cache_type: CacheType,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub owner_id: Option<String>,
    pub related_keys: Vec<String>,
}

impl CacheEntry {
    /// Build an entry expiring `ttl_minutes` from now.
    pub fn new(
        key: impl Into<String>,
        cache_type: CacheType,
        data: serde_json::Value,
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            cache_type,
            data,
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes.max(1)),
            owner_id: None,
            related_keys: Vec::new(),
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_related_keys(mut self, related_keys: Vec<String>) -> Self {
        self.related_keys = related_keys;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Serialize-and-measure size estimate of the payload, in bytes.
    pub fn size_estimate(&self) -> usize {
        serde_json::to_string(&self.data)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Derive the presentation metadata for this entry.
    pub fn metadata(&self, size_bytes: usize) -> CacheEntryMetadata {
        CacheEntryMetadata {
            key: self.key.clone(),
            cache_type: self.cache_type,
            created_at: self.created_at,
            expires_at: self.expires_at,
            expired: self.is_expired(),
            size_bytes,
            related_keys: self.related_keys.clone(),
        }
    }
}

/// A key with its expiry, as enumerated by an adapter's `list_keys`. The
/// expiry rides along so callers can flag or skip expired entries without a
/// second fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyListing {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

impl KeyListing {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Entry metadata resolved by the inspector: timestamps, expiry status,
/// size estimate, and the related-key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryMetadata {
    pub key: String,
    pub cache_type: CacheType,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    pub size_bytes: usize,
    pub related_keys: Vec<String>,
}

/// Full entry listing row, optionally carrying the raw payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub cache_type: CacheType,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    pub size_bytes: usize,
    pub related_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Row model for the persisted tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CachedRow {
    pub owner_id: String,
    pub cache_key: String,
    pub cache_data: serde_json::Value,
    pub related_keys: Option<Vec<String>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CachedRow {
    /// Convert a persisted row into the common entry shape.
    pub fn into_entry(self) -> CacheEntry {
        CacheEntry {
            key: self.cache_key,
            cache_type: CacheType::Persisted,
            data: self.cache_data,
            created_at: self.created_at,
            expires_at: self.expires_at,
            owner_id: Some(self.owner_id),
            related_keys: self.related_keys.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_type_round_trips_through_strings() {
        for cache_type in CacheType::ALL {
            let rendered = cache_type.to_string();
            let parsed: CacheType = rendered.parse().unwrap();
            assert_eq!(parsed, cache_type);
        }
        assert!("disk".parse::<CacheType>().is_err());
    }

    #[test]
    fn probe_precedence_never_includes_persisted() {
        assert!(!CacheType::PROBE_PRECEDENCE.contains(&CacheType::Persisted));
        assert_eq!(CacheType::PROBE_PRECEDENCE[0], CacheType::Memory);
    }

    #[test]
    fn new_entry_expires_after_creation() {
        let entry = CacheEntry::new("k", CacheType::Memory, json!({"a": 1}), 15);
        assert!(entry.expires_at > entry.created_at);
        assert!(!entry.is_expired());
    }

    #[test]
    fn entry_expired_in_the_past_reads_as_expired() {
        let mut entry = CacheEntry::new("k", CacheType::Memory, json!(1), 15);
        entry.expires_at = Utc::now() - Duration::minutes(1);
        assert!(entry.is_expired());
    }

    #[test]
    fn size_estimate_measures_serialized_payload() {
        let entry = CacheEntry::new("k", CacheType::Memory, json!({"total": 3}), 15);
        assert_eq!(entry.size_estimate(), r#"{"total":3}"#.len());
    }

    #[test]
    fn persisted_row_converts_to_entry() {
        let now = Utc::now();
        let row = CachedRow {
            owner_id: "u1".to_string(),
            cache_key: "performance_u1_simulados".to_string(),
            cache_data: json!({"total": 3}),
            related_keys: Some(vec!["discipline_stats_u1_7".to_string()]),
            expires_at: now + Duration::minutes(15),
            created_at: now,
            updated_at: now,
        };

        let entry = row.into_entry();
        assert_eq!(entry.cache_type, CacheType::Persisted);
        assert_eq!(entry.owner_id.as_deref(), Some("u1"));
        assert_eq!(entry.related_keys.len(), 1);
    }
}
