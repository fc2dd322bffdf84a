//! Export/import bundle format.
//!
//! Entries travel in a versioned envelope:
//!
//! ```json
//! { "version": "1.0", "exportDate": "2024-06-01T12:00:00Z",
//!   "entries": [ { "key", "cacheType", "data", "createdAt", "expiresAt",
//!                  "relatedKeys" }, ... ] }
//! ```
//!
//! Import consumes exactly this shape and validates the envelope before
//! any write occurs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::EXPORT_BUNDLE_VERSION;
use crate::error::{CacheError, Result};
use crate::models::{CacheEntry, CacheType};

/// One entry inside an export bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedEntry {
    pub key: String,
    pub cache_type: CacheType,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub related_keys: Vec<String>,
}

impl ExportedEntry {
    /// Rebuild a cache entry preserving the exported timestamps.
    pub fn into_entry(self, owner: Option<&str>) -> CacheEntry {
        CacheEntry {
            key: self.key,
            cache_type: self.cache_type,
            data: self.data,
            created_at: self.created_at,
            expires_at: self.expires_at,
            owner_id: owner.map(str::to_string),
            related_keys: self.related_keys,
        }
    }
}

/// Versioned export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub entries: Vec<ExportedEntry>,
}

impl ExportBundle {
    /// Wrap entries in a fresh envelope.
    pub fn new(entries: Vec<ExportedEntry>) -> Self {
        Self {
            version: EXPORT_BUNDLE_VERSION.to_string(),
            export_date: Utc::now(),
            entries,
        }
    }

    /// Parse an untrusted JSON value into a bundle, failing fast with
    /// field-level validation errors before anything touches storage.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CacheError::validation("bundle", "expected a JSON object"))?;

        let version = object
            .get("version")
            .ok_or_else(|| CacheError::validation("version", "field is missing"))?
            .as_str()
            .ok_or_else(|| CacheError::validation("version", "must be a string"))?;
        if version != EXPORT_BUNDLE_VERSION {
            return Err(CacheError::validation(
                "version",
                format!("unsupported bundle version `{version}`"),
            ));
        }

        let entries = object
            .get("entries")
            .ok_or_else(|| CacheError::validation("entries", "field is missing"))?;
        if !entries.is_array() {
            return Err(CacheError::validation("entries", "must be an array"));
        }

        serde_json::from_value(value.clone()).map_err(|e| {
            CacheError::validation("entries", format!("malformed entry in bundle: {e}"))
        })
    }
}
