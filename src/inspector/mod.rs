//! # Cache Inspector
//!
//! Read-only analytics over the cache manager: key enumeration with
//! filters, entry metadata resolution, full entry listings with pagination,
//! relationship-graph construction, and statistics aggregation.
//!
//! The inspector never mutates the adapters or the relationship index; the
//! only mutation it can trigger indirectly is the manager's lazy expiry
//! deletion during lookups. It reaches the manager's internals through
//! typed crate-internal accessors rather than private storage.

pub mod graph;
pub mod statistics;

use regex::Regex;
use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::manager::CacheManager;
use crate::models::{CacheEntryInfo, CacheEntryMetadata, CacheType, KeyListing};
use crate::query_builder::Pagination;

pub use graph::{GraphEdge, GraphNode, GraphOptions, RelationshipGraph};
pub use statistics::{
    CacheTypeStatistics, CompleteStatistics, EntrySizeInfo, ExpirationStatistics, StatusCounts,
};

/// Filters for key enumeration.
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    /// Restrict to one tier. When absent, aggregates across every tier the
    /// caller can reach (persisted only when an owner is supplied).
    pub cache_type: Option<CacheType>,
    /// Regular expression tested against the raw key string.
    pub pattern: Option<String>,
    /// Include entries that are already expired.
    pub include_expired: bool,
    /// Tenant scope, required to reach the persisted tier.
    pub owner: Option<String>,
}

/// Query shape for full entry listings.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub cache_type: Option<CacheType>,
    pub pattern: Option<String>,
    pub include_expired: bool,
    pub owner: Option<String>,
    /// Attach the raw payload to each row.
    pub include_data: bool,
    /// Window applied after key enumeration but before data resolution, so
    /// skipped entries never incur a data fetch.
    pub pagination: Option<Pagination>,
}

/// Read-only analytics layer. Cheap to clone; construct once per process
/// next to the manager.
#[derive(Clone)]
pub struct CacheInspector {
    manager: Arc<CacheManager>,
}

impl CacheInspector {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    pub(crate) fn manager(&self) -> &CacheManager {
        &self.manager
    }

    /// Enumerate keys across the filtered tiers, deduplicated and sorted.
    pub async fn get_keys(&self, filter: &KeyFilter) -> Result<Vec<String>> {
        let matcher = compile_pattern(filter.pattern.as_deref())?;
        let listings = self
            .enumerate(filter.cache_type, filter.owner.as_deref())
            .await;

        let now = chrono::Utc::now();
        let mut keys: Vec<String> = listings
            .into_iter()
            .filter(|(_, listing)| filter.include_expired || !listing.is_expired_at(now))
            .filter(|(_, listing)| {
                matcher
                    .as_ref()
                    .map(|re| re.is_match(&listing.key))
                    .unwrap_or(true)
            })
            .map(|(_, listing)| listing.key)
            .collect();

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Resolve the metadata of one entry: timestamps, expiry status, size
    /// estimate, and related keys.
    pub async fn get_entry_metadata(
        &self,
        key: &str,
        cache_type: CacheType,
        owner: Option<&str>,
    ) -> Option<CacheEntryMetadata> {
        let store = self.manager.store_for(cache_type);
        let entry = store.get(key, owner).await?;
        let size_bytes = if cache_type.stores_serialized_text() {
            store
                .entry_size(key, owner)
                .await
                .unwrap_or_else(|| entry.size_estimate())
        } else {
            entry.size_estimate()
        };

        let mut metadata = entry.metadata(size_bytes);
        // The live index supersedes what was stored with the entry.
        let indexed = self.manager.relationships().related_of(key);
        if !indexed.is_empty() {
            metadata.related_keys = indexed;
        }
        Some(metadata)
    }

    /// Full entry listing. Pagination windows the key set before any entry
    /// data is resolved - for the persisted tier, each resolution is a
    /// network round trip, so skipped rows must never pay it.
    pub async fn get_all_entries(&self, query: &EntryQuery) -> Result<Vec<CacheEntryInfo>> {
        let matcher = compile_pattern(query.pattern.as_deref())?;
        let listings = self
            .enumerate(query.cache_type, query.owner.as_deref())
            .await;

        let now = chrono::Utc::now();
        let filtered: Vec<(CacheType, KeyListing)> = listings
            .into_iter()
            .filter(|(_, listing)| query.include_expired || !listing.is_expired_at(now))
            .filter(|(_, listing)| {
                matcher
                    .as_ref()
                    .map(|re| re.is_match(&listing.key))
                    .unwrap_or(true)
            })
            .collect();

        let windowed = match query.pagination {
            Some(pagination) => pagination.apply(filtered),
            None => filtered,
        };

        let owner = query.owner.as_deref();
        let mut entries = Vec::with_capacity(windowed.len());
        for (cache_type, listing) in windowed {
            let store = self.manager.store_for(cache_type);
            let Some(entry) = store.get(&listing.key, owner).await else {
                continue;
            };
            let size_bytes = if cache_type.stores_serialized_text() {
                store
                    .entry_size(&listing.key, owner)
                    .await
                    .unwrap_or_else(|| entry.size_estimate())
            } else {
                entry.size_estimate()
            };

            entries.push(CacheEntryInfo {
                key: entry.key.clone(),
                cache_type,
                owner_id: entry.owner_id.clone(),
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                expired: entry.is_expired_at(now),
                size_bytes,
                related_keys: {
                    let indexed = self.manager.relationships().related_of(&entry.key);
                    if indexed.is_empty() {
                        entry.related_keys.clone()
                    } else {
                        indexed
                    }
                },
                data: query.include_data.then_some(entry.data),
            });
        }

        Ok(entries)
    }

    /// Enumerate `(tier, listing)` pairs for the filtered tiers.
    pub(crate) async fn enumerate(
        &self,
        cache_type: Option<CacheType>,
        owner: Option<&str>,
    ) -> Vec<(CacheType, KeyListing)> {
        let tiers: Vec<CacheType> = match cache_type {
            Some(cache_type) => vec![cache_type],
            None => CacheType::ALL
                .into_iter()
                .filter(|t| !t.requires_owner() || owner.is_some())
                .collect(),
        };

        let mut listings = Vec::new();
        for tier in tiers {
            for listing in self.manager.store_for(tier).list_keys(owner).await {
                listings.push((tier, listing));
            }
        }
        listings
    }
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        None => Ok(None),
        Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
            CacheError::validation("pattern", format!("not a valid regular expression: {e}"))
        }),
    }
}

/// Abbreviate a long key for display: keep the first and last
/// colon-delimited segments and elide the middle, falling back to straight
/// truncation with an ellipsis when the segments leave too little room.
pub fn shorten_key(key: &str, max_len: usize) -> String {
    if key.chars().count() <= max_len {
        return key.to_string();
    }

    let segments: Vec<&str> = key.split(':').collect();
    if segments.len() >= 2 {
        let first = segments[0];
        let last = segments[segments.len() - 1];
        let candidate = format!("{first}:...:{last}");
        if candidate.chars().count() <= max_len {
            return candidate;
        }
    }

    let keep = max_len.saturating_sub(3).max(1);
    let truncated: String = key.chars().take(keep).collect();
    format!("{truncated}...")
}
