//! # Domain Cache Helpers
//!
//! Thin convenience wrappers over the cache manager for the exam-prep
//! domain queries: deterministic key generation plus get-or-compute-and-
//! store semantics with a short fixed TTL.
//!
//! The pattern is always the same, duplicated per domain query shape:
//! generate the key, try the cache, compute from the underlying data
//! source on a miss, store, return. When underlying domain data changes (a
//! study session is recorded, an exam is finished), callers invalidate the
//! relevant keys explicitly rather than waiting for TTL - correctness over
//! cache-hit-rate.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::constants::domain_keys;
use crate::error::Result;
use crate::manager::{CacheManager, CacheOptions};
use crate::models::CacheType;

/// The computation seam behind the helpers: the relational store that
/// produces the real numbers on a cache miss. Unlike cache adapters, this
/// source is authoritative, so its failures propagate.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Aggregate performance stats for an owner, per question/exam kind,
    /// optionally windowed to a period (`"7d"`, `"30d"`, ...).
    async fn performance_stats(
        &self,
        owner: &str,
        kind: &str,
        period: Option<&str>,
    ) -> Result<Value>;

    /// Per-discipline aggregates for an owner.
    async fn discipline_stats(&self, owner: &str, discipline_id: &str) -> Result<Value>;

    /// The owner's most recent study activity.
    async fn recent_activity(&self, owner: &str, limit: usize) -> Result<Value>;
}

/// Get-or-compute helpers over one cache tier (memory by default).
pub struct DomainCache {
    manager: Arc<CacheManager>,
    source: Arc<dyn StatsSource>,
    tier: CacheType,
}

impl DomainCache {
    pub fn new(manager: Arc<CacheManager>, source: Arc<dyn StatsSource>) -> Self {
        Self {
            manager,
            source,
            tier: CacheType::Memory,
        }
    }

    /// Serve the helpers from a different tier.
    pub fn with_tier(mut self, tier: CacheType) -> Self {
        self.tier = tier;
        self
    }

    /// `performance_{owner}_{kind}` or `performance_{owner}_{kind}_{period}`.
    pub fn performance_key(owner: &str, kind: &str, period: Option<&str>) -> String {
        let prefix = domain_keys::PERFORMANCE_PREFIX;
        match period {
            Some(period) => format!("{prefix}{owner}_{kind}_{period}"),
            None => format!("{prefix}{owner}_{kind}"),
        }
    }

    /// `discipline_stats_{owner}_{discipline_id}`.
    pub fn discipline_stats_key(owner: &str, discipline_id: &str) -> String {
        format!(
            "{}{owner}_{discipline_id}",
            domain_keys::DISCIPLINE_STATS_PREFIX
        )
    }

    /// `recent_activity_{owner}_{limit}`.
    pub fn recent_activity_key(owner: &str, limit: usize) -> String {
        format!("{}{owner}_{limit}", domain_keys::RECENT_ACTIVITY_PREFIX)
    }

    /// Cached performance stats, computed on miss.
    pub async fn get_cached_performance(
        &self,
        owner: &str,
        kind: &str,
        period: Option<&str>,
    ) -> Result<Value> {
        let key = Self::performance_key(owner, kind, period);
        let options = self.options(owner);

        if let Some(cached) = self.manager.get(&key, &options).await {
            debug!(key = %key, "Domain cache hit");
            return Ok(cached);
        }

        let computed = self.source.performance_stats(owner, kind, period).await?;
        self.manager.set(&key, computed.clone(), &options).await;
        debug!(key = %key, "Domain cache miss; recomputed and stored");
        Ok(computed)
    }

    /// Cached per-discipline stats, computed on miss.
    pub async fn get_cached_discipline_stats(
        &self,
        owner: &str,
        discipline_id: &str,
    ) -> Result<Value> {
        let key = Self::discipline_stats_key(owner, discipline_id);
        let options = self.options(owner);

        if let Some(cached) = self.manager.get(&key, &options).await {
            debug!(key = %key, "Domain cache hit");
            return Ok(cached);
        }

        let computed = self.source.discipline_stats(owner, discipline_id).await?;
        self.manager.set(&key, computed.clone(), &options).await;
        debug!(key = %key, "Domain cache miss; recomputed and stored");
        Ok(computed)
    }

    /// Cached recent activity, computed on miss.
    pub async fn get_cached_recent_activity(&self, owner: &str, limit: usize) -> Result<Value> {
        let key = Self::recent_activity_key(owner, limit);
        let options = self.options(owner);

        if let Some(cached) = self.manager.get(&key, &options).await {
            debug!(key = %key, "Domain cache hit");
            return Ok(cached);
        }

        let computed = self.source.recent_activity(owner, limit).await?;
        self.manager.set(&key, computed.clone(), &options).await;
        debug!(key = %key, "Domain cache miss; recomputed and stored");
        Ok(computed)
    }

    /// Drop every performance cache for an owner. Called when a study
    /// session is recorded or an exam is finished.
    pub async fn invalidate_performance(&self, owner: &str) -> Vec<String> {
        let prefixes = [format!("{}{owner}_", domain_keys::PERFORMANCE_PREFIX)];
        self.invalidate_prefixes(owner, &prefixes).await
    }

    /// Drop every domain cache for an owner.
    pub async fn invalidate_owner_caches(&self, owner: &str) -> Vec<String> {
        let prefixes = [
            format!("{}{owner}_", domain_keys::PERFORMANCE_PREFIX),
            format!("{}{owner}_", domain_keys::DISCIPLINE_STATS_PREFIX),
            format!("{}{owner}_", domain_keys::RECENT_ACTIVITY_PREFIX),
        ];
        self.invalidate_prefixes(owner, &prefixes).await
    }

    async fn invalidate_prefixes(&self, owner: &str, prefixes: &[String]) -> Vec<String> {
        let options = self.options(owner);
        let listings = self
            .manager
            .store_for(self.tier)
            .list_keys(options.owner_ref())
            .await;

        let mut deleted = Vec::new();
        for listing in listings {
            if prefixes.iter().any(|p| listing.key.starts_with(p.as_str())) {
                self.manager.delete(&listing.key, &options).await;
                deleted.push(listing.key);
            }
        }

        debug!(owner = %owner, deleted = deleted.len(), "Invalidated domain caches");
        deleted
    }

    fn options(&self, owner: &str) -> CacheOptions {
        CacheOptions::tier(self.tier)
            .with_owner(owner)
            .with_ttl_minutes(self.manager.config().domain_ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_keys_are_deterministic() {
        assert_eq!(
            DomainCache::performance_key("u1", "simulados", None),
            "performance_u1_simulados"
        );
        assert_eq!(
            DomainCache::performance_key("u1", "questoes", Some("7d")),
            "performance_u1_questoes_7d"
        );
    }

    #[test]
    fn other_domain_keys_are_deterministic() {
        assert_eq!(
            DomainCache::discipline_stats_key("u1", "42"),
            "discipline_stats_u1_42"
        );
        assert_eq!(
            DomainCache::recent_activity_key("u1", 10),
            "recent_activity_u1_10"
        );
    }
}
