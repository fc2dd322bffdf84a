//! Statistics aggregation.
//!
//! All aggregates here are derived, never stored: each call recomputes
//! from the adapters, trading CPU for staleness-freedom (caching cache
//! statistics would create its own staleness paradox).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::expiration_buckets;
use crate::models::CacheType;

use super::CacheInspector;

/// Active/expired/total entry counts for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub active: usize,
    pub expired: usize,
    pub total: usize,
}

/// A key with its estimated size, for largest-entry rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySizeInfo {
    pub key: String,
    pub size_bytes: usize,
}

/// Point-in-time aggregate over one cache tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheTypeStatistics {
    pub cache_type: CacheType,
    pub counts: StatusCounts,
    pub total_size_bytes: usize,
    pub largest_entries: Vec<EntrySizeInfo>,
}

/// Histogram of time-to-expiry across every reachable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpirationStatistics {
    pub already_expired: usize,
    pub within_one_minute: usize,
    pub within_one_hour: usize,
    pub within_one_day: usize,
    pub within_one_week: usize,
    pub later: usize,
}

impl ExpirationStatistics {
    /// Place one expiry timestamp into its bucket.
    fn record(&mut self, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        let remaining = (expires_at - now).num_seconds();
        if remaining <= 0 {
            self.already_expired += 1;
        } else if remaining <= expiration_buckets::WITHIN_ONE_MINUTE {
            self.within_one_minute += 1;
        } else if remaining <= expiration_buckets::WITHIN_ONE_HOUR {
            self.within_one_hour += 1;
        } else if remaining <= expiration_buckets::WITHIN_ONE_DAY {
            self.within_one_day += 1;
        } else if remaining <= expiration_buckets::WITHIN_ONE_WEEK {
            self.within_one_week += 1;
        } else {
            self.later += 1;
        }
    }
}

/// Per-type statistics for every reachable tier plus the global expiration
/// histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteStatistics {
    pub total_entries: usize,
    pub by_type: Vec<CacheTypeStatistics>,
    pub expiration: ExpirationStatistics,
    pub generated_at: DateTime<Utc>,
}

impl CacheInspector {
    /// Total estimated size of one tier, in bytes. Expired entries still
    /// occupy storage, so they count.
    pub async fn calculate_cache_size(&self, cache_type: CacheType, owner: Option<&str>) -> usize {
        self.entry_sizes(cache_type, owner)
            .await
            .iter()
            .map(|e| e.size_bytes)
            .sum()
    }

    /// Active/expired/total counts for one tier.
    pub async fn count_entries_by_status(
        &self,
        cache_type: CacheType,
        owner: Option<&str>,
    ) -> StatusCounts {
        let now = Utc::now();
        let mut counts = StatusCounts::default();
        for (_, listing) in self.enumerate(Some(cache_type), owner).await {
            counts.total += 1;
            if listing.is_expired_at(now) {
                counts.expired += 1;
            } else {
                counts.active += 1;
            }
        }
        counts
    }

    /// Expiration-bucket histogram across every tier the caller can reach.
    pub async fn calculate_expiration_statistics(
        &self,
        owner: Option<&str>,
    ) -> ExpirationStatistics {
        let now = Utc::now();
        let mut stats = ExpirationStatistics::default();
        for (_, listing) in self.enumerate(None, owner).await {
            stats.record(listing.expires_at, now);
        }
        stats
    }

    /// Full aggregate for one tier: counts, size, and the largest entries.
    pub async fn calculate_type_statistics(
        &self,
        cache_type: CacheType,
        owner: Option<&str>,
    ) -> CacheTypeStatistics {
        let counts = self.count_entries_by_status(cache_type, owner).await;
        let mut sizes = self.entry_sizes(cache_type, owner).await;
        let total_size_bytes = sizes.iter().map(|e| e.size_bytes).sum();

        sizes.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then(a.key.cmp(&b.key)));
        sizes.truncate(self.manager().config().largest_entries_limit);

        CacheTypeStatistics {
            cache_type,
            counts,
            total_size_bytes,
            largest_entries: sizes,
        }
    }

    /// Per-type statistics for every reachable tier plus one global
    /// expiration histogram.
    pub async fn calculate_complete_statistics(&self, owner: Option<&str>) -> CompleteStatistics {
        let mut by_type = Vec::new();
        for cache_type in CacheType::ALL {
            if cache_type.requires_owner() && owner.is_none() {
                continue;
            }
            by_type.push(self.calculate_type_statistics(cache_type, owner).await);
        }

        let expiration = self.calculate_expiration_statistics(owner).await;
        let total_entries = by_type.iter().map(|s| s.counts.total).sum();

        CompleteStatistics {
            total_entries,
            by_type,
            expiration,
            generated_at: Utc::now(),
        }
    }

    /// Per-entry size estimates for one tier, expired entries included.
    async fn entry_sizes(&self, cache_type: CacheType, owner: Option<&str>) -> Vec<EntrySizeInfo> {
        let store = self.manager().store_for(cache_type);
        let mut sizes = Vec::new();
        for (_, listing) in self.enumerate(Some(cache_type), owner).await {
            if let Some(size_bytes) = store.entry_size(&listing.key, owner).await {
                sizes.push(EntrySizeInfo {
                    key: listing.key,
                    size_bytes,
                });
            }
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiration_buckets_cover_the_number_line() {
        let now = Utc::now();
        let mut stats = ExpirationStatistics::default();

        stats.record(now - Duration::seconds(5), now);
        stats.record(now + Duration::seconds(30), now);
        stats.record(now + Duration::minutes(30), now);
        stats.record(now + Duration::hours(12), now);
        stats.record(now + Duration::days(3), now);
        stats.record(now + Duration::days(30), now);

        assert_eq!(stats.already_expired, 1);
        assert_eq!(stats.within_one_minute, 1);
        assert_eq!(stats.within_one_hour, 1);
        assert_eq!(stats.within_one_day, 1);
        assert_eq!(stats.within_one_week, 1);
        assert_eq!(stats.later, 1);
    }
}
