//! # Cache Configuration Management
//!
//! Environment-aware configuration for the cache core. Allows different
//! cache behaviors in production, development, and test environments, with
//! environment-variable overrides for deploy-time tuning.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants;

/// Configuration for the cache layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch. When disabled, every read is a miss and every write a
    /// no-op, so callers behave exactly as if nothing was cached.
    pub enabled: bool,
    /// Default TTL for `set` calls that do not override it, in minutes.
    pub default_ttl_minutes: i64,
    /// TTL for the domain cache helpers, in minutes.
    pub domain_ttl_minutes: i64,
    /// Maximum depth for graph traversal and invalidation cascades.
    pub max_graph_depth: usize,
    /// Maximum node count for graph traversal and invalidation cascades.
    pub max_graph_nodes: usize,
    /// Bulk invalidations touching more keys than this require confirmation.
    pub confirmation_threshold: usize,
    /// Redemption window for confirmation tokens, in seconds.
    pub confirmation_ttl_seconds: u64,
    /// Byte quota for each web-storage tier.
    pub web_storage_quota_bytes: usize,
    /// Interval between expired-entry sweeps, in seconds.
    pub cleanup_interval_seconds: u64,
    /// How many of the largest entries per-type statistics report.
    pub largest_entries_limit: usize,
    /// Maximum rendered key length before display shortening kicks in.
    pub key_display_max_len: usize,
}

impl Default for CacheConfig {
    /// Default configuration suitable for production.
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_minutes: constants::DEFAULT_TTL_MINUTES,
            domain_ttl_minutes: constants::DOMAIN_TTL_MINUTES,
            max_graph_depth: constants::DEFAULT_MAX_GRAPH_DEPTH,
            max_graph_nodes: constants::DEFAULT_MAX_GRAPH_NODES,
            confirmation_threshold: constants::CONFIRMATION_THRESHOLD,
            confirmation_ttl_seconds: constants::DEFAULT_CONFIRMATION_TTL_SECONDS,
            web_storage_quota_bytes: constants::DEFAULT_WEB_STORAGE_QUOTA_BYTES,
            cleanup_interval_seconds: constants::DEFAULT_CLEANUP_INTERVAL_SECONDS,
            largest_entries_limit: constants::LARGEST_ENTRIES_LIMIT,
            key_display_max_len: constants::KEY_DISPLAY_MAX_LEN,
        }
    }
}

impl CacheConfig {
    /// Test-optimized configuration with rapid expiry and tight bounds.
    pub fn for_test() -> Self {
        Self {
            enabled: true,
            default_ttl_minutes: 1,
            domain_ttl_minutes: 1,
            max_graph_depth: 3,
            max_graph_nodes: 50,
            confirmation_threshold: constants::CONFIRMATION_THRESHOLD,
            confirmation_ttl_seconds: 2,
            web_storage_quota_bytes: 64 * 1024,
            cleanup_interval_seconds: 1,
            largest_entries_limit: 3,
            key_display_max_len: constants::KEY_DISPLAY_MAX_LEN,
        }
    }

    /// Development configuration: production bounds, faster sweeps.
    pub fn for_development() -> Self {
        Self {
            cleanup_interval_seconds: 60,
            ..Self::default()
        }
    }

    /// Load configuration based on the detected environment, then apply
    /// environment-variable overrides.
    pub fn from_environment() -> Self {
        let environment = detect_environment();

        let profile = match environment.as_str() {
            "test" => {
                info!("Loading test cache configuration (rapid expiry)");
                Self::for_test()
            }
            "development" => {
                info!("Loading development cache configuration");
                Self::for_development()
            }
            _ => {
                info!("Loading production cache configuration");
                Self::default()
            }
        };

        let config = profile.clone().with_env_overrides();
        match config.validate() {
            Ok(()) => {
                config.log_configuration();
                config
            }
            Err(e) => {
                warn!("Invalid cache configuration from overrides ({e}); using profile defaults");
                profile
            }
        }
    }

    /// Apply `APROVA_CACHE_*` environment-variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(enabled) = env::var("APROVA_CACHE_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(self.enabled);
            info!("Cache enabled override: {}", self.enabled);
        }

        if let Ok(ttl) = env::var("APROVA_CACHE_DEFAULT_TTL_MINUTES") {
            if let Ok(minutes) = ttl.parse::<i64>() {
                self.default_ttl_minutes = minutes;
                info!("Default TTL override: {}m", minutes);
            }
        }

        if let Ok(ttl) = env::var("APROVA_CACHE_DOMAIN_TTL_MINUTES") {
            if let Ok(minutes) = ttl.parse::<i64>() {
                self.domain_ttl_minutes = minutes;
                info!("Domain TTL override: {}m", minutes);
            }
        }

        if let Ok(window) = env::var("APROVA_CACHE_CONFIRMATION_TTL_SECONDS") {
            if let Ok(seconds) = window.parse::<u64>() {
                self.confirmation_ttl_seconds = seconds;
                info!("Confirmation token window override: {}s", seconds);
            }
        }

        if let Ok(interval) = env::var("APROVA_CACHE_CLEANUP_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                self.cleanup_interval_seconds = seconds;
                info!("Cleanup interval override: {}s", seconds);
            }
        }

        self
    }

    /// Confirmation token window as a [`Duration`].
    pub fn confirmation_window(&self) -> Duration {
        Duration::from_secs(self.confirmation_ttl_seconds)
    }

    /// Cleanup interval as a [`Duration`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_ttl_minutes <= 0 {
            return Err("default TTL must be greater than 0 minutes".to_string());
        }

        if self.domain_ttl_minutes <= 0 {
            return Err("domain TTL must be greater than 0 minutes".to_string());
        }

        if self.max_graph_depth == 0 || self.max_graph_nodes == 0 {
            return Err("graph traversal bounds must be greater than 0".to_string());
        }

        if self.cleanup_interval_seconds == 0 {
            return Err("cleanup interval must be greater than 0".to_string());
        }

        if self.confirmation_ttl_seconds == 0 {
            warn!("Confirmation token window is 0 - destructive operations effectively disabled");
        }

        Ok(())
    }

    /// Log the active configuration for debugging.
    pub fn log_configuration(&self) {
        info!("Cache Configuration:");
        info!("  Enabled: {}", self.enabled);
        info!(
            "  TTL: {}m default, {}m domain helpers",
            self.default_ttl_minutes, self.domain_ttl_minutes
        );
        info!(
            "  Graph bounds: depth {}, {} nodes",
            self.max_graph_depth, self.max_graph_nodes
        );
        info!(
            "  Confirmation: >{} keys, {}s token window",
            self.confirmation_threshold, self.confirmation_ttl_seconds
        );
        info!(
            "  Web storage quota: {} bytes",
            self.web_storage_quota_bytes
        );
        info!("  Cleanup interval: {}s", self.cleanup_interval_seconds);
    }
}

/// Detect the runtime environment from common environment variables.
fn detect_environment() -> String {
    env::var("APROVA_ENV")
        .or_else(|_| env::var("NODE_ENV"))
        .or_else(|_| env::var("RUST_ENV"))
        .unwrap_or_else(|_| "production".to_string())
}
