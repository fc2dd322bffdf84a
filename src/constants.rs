//! # System Constants
//!
//! Core constants that define the operational boundaries of the cache layer.
//!
//! These values mirror the behavior of the Aprova web application: short
//! TTLs that favor correctness over hit rate, conservative traversal bounds
//! that guarantee termination on cyclic relationship graphs, and a small
//! threshold below which bulk invalidation is considered low-risk.

/// Default TTL applied when a `set` call does not override it, in minutes.
pub const DEFAULT_TTL_MINUTES: i64 = 30;

/// TTL used by the domain cache helpers (performance stats, discipline
/// stats, recent activity), in minutes.
pub const DOMAIN_TTL_MINUTES: i64 = 15;

/// Maximum recursion depth for relationship-graph traversal and related-key
/// invalidation cascades.
pub const DEFAULT_MAX_GRAPH_DEPTH: usize = 3;

/// Maximum number of nodes visited during relationship-graph traversal and
/// related-key invalidation cascades.
pub const DEFAULT_MAX_GRAPH_NODES: usize = 50;

/// Invalidating more than this many explicitly-named keys requires a
/// confirmation token, as do clear-by-type and clear-by-pattern.
pub const CONFIRMATION_THRESHOLD: usize = 5;

/// Window during which a minted confirmation token may be redeemed, in
/// seconds.
pub const DEFAULT_CONFIRMATION_TTL_SECONDS: u64 = 300;

/// Byte quota for the local/session storage tiers. Matches the ~5 MiB
/// budget browsers give `localStorage`.
pub const DEFAULT_WEB_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Interval between expired-entry sweeps, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 300;

/// How many of the largest entries each per-type statistics block reports.
pub const LARGEST_ENTRIES_LIMIT: usize = 5;

/// Maximum rendered length of a cache key in diagrams and listings before
/// the middle is elided.
pub const KEY_DISPLAY_MAX_LEN: usize = 40;

/// Version stamp written into export bundles and accepted on import.
pub const EXPORT_BUNDLE_VERSION: &str = "1.0";

/// Key prefixes used by the domain cache helpers.
pub mod domain_keys {
    pub const PERFORMANCE_PREFIX: &str = "performance_";
    pub const DISCIPLINE_STATS_PREFIX: &str = "discipline_stats_";
    pub const RECENT_ACTIVITY_PREFIX: &str = "recent_activity_";
}

/// Expiration histogram bucket edges, as seconds from "now".
pub mod expiration_buckets {
    pub const WITHIN_ONE_MINUTE: i64 = 60;
    pub const WITHIN_ONE_HOUR: i64 = 60 * 60;
    pub const WITHIN_ONE_DAY: i64 = 24 * 60 * 60;
    pub const WITHIN_ONE_WEEK: i64 = 7 * 24 * 60 * 60;
}
