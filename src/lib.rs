#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Aprova Cache Core
//!
//! High-performance Rust implementation of the multi-tier cache layer
//! behind the Aprova exam-prep platform, designed to complement the
//! Next.js web application that consumes it.
//!
//! ## Overview
//!
//! A unified cache abstraction spanning four tiers - in-process memory,
//! local-storage-style and session-storage-style string stores, and a
//! remote persisted Postgres table - with key-relationship tracking,
//! recursive graph traversal for visualization, TTL-based expiration,
//! statistics aggregation, and administrative bulk invalidation gated by
//! single-use confirmation tokens.
//!
//! ## Architecture
//!
//! - [`store`] - one adapter per tier with fail-soft I/O semantics
//! - [`manager`] - the unified façade: dispatch, TTL policy, and the
//!   in-memory key-relationship index
//! - [`inspector`] - read-only analytics: key enumeration, entry metadata,
//!   relationship graphs, statistics
//! - [`admin`] - bulk invalidation, import/export, and the
//!   confirmation-token workflow
//! - [`domain`] - get-or-compute helpers for the exam-prep domain queries
//! - [`query_builder`] - typed query expressions for the persisted table
//! - [`config`] / [`logging`] / [`error`] - ambient concerns
//!
//! The services are plain dependency-injected objects: construct a
//! [`manager::CacheManager`] once at process startup and hand `Arc`
//! handles to the inspector, administration, and domain helpers. There are
//! no hidden global instances.
//!
//! ## Failure Philosophy
//!
//! The cache is a best-effort, eventually-stale layer - never source of
//! truth. Adapter failures degrade to misses and no-ops (logged, never
//! thrown), while malformed administration requests and rejected
//! confirmation tokens propagate as typed errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aprova_cache::config::CacheConfig;
//! use aprova_cache::manager::{CacheManager, CacheOptions};
//! use aprova_cache::models::CacheType;
//!
//! # async fn example() {
//! let config = CacheConfig::from_environment();
//! let cache = Arc::new(CacheManager::without_persistence(config));
//!
//! let options = CacheOptions::tier(CacheType::Memory).with_ttl_minutes(15);
//! cache
//!     .set("performance_u1_simulados", serde_json::json!({"total": 3}), &options)
//!     .await;
//!
//! let hit = cache.get("performance_u1_simulados", &options).await;
//! assert!(hit.is_some());
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod inspector;
pub mod logging;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod store;

pub use admin::{
    AdminResponse, BatchOperationResult, CacheAdministration, ExportBundle, ExportQuery,
    ImportOptions, InvalidationRequest, InvalidationTarget,
};
pub use config::CacheConfig;
pub use domain::{DomainCache, StatsSource};
pub use error::{CacheError, Result};
pub use inspector::{CacheInspector, CompleteStatistics, GraphOptions, RelationshipGraph};
pub use manager::{spawn_cleanup_task, CacheManager, CacheOptions};
pub use models::{CacheEntry, CacheEntryInfo, CacheEntryMetadata, CacheType};
