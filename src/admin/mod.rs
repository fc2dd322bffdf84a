//! # Cache Administration
//!
//! Mutating bulk operations over the cache: invalidate-by-key-set,
//! clear-by-type, clear-by-pattern, and import/export - gated by a
//! confirmation-token workflow for destructive actions.
//!
//! ## Confirmation State Machine
//!
//! ```text
//! Requested ──(low-risk: ≤ threshold named keys)──────────▶ Executed
//! Requested ──(destructive)──▶ AwaitingConfirmation
//! AwaitingConfirmation ──(matching token)──▶ Confirmed ──▶ Executed
//! ```
//!
//! Clear-by-type, clear-by-pattern, and invalidations touching more than
//! the configured threshold of keys first mint a [`ConfirmationToken`]
//! and return [`AdminResponse::RequiresConfirmation`] without executing.
//! Resubmitting the same logical operation with that token (optionally
//! with a free-text reason, recorded for audit) executes it. A token
//! presented for a different operation, reused, or expired is rejected
//! with no side effect.
//!
//! Every mutating call returns per-key results: one failing key never
//! aborts the remainder.
//!
//! [`ConfirmationToken`]: ConfirmationTokenStore

pub mod bundle;
pub mod confirmation;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::inspector::{CacheInspector, EntryQuery, KeyFilter};
use crate::logging::log_admin_operation;
use crate::manager::{CacheManager, CacheOptions};
use crate::models::CacheType;

pub use bundle::{ExportBundle, ExportedEntry};
pub use confirmation::ConfirmationTokenStore;

/// What a bulk invalidation targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InvalidationTarget {
    /// Explicitly-named keys.
    Keys(Vec<String>),
    /// Every key matching a regular expression.
    Pattern(String),
    /// Every key of one tier.
    Type(CacheType),
}

/// A bulk invalidation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationRequest {
    pub target: InvalidationTarget,
    /// Tier scope for key/pattern targets. A `Type` target carries its own.
    #[serde(default)]
    pub cache_type: Option<CacheType>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Also invalidate each key's related-key cascade.
    #[serde(default)]
    pub cascade: bool,
    #[serde(default)]
    pub confirmation_token: Option<String>,
    /// Free-text reason, recorded for audit when the operation executes.
    #[serde(default)]
    pub reason: Option<String>,
}

impl InvalidationRequest {
    pub fn keys(keys: Vec<String>) -> Self {
        Self::for_target(InvalidationTarget::Keys(keys))
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::for_target(InvalidationTarget::Pattern(pattern.into()))
    }

    pub fn clear_type(cache_type: CacheType) -> Self {
        Self::for_target(InvalidationTarget::Type(cache_type))
    }

    fn for_target(target: InvalidationTarget) -> Self {
        Self {
            target,
            cache_type: None,
            owner: None,
            cascade: false,
            confirmation_token: None,
            reason: None,
        }
    }

    pub fn with_cache_type(mut self, cache_type: CacheType) -> Self {
        self.cache_type = Some(cache_type);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.confirmation_token = Some(token.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Outcome of one key within a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperationResult {
    pub operation: String,
    pub key: String,
    pub cache_type: Option<CacheType>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOperationResult {
    fn ok(operation: &str, key: impl Into<String>, cache_type: Option<CacheType>) -> Self {
        Self {
            operation: operation.to_string(),
            key: key.into(),
            cache_type,
            success: true,
            error: None,
        }
    }

    fn failed(
        operation: &str,
        key: impl Into<String>,
        cache_type: Option<CacheType>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            key: key.into(),
            cache_type,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Response to an administration request. "Confirmation required" is a
/// distinct response status, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdminResponse {
    RequiresConfirmation {
        #[serde(rename = "requiresConfirmation")]
        requires_confirmation: bool,
        #[serde(rename = "confirmationToken")]
        confirmation_token: String,
    },
    Completed {
        result: Vec<BatchOperationResult>,
    },
}

impl AdminResponse {
    fn awaiting(confirmation_token: String) -> Self {
        Self::RequiresConfirmation {
            requires_confirmation: true,
            confirmation_token,
        }
    }

    /// The minted token, when confirmation is required.
    pub fn confirmation_token(&self) -> Option<&str> {
        match self {
            Self::RequiresConfirmation {
                confirmation_token, ..
            } => Some(confirmation_token),
            Self::Completed { .. } => None,
        }
    }

    /// Per-key results, when the operation executed.
    pub fn results(&self) -> Option<&[BatchOperationResult]> {
        match self {
            Self::Completed { result } => Some(result),
            Self::RequiresConfirmation { .. } => None,
        }
    }
}

/// Filters for an export.
#[derive(Debug, Clone, Default)]
pub struct ExportQuery {
    pub cache_type: Option<CacheType>,
    pub pattern: Option<String>,
    pub owner: Option<String>,
    pub include_expired: bool,
}

/// Import behavior knobs.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Overwrite existing data for each imported key.
    pub overwrite_existing: bool,
    /// Owner to scope persisted-tier entries to; bundles do not carry one.
    pub owner: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            overwrite_existing: true,
            owner: None,
        }
    }
}

/// The administration service. Construct once next to the manager.
pub struct CacheAdministration {
    inspector: CacheInspector,
    tokens: ConfirmationTokenStore,
}

impl CacheAdministration {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        let tokens = ConfirmationTokenStore::new(manager.config().confirmation_window());
        Self {
            inspector: CacheInspector::new(manager),
            tokens,
        }
    }

    fn manager(&self) -> &CacheManager {
        self.inspector.manager()
    }

    /// Request a bulk invalidation.
    ///
    /// Low-risk requests (at most `confirmation_threshold` explicitly-named
    /// keys) execute directly. Destructive requests without a token return
    /// [`AdminResponse::RequiresConfirmation`] and touch nothing; with a
    /// valid token they execute and report per-key results.
    pub async fn request_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<AdminResponse> {
        self.validate(request)?;

        let (operation, keys) = self.plan(request).await?;

        let needs_confirmation = !matches!(request.target, InvalidationTarget::Keys(_))
            || keys.len() > self.manager().config().confirmation_threshold;

        if needs_confirmation {
            let fingerprint = fingerprint(request);
            match &request.confirmation_token {
                None => {
                    let token = self.tokens.mint(&fingerprint);
                    log_admin_operation(
                        operation,
                        request.cache_type.map(|t| t.to_string()).as_deref(),
                        keys.len(),
                        "awaiting_confirmation",
                        request.reason.as_deref(),
                    );
                    return Ok(AdminResponse::awaiting(token));
                }
                Some(token) => self.tokens.consume(token, &fingerprint)?,
            }
        }

        let results = self.execute(request, operation, keys).await;
        Ok(AdminResponse::Completed { result: results })
    }

    /// Export entries (optionally filtered) with their raw data and
    /// related keys, wrapped in the versioned envelope.
    pub async fn export_entries(&self, query: &ExportQuery) -> Result<ExportBundle> {
        let infos = self
            .inspector
            .get_all_entries(&EntryQuery {
                cache_type: query.cache_type,
                pattern: query.pattern.clone(),
                include_expired: query.include_expired,
                owner: query.owner.clone(),
                include_data: true,
                pagination: None,
            })
            .await?;

        let entries = infos
            .into_iter()
            .map(|info| ExportedEntry {
                key: info.key,
                cache_type: info.cache_type,
                data: info.data.unwrap_or(serde_json::Value::Null),
                created_at: info.created_at,
                expires_at: info.expires_at,
                related_keys: info.related_keys,
            })
            .collect();

        Ok(ExportBundle::new(entries))
    }

    /// Validate and import a bundle from an untrusted JSON value. The
    /// envelope is validated in full before any write occurs.
    pub async fn import_entries(
        &self,
        value: &serde_json::Value,
        options: &ImportOptions,
    ) -> Result<Vec<BatchOperationResult>> {
        let bundle = ExportBundle::from_value(value)?;
        Ok(self.import_bundle(bundle, options).await)
    }

    /// Import an already-validated bundle, reporting per-key results.
    pub async fn import_bundle(
        &self,
        bundle: ExportBundle,
        options: &ImportOptions,
    ) -> Vec<BatchOperationResult> {
        const OPERATION: &str = "import";

        let now = Utc::now();
        let owner = options.owner.as_deref();
        let mut results = Vec::with_capacity(bundle.entries.len());

        for exported in bundle.entries {
            let cache_type = exported.cache_type;
            let key = exported.key.clone();

            if exported.expires_at <= now {
                results.push(BatchOperationResult::failed(
                    OPERATION,
                    key,
                    Some(cache_type),
                    "entry expired before import",
                ));
                continue;
            }

            if cache_type.requires_owner() && owner.is_none() {
                results.push(BatchOperationResult::failed(
                    OPERATION,
                    key,
                    Some(cache_type),
                    "owner required for persisted entries",
                ));
                continue;
            }

            if !options.overwrite_existing {
                let existing = self.manager().store_for(cache_type).get(&key, owner).await;
                if matches!(existing, Some(ref e) if !e.is_expired()) {
                    results.push(BatchOperationResult::failed(
                        OPERATION,
                        key,
                        Some(cache_type),
                        "key already exists and overwrite is disabled",
                    ));
                    continue;
                }
            }

            self.manager()
                .restore_entry(exported.into_entry(owner))
                .await;
            results.push(BatchOperationResult::ok(OPERATION, key, Some(cache_type)));
        }

        log_admin_operation(OPERATION, None, results.len(), "executed", None);
        results
    }

    /// Reject malformed requests before any token is minted or any key is
    /// touched.
    fn validate(&self, request: &InvalidationRequest) -> Result<()> {
        match &request.target {
            InvalidationTarget::Keys(keys) if keys.is_empty() => {
                return Err(CacheError::validation("keys", "must not be empty"));
            }
            InvalidationTarget::Pattern(pattern) if pattern.is_empty() => {
                return Err(CacheError::validation("pattern", "must not be empty"));
            }
            _ => {}
        }

        let effective_tier = match &request.target {
            InvalidationTarget::Type(cache_type) => Some(*cache_type),
            _ => request.cache_type,
        };
        if effective_tier == Some(CacheType::Persisted) && request.owner.is_none() {
            return Err(CacheError::validation(
                "owner",
                "required to administer the persisted tier",
            ));
        }

        Ok(())
    }

    /// Resolve the operation name and the key set it will touch. Read-only:
    /// runs before the confirmation gate.
    async fn plan(&self, request: &InvalidationRequest) -> Result<(&'static str, Vec<String>)> {
        match &request.target {
            InvalidationTarget::Keys(keys) => Ok(("invalidate_keys", keys.clone())),
            InvalidationTarget::Pattern(pattern) => {
                let keys = self
                    .inspector
                    .get_keys(&KeyFilter {
                        cache_type: request.cache_type,
                        pattern: Some(pattern.clone()),
                        include_expired: true,
                        owner: request.owner.clone(),
                    })
                    .await?;
                Ok(("clear_by_pattern", keys))
            }
            InvalidationTarget::Type(cache_type) => {
                let keys = self
                    .inspector
                    .get_keys(&KeyFilter {
                        cache_type: Some(*cache_type),
                        pattern: None,
                        include_expired: true,
                        owner: request.owner.clone(),
                    })
                    .await?;
                Ok(("clear_by_type", keys))
            }
        }
    }

    async fn execute(
        &self,
        request: &InvalidationRequest,
        operation: &str,
        keys: Vec<String>,
    ) -> Vec<BatchOperationResult> {
        let tier_scope = match &request.target {
            InvalidationTarget::Type(cache_type) => Some(*cache_type),
            _ => request.cache_type,
        };
        let options = CacheOptions {
            cache_type: tier_scope,
            owner: request.owner.clone(),
            ttl_minutes: None,
            related_keys: Vec::new(),
        };

        let mut processed: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(keys.len());

        for key in keys {
            if processed.contains(&key) {
                continue;
            }

            if request.cascade {
                for invalidated in self.manager().invalidate_with_related(&key, &options).await {
                    if processed.insert(invalidated.clone()) {
                        results.push(BatchOperationResult::ok(operation, invalidated, tier_scope));
                    }
                }
            } else {
                self.manager().delete(&key, &options).await;
                processed.insert(key.clone());
                results.push(BatchOperationResult::ok(operation, key, tier_scope));
            }
        }

        log_admin_operation(
            operation,
            tier_scope.map(|t| t.to_string()).as_deref(),
            results.len(),
            "executed",
            request.reason.as_deref(),
        );

        results
    }
}

/// Canonical description of the logical operation a token is bound to.
/// Key lists are sorted so resubmission order does not matter.
fn fingerprint(request: &InvalidationRequest) -> String {
    let target = match &request.target {
        InvalidationTarget::Keys(keys) => {
            let mut sorted = keys.clone();
            sorted.sort();
            format!("keys:{}", sorted.join(","))
        }
        InvalidationTarget::Pattern(pattern) => format!("pattern:{pattern}"),
        InvalidationTarget::Type(cache_type) => format!("type:{cache_type}"),
    };

    format!(
        "{target}|tier={}|owner={}|cascade={}",
        request
            .cache_type
            .map(|t| t.to_string())
            .unwrap_or_default(),
        request.owner.as_deref().unwrap_or_default(),
        request.cascade
    )
}
