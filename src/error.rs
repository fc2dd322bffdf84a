//! # Structured Error Handling
//!
//! Error taxonomy for the cache core. Only caller-facing failures are
//! represented here: malformed requests, rejected confirmation tokens, and
//! failures of the authoritative domain data source.
//!
//! Adapter-level I/O failures (persisted store unreachable, storage quota
//! exceeded) are deliberately *not* part of this taxonomy. They are caught at
//! the adapter boundary, logged, and surfaced as a cache miss or a silent
//! no-op so that cache operations can never fail a calling request.
//!
//! "Confirmation required" is likewise not an error: it is a control-flow
//! signal modeled as [`crate::admin::AdminResponse::RequiresConfirmation`].

use thiserror::Error;

/// Caller-facing errors produced by the cache core.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A request was malformed and was rejected before any side effect.
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A confirmation token did not match a pending operation, was already
    /// consumed, or its window elapsed. The operation was refused with no
    /// side effect.
    #[error("confirmation rejected: {0}")]
    ConfirmationInvalid(String),

    /// The underlying domain data source failed while computing a value for
    /// a get-or-compute helper. Unlike adapter failures, the data source is
    /// authoritative, so its failures propagate.
    #[error("data source error: {0}")]
    DataSource(String),
}

impl CacheError {
    /// Build a validation error with field-level detail.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
