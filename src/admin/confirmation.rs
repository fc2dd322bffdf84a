//! Confirmation-token workflow for destructive operations.
//!
//! A token is minted when a destructive operation is requested without one,
//! bound to a fingerprint of that logical operation, and redeemable exactly
//! once within a short window. Tokens live in process memory: they die with
//! the process, matching the restart semantics of the relationship index.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
struct PendingOperation {
    fingerprint: String,
    expires_at: DateTime<Utc>,
}

/// TTL'd single-use token table.
#[derive(Debug)]
pub struct ConfirmationTokenStore {
    window: Duration,
    pending: RwLock<HashMap<String, PendingOperation>>,
}

impl ConfirmationTokenStore {
    /// Build a store whose tokens expire after `window`.
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(300)),
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a token for the operation described by `fingerprint`.
    pub fn mint(&self, fingerprint: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut pending = self.pending.write();
        pending.retain(|_, op| op.expires_at > now);
        pending.insert(
            token.clone(),
            PendingOperation {
                fingerprint: fingerprint.to_string(),
                expires_at: now + self.window,
            },
        );

        token
    }

    /// Redeem a token for the operation described by `fingerprint`.
    ///
    /// Consumes the token on success. A token presented for a different
    /// operation is rejected without being consumed; an expired or unknown
    /// token is rejected outright.
    pub fn consume(&self, token: &str, fingerprint: &str) -> Result<()> {
        let mut pending = self.pending.write();

        let Some(operation) = pending.get(token) else {
            return Err(CacheError::ConfirmationInvalid(
                "token does not match a pending operation".to_string(),
            ));
        };

        if operation.expires_at <= Utc::now() {
            pending.remove(token);
            return Err(CacheError::ConfirmationInvalid(
                "token has expired".to_string(),
            ));
        }

        if operation.fingerprint != fingerprint {
            return Err(CacheError::ConfirmationInvalid(
                "token was minted for a different operation".to_string(),
            ));
        }

        pending.remove(token);
        Ok(())
    }

    /// Number of live pending operations.
    pub fn pending_count(&self) -> usize {
        let now = Utc::now();
        self.pending
            .read()
            .values()
            .filter(|op| op.expires_at > now)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn token_redeems_exactly_once() {
        let store = ConfirmationTokenStore::new(StdDuration::from_secs(60));
        let token = store.mint("clear:memory");

        assert!(store.consume(&token, "clear:memory").is_ok());
        assert!(matches!(
            store.consume(&token, "clear:memory"),
            Err(CacheError::ConfirmationInvalid(_))
        ));
    }

    #[test]
    fn token_for_a_different_operation_is_rejected_but_kept() {
        let store = ConfirmationTokenStore::new(StdDuration::from_secs(60));
        let token = store.mint("clear:memory");

        assert!(store.consume(&token, "clear:persisted").is_err());
        // Still redeemable for the operation it was minted for.
        assert!(store.consume(&token, "clear:memory").is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let store = ConfirmationTokenStore::new(StdDuration::from_secs(0));
        let token = store.mint("clear:memory");

        assert!(matches!(
            store.consume(&token, "clear:memory"),
            Err(CacheError::ConfirmationInvalid(_))
        ));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = ConfirmationTokenStore::new(StdDuration::from_secs(60));
        assert!(store.consume("not-a-token", "clear:memory").is_err());
    }

    #[test]
    fn minting_purges_expired_tokens() {
        let store = ConfirmationTokenStore::new(StdDuration::from_secs(0));
        store.mint("a");
        store.mint("b");
        assert_eq!(store.pending_count(), 0);
    }
}
