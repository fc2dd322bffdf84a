//! Key-relationship index.
//!
//! Process-wide mapping from key to the set of keys it relates to, held
//! only in memory and rebuilt from scratch on restart. It is a cache of
//! cache topology, not source of truth: writes from other processes are
//! allowed to leave it slightly stale.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Bidirectional key-relationship map. Mutated only by the cache manager;
/// read by the inspector.
#[derive(Debug, Default)]
pub struct KeyRelationshipIndex {
    relations: RwLock<HashMap<String, HashSet<String>>>,
}

impl KeyRelationshipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` relates to each entry in `related`, in both
    /// directions.
    pub fn record(&self, key: &str, related: &[String]) {
        if related.is_empty() {
            return;
        }

        let mut relations = self.relations.write();
        for other in related {
            if other == key {
                continue;
            }
            relations
                .entry(key.to_string())
                .or_default()
                .insert(other.clone());
            relations
                .entry(other.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Drop a key and every back-reference to it.
    pub fn remove(&self, key: &str) {
        let mut relations = self.relations.write();
        let Some(related) = relations.remove(key) else {
            return;
        };

        for other in related {
            if let Some(set) = relations.get_mut(&other) {
                set.remove(key);
                if set.is_empty() {
                    relations.remove(&other);
                }
            }
        }
    }

    /// Keys related to `key`, sorted for deterministic traversal.
    pub fn related_of(&self, key: &str) -> Vec<String> {
        let relations = self.relations.read();
        let mut related: Vec<String> = relations
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        related.sort();
        related
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.relations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.read().is_empty()
    }

    /// Forget everything. Used when a process restarts its cache wholesale.
    pub fn clear(&self) {
        self.relations.write().clear();
    }
}
