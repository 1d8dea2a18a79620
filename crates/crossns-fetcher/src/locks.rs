//! Per-principal build locks
//!
//! Locks are created lazily with an atomic load-or-store, so racing callers
//! for the same principal always share one mutex. Pruning removes an entry
//! only while the map's shard lock is held and nobody else references the
//! mutex; a caller arriving afterwards simply creates a fresh one.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crossns_common::PrincipalKey;

/// Lazily created mutex per principal key
#[derive(Default)]
pub struct PrincipalLocks {
    locks: DashMap<PrincipalKey, Arc<Mutex<()>>>,
}

impl PrincipalLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for `key`, created on first use
    pub fn lock_for(&self, key: &PrincipalKey) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drop idle entries unless `keep` says otherwise, returning how many went
    ///
    /// An entry is idle when the table holds the only reference to it.
    pub fn prune_idle(&self, mut keep: impl FnMut(&PrincipalKey) -> bool) -> usize {
        let before = self.locks.len();
        self.locks
            .retain(|key, lock| Arc::strong_count(lock) > 1 || keep(key));
        before.saturating_sub(self.locks.len())
    }

    /// Number of tracked principals
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no principal has a lock entry
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
