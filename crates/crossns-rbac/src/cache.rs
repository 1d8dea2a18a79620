//! Per-principal namespace authorization cache
//!
//! Rows are keyed by (principal key, kind label) and expire a fixed TTL
//! after insertion. Expiry is enforced on read, so a row past its deadline
//! is reported absent even before a sweep physically removes it.
//!
//! A build writes every registered kind for a principal under one map
//! entry guard, or writes nothing when resolution fails. Readers therefore
//! never observe a partially built index.

use std::collections::HashMap;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crossns_common::{PrincipalKey, ResourceRegistry, Result};

use crate::resolver::{AuthorizationClient, NamespaceAccessResolver};

/// Default lifetime of a cached row
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default interval between sweeps of expired rows
pub const DEFAULT_RESOLUTION_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    namespaces: Vec<String>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL cache of the namespaces each principal may read, per kind
pub struct UserNamespaceCache {
    entries: DashMap<PrincipalKey, HashMap<String, CacheEntry>>,
    resolver: NamespaceAccessResolver,
    ttl: Duration,
}

impl UserNamespaceCache {
    /// Create an empty cache backed by `resolver`
    pub fn new(resolver: NamespaceAccessResolver, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            resolver,
            ttl,
        }
    }

    /// The registry whose kinds this cache holds
    pub fn registry(&self) -> &ResourceRegistry {
        self.resolver.registry()
    }

    /// Row lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Namespaces `principal` may read `kind` in, if a live row exists
    pub fn get(&self, principal: &PrincipalKey, kind: &str) -> Option<Vec<String>> {
        let rows = self.entries.get(principal)?;
        let entry = rows.get(kind)?;
        if entry.is_live(Instant::now()) {
            Some(entry.namespaces.clone())
        } else {
            None
        }
    }

    /// Insert or overwrite one row, expiring `ttl` from now
    pub fn set(&self, principal: &PrincipalKey, kind: &str, namespaces: Vec<String>) {
        let expires_at = Instant::now() + self.ttl;
        self.entries.entry(principal.clone()).or_default().insert(
            kind.to_string(),
            CacheEntry {
                namespaces,
                expires_at,
            },
        );
    }

    /// Resolve access for every registered kind and cache all of them
    ///
    /// On failure the cache is left exactly as it was.
    #[instrument(skip(self, principal, client, namespaces), fields(principal = %principal))]
    pub async fn build(
        &self,
        principal: &PrincipalKey,
        client: &dyn AuthorizationClient,
        namespaces: &[String],
    ) -> Result<()> {
        let index = self.resolver.resolve(principal, client, namespaces).await?;

        let expires_at = Instant::now() + self.ttl;
        let kinds = index.len();
        let mut rows = self.entries.entry(principal.clone()).or_default();
        for (kind, namespaces) in index {
            rows.insert(
                kind.to_string(),
                CacheEntry {
                    namespaces,
                    expires_at,
                },
            );
        }
        drop(rows);

        info!(kinds, candidates = namespaces.len(), "Cached namespace access");
        Ok(())
    }

    /// Drop every row for `principal`
    pub fn invalidate(&self, principal: &PrincipalKey) -> bool {
        let removed = self.entries.remove(principal).is_some();
        if removed {
            debug!(principal = %principal, "Invalidated cached namespace access");
        }
        removed
    }

    /// Physically remove expired rows, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.entries.retain(|_, rows| {
            let before = rows.len();
            rows.retain(|_, entry| entry.is_live(now));
            evicted += before - rows.len();
            !rows.is_empty()
        });
        evicted
    }

    /// Whether any row, live or expired, is held for `principal`
    pub fn contains_principal(&self, principal: &PrincipalKey) -> bool {
        self.entries.contains_key(principal)
    }

    /// Number of rows held, including expired rows not yet swept
    pub fn len(&self) -> usize {
        self.entries.iter().map(|rows| rows.len()).sum()
    }

    /// Whether no rows are held
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
