//! Cross-namespace fetch orchestration
//!
//! A fetch resolves which namespaces the caller may read the requested kind
//! in, then lists that kind in every one of them concurrently and returns
//! one [`NamespacedResult`] per namespace. Per-namespace failures, a
//! panicked list task included, are attached to their result; only
//! failures that leave no usable data
//! (namespace listing, authorization, an unknown kind, cancellation) fail
//! the whole fetch.
//!
//! Authorization answers are cached per principal. Concurrent fetches for
//! an uncached principal serialize on that principal's lock, so exactly one
//! of them builds the cache row and the rest reuse it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crossns_common::{Error, PrincipalKey, RequiredResourceKind, ResourceRegistry, Result};
use crossns_rbac::{AuthorizationClientProvider, NamespaceAccessResolver, UserNamespaceCache};

use crate::config::FetcherConfig;
use crate::context::RequestContext;
use crate::locks::PrincipalLocks;
use crate::namespaces::NamespaceLister;
use crate::objects::{KubernetesClient, ObjectList};

/// Outcome of listing one kind in one namespace
#[derive(Debug)]
pub struct NamespacedResult<L> {
    /// Namespace the list ran in
    pub namespace: String,
    /// Objects listed; may be incomplete when `error` is set
    pub list: L,
    /// Why this namespace contributed nothing
    pub error: Option<Error>,
}

impl<L> NamespacedResult<L> {
    /// Whether the list succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Lists a registered kind across every namespace a principal may read
pub struct CrossNamespaceFetcher {
    cache: UserNamespaceCache,
    locks: PrincipalLocks,
    namespaces: Arc<dyn NamespaceLister>,
    auth: Arc<dyn AuthorizationClientProvider>,
    kube: Arc<dyn KubernetesClient>,
    config: FetcherConfig,
}

impl CrossNamespaceFetcher {
    /// Create a fetcher with its own empty cache
    pub fn new(
        config: FetcherConfig,
        registry: Arc<ResourceRegistry>,
        namespaces: Arc<dyn NamespaceLister>,
        auth: Arc<dyn AuthorizationClientProvider>,
        kube: Arc<dyn KubernetesClient>,
    ) -> Result<Self> {
        config.validate()?;
        let resolver = NamespaceAccessResolver::new(registry)
            .with_max_concurrent(config.max_concurrent_rule_queries)
            .with_query_timeout(config.rules_query_timeout);
        let cache = UserNamespaceCache::new(resolver, config.cache_ttl);

        Ok(Self {
            cache,
            locks: PrincipalLocks::new(),
            namespaces,
            auth,
            kube,
            config,
        })
    }

    /// The authorization cache
    pub fn cache(&self) -> &UserNamespaceCache {
        &self.cache
    }

    /// Number of principals with a lock entry
    pub fn tracked_principals(&self) -> usize {
        self.locks.len()
    }

    /// List `kind` in every namespace the caller may read it in
    ///
    /// `new_list` is called once per permitted namespace to produce the
    /// collection that namespace's objects are loaded into.
    #[instrument(
        skip(self, ctx, kind, new_list),
        fields(principal = %ctx.principal_key(), kind = %kind)
    )]
    pub async fn fetch<L, F>(
        &self,
        ctx: &RequestContext,
        kind: &str,
        new_list: F,
    ) -> Result<Vec<NamespacedResult<L>>>
    where
        L: ObjectList,
        F: Fn() -> L + Send + Sync,
    {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let target = *self
            .cache
            .registry()
            .get(kind)
            .ok_or_else(|| Error::unsupported_kind(kind))?;

        let permitted = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(Error::Cancelled),
            permitted = self.permitted_namespaces(ctx, kind) => permitted?,
        };

        if permitted.is_empty() {
            debug!("No namespaces grant access");
            return Ok(Vec::new());
        }

        self.list_all(ctx, target, permitted, new_list).await
    }

    /// Drop all cached authorization for `principal`
    pub fn invalidate(&self, principal: &PrincipalKey) -> bool {
        self.cache.invalidate(principal)
    }

    /// Sweep expired rows and idle locks every `resolution_interval`
    ///
    /// Runs until `cancel` fires.
    pub async fn run_maintenance(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.resolution_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Maintenance loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let (evicted, pruned) = self.maintain();
                    if evicted > 0 || pruned > 0 {
                        info!(evicted, pruned, cached = self.cache.len(), "Swept authorization cache");
                    }
                }
            }
        }
    }

    /// One maintenance pass: evict expired rows, then prune idle locks
    fn maintain(&self) -> (usize, usize) {
        let evicted = self.cache.evict_expired();
        let pruned = self
            .locks
            .prune_idle(|key| self.cache.contains_principal(key));
        (evicted, pruned)
    }

    /// Cached namespaces for (principal, kind), building the row on a miss
    ///
    /// The cluster's namespaces are listed on every call, before the cache
    /// is consulted; a miss builds from that snapshot.
    async fn permitted_namespaces(&self, ctx: &RequestContext, kind: &str) -> Result<Vec<String>> {
        let candidates = self.namespaces.list().await?;

        let key = ctx.principal_key();
        if let Some(namespaces) = self.cache.get(key, kind) {
            debug!(count = namespaces.len(), "Authorization cache hit");
            return Ok(namespaces);
        }

        let lock = self.locks.lock_for(key);
        let _guard = lock.lock().await;

        // a caller holding the lock before us may have built the row
        if let Some(namespaces) = self.cache.get(key, kind) {
            debug!(count = namespaces.len(), "Authorization cache filled while waiting");
            return Ok(namespaces);
        }

        debug!(candidates = candidates.len(), "Authorization cache miss");
        let client = self.auth.get(ctx.principal())?;
        self.cache.build(key, client.as_ref(), &candidates).await?;

        self.cache
            .get(key, kind)
            .ok_or_else(|| Error::unsupported_kind(kind))
    }

    /// Fan out one list per namespace and gather every result
    async fn list_all<L, F>(
        &self,
        ctx: &RequestContext,
        target: RequiredResourceKind,
        permitted: Vec<String>,
        new_list: F,
    ) -> Result<Vec<NamespacedResult<L>>>
    where
        L: ObjectList,
        F: Fn() -> L + Send + Sync,
    {
        let mut tasks = JoinSet::new();
        let mut spawned = HashMap::with_capacity(permitted.len());
        for namespace in permitted {
            let handle = tasks.spawn(list_namespace(
                Arc::clone(&self.kube),
                target,
                namespace.clone(),
                new_list(),
                self.config.list_timeout,
            ));
            spawned.insert(handle.id(), namespace);
        }

        let mut results = Vec::with_capacity(tasks.len());
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    debug!(pending = tasks.len(), "Fetch cancelled, aborting lists");
                    return Err(Error::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(result)) => results.push(result),
                    Some(Err(e)) => {
                        let namespace = spawned.remove(&e.id()).ok_or_else(|| {
                            Error::internal_with_context(
                                "fetch",
                                format!("untracked list task failed: {e}"),
                            )
                        })?;
                        warn!(
                            namespace = %namespace,
                            kind = target.kind,
                            error = %e,
                            "Namespace list task failed"
                        );
                        let error = Error::namespace_fetch(
                            namespace.as_str(),
                            target.kind,
                            format!("list task failed: {e}"),
                        );
                        results.push(NamespacedResult {
                            namespace,
                            list: new_list(),
                            error: Some(error),
                        });
                    }
                    None => break,
                }
            }
        }

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        debug!(namespaces = results.len(), failed, "Fetch complete");
        Ok(results)
    }
}

async fn list_namespace<L: ObjectList>(
    client: Arc<dyn KubernetesClient>,
    kind: RequiredResourceKind,
    namespace: String,
    mut list: L,
    timeout: Option<Duration>,
) -> NamespacedResult<L> {
    let listed = match timeout {
        Some(limit) => tokio::time::timeout(limit, client.list(&namespace, &kind))
            .await
            .unwrap_or_else(|_| Err(Error::timeout("list", namespace.as_str(), limit))),
        None => client.list(&namespace, &kind).await,
    };

    let error = match listed.and_then(|objects| list.extend_dynamic(objects)) {
        Ok(()) => None,
        Err(e) => {
            warn!(namespace = %namespace, kind = kind.kind, error = %e, "Namespace list failed");
            Some(match e {
                Error::NamespaceFetch { .. } | Error::Timeout { .. } => e,
                other => Error::namespace_fetch(namespace.as_str(), kind.kind, other.to_string()),
            })
        }
    };

    NamespacedResult {
        namespace,
        list,
        error,
    }
}
