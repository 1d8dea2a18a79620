//! Per-namespace access resolution
//!
//! Issues one authorization rules query per candidate namespace and turns
//! the answers into a [`NamespaceIndex`] covering every registered kind.
//! The cost is one round trip per namespace however many kinds exist.
//!
//! Resolution is all-or-nothing: if any namespace's query fails, the whole
//! resolve fails and nothing is returned. Authorization data built from a
//! partial view would silently under- or over-grant later lookups.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crossns_common::{Error, PrincipalKey, ResourceRegistry, Result, UserPrincipal};

use crate::rules::{permits, ResourceRule};

/// Default bound on concurrent rules queries within one resolve
pub const DEFAULT_MAX_CONCURRENT_RULE_QUERIES: usize = 16;

/// Issues "what can I do here" queries on behalf of one principal
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationClient: Send + Sync {
    /// Return the principal's resource rules in `namespace`
    async fn query_rules(&self, namespace: &str) -> Result<Vec<ResourceRule>>;
}

/// Builds an [`AuthorizationClient`] scoped to a principal
#[cfg_attr(test, mockall::automock)]
pub trait AuthorizationClientProvider: Send + Sync {
    /// Create a client that queries as `principal`
    fn get(&self, principal: &UserPrincipal) -> Result<Arc<dyn AuthorizationClient>>;
}

/// Kind label → namespaces granting `list` and `get`, for one principal
///
/// Every registered kind is present, possibly with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceIndex {
    by_kind: BTreeMap<&'static str, Vec<String>>,
}

impl NamespaceIndex {
    /// An index with an empty list for every registered kind
    pub fn empty(registry: &ResourceRegistry) -> Self {
        Self {
            by_kind: registry.iter().map(|k| (k.kind, Vec::new())).collect(),
        }
    }

    /// Namespaces granting access to `kind`, if the kind is indexed
    pub fn namespaces(&self, kind: &str) -> Option<&[String]> {
        self.by_kind.get(kind).map(Vec::as_slice)
    }

    /// Iterate over (kind, namespaces) pairs in kind order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        self.by_kind.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Number of indexed kinds
    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    /// Whether no kinds are indexed
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    fn grant(&mut self, kind: &'static str, namespace: &str) {
        if let Some(namespaces) = self.by_kind.get_mut(kind) {
            namespaces.push(namespace.to_string());
        }
    }
}

impl IntoIterator for NamespaceIndex {
    type Item = (&'static str, Vec<String>);
    type IntoIter = std::collections::btree_map::IntoIter<&'static str, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_kind.into_iter()
    }
}

/// Resolves which namespaces grant each registered kind
pub struct NamespaceAccessResolver {
    registry: Arc<ResourceRegistry>,
    max_concurrent: usize,
    query_timeout: Option<Duration>,
}

impl NamespaceAccessResolver {
    /// Create a resolver for the given registry
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            max_concurrent: DEFAULT_MAX_CONCURRENT_RULE_QUERIES,
            query_timeout: None,
        }
    }

    /// Bound the number of in-flight rules queries (minimum 1)
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Deadline applied to each rules query
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// The registry this resolver indexes
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Query every namespace and index the kinds each one grants
    ///
    /// Namespaces appear in each kind's list in the order they were
    /// supplied, regardless of the order queries complete in.
    #[instrument(
        skip(self, principal, client, namespaces),
        fields(principal = %principal, namespaces = namespaces.len())
    )]
    pub async fn resolve(
        &self,
        principal: &PrincipalKey,
        client: &dyn AuthorizationClient,
        namespaces: &[String],
    ) -> Result<NamespaceIndex> {
        let reviewed: Vec<(String, Vec<ResourceRule>)> =
            stream::iter(namespaces.iter().cloned())
                .map(|namespace| self.query_in(principal, client, namespace))
                .buffered(self.max_concurrent)
                .try_collect()
                .await?;

        let mut index = NamespaceIndex::empty(&self.registry);
        for (namespace, rules) in &reviewed {
            for kind in self.registry.iter() {
                if permits(rules, kind) {
                    index.grant(kind.kind, namespace);
                }
            }
        }

        debug!(
            kinds = index.len(),
            granted = index.iter().map(|(_, ns)| ns.len()).sum::<usize>(),
            "Resolved namespace access"
        );
        Ok(index)
    }

    async fn query_in(
        &self,
        principal: &PrincipalKey,
        client: &dyn AuthorizationClient,
        namespace: String,
    ) -> Result<(String, Vec<ResourceRule>)> {
        match self.query(client, &namespace).await {
            Ok(rules) => Ok((namespace, rules)),
            Err(e) => Err(query_error(&namespace, principal, e)),
        }
    }

    async fn query(
        &self,
        client: &dyn AuthorizationClient,
        namespace: &str,
    ) -> Result<Vec<ResourceRule>> {
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, client.query_rules(namespace))
                .await
                .map_err(|_| Error::timeout("rules query", namespace, limit))?,
            None => client.query_rules(namespace).await,
        }
    }
}

/// Normalize any failure into an authorization query error for `namespace`
fn query_error(namespace: &str, principal: &PrincipalKey, err: Error) -> Error {
    match err {
        Error::AuthorizationQuery { .. } | Error::Timeout { .. } => {
            err.for_principal(principal.short())
        }
        other => Error::AuthorizationQuery {
            namespace: namespace.to_string(),
            principal: principal.short().to_string(),
            message: other.to_string(),
        },
    }
}
