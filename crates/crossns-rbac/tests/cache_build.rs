//! Resolve-and-cache flow through the public API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crossns_common::registry::{CAPI_TEMPLATE, GITOPS_TEMPLATE};
use crossns_common::{ResourceRegistry, Result, UserPrincipal};
use crossns_rbac::{
    AuthorizationClient, NamespaceAccessResolver, ResourceRule, UserNamespaceCache, DEFAULT_TTL,
};

/// Grants templates in "team-a", clusters-only access in "team-b"
struct TeamRules {
    queries: AtomicUsize,
}

#[async_trait]
impl AuthorizationClient for TeamRules {
    async fn query_rules(&self, namespace: &str) -> Result<Vec<ResourceRule>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(match namespace {
            "team-a" => vec![ResourceRule::new(
                &["get", "list"],
                &["templates.weave.works"],
                &["gitopstemplates"],
            )],
            "team-b" => vec![
                ResourceRule::new(&["list"], &["capi.weave.works"], &["capitemplates"]),
                ResourceRule::new(&["get"], &["capi.weave.works"], &["capitemplates"]),
            ],
            "admin" => vec![ResourceRule::new(&["*"], &["*"], &["*"])],
            _ => vec![],
        })
    }
}

#[tokio::test]
async fn build_caches_every_registered_kind() {
    let registry = Arc::new(ResourceRegistry::default());
    let cache = UserNamespaceCache::new(NamespaceAccessResolver::new(registry), DEFAULT_TTL);
    let key = UserPrincipal::new("alice", vec![]).cache_key();
    let client = TeamRules {
        queries: AtomicUsize::new(0),
    };
    let namespaces: Vec<String> = ["team-a", "team-b", "admin", "default"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    cache.build(&key, &client, &namespaces).await.unwrap();

    assert_eq!(
        cache.get(&key, GITOPS_TEMPLATE.kind),
        Some(vec!["team-a".to_string(), "admin".to_string()])
    );
    // split list/get grants in team-b do not combine
    assert_eq!(cache.get(&key, CAPI_TEMPLATE.kind), Some(vec!["admin".to_string()]));
    assert_eq!(client.queries.load(Ordering::SeqCst), 4);
}
