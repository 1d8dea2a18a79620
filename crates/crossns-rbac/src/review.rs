//! Production authorization client backed by `SelfSubjectRulesReview`
//!
//! The provider clones a base client configuration and impersonates the
//! principal's user and groups, so every review reports the rules the
//! caller holds rather than those of the service account.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::authorization::v1::{SelfSubjectRulesReview, SelfSubjectRulesReviewSpec};
use kube::api::PostParams;
use kube::{Api, Client, Config};
use tracing::warn;

use crossns_common::{Error, Result, UserPrincipal};

use crate::resolver::{AuthorizationClient, AuthorizationClientProvider};
use crate::rules::ResourceRule;

/// Queries resource rules through the API server's rules review endpoint
#[derive(Clone)]
pub struct RulesReviewClient {
    client: Client,
}

impl RulesReviewClient {
    /// Wrap a client already authenticated as the principal
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthorizationClient for RulesReviewClient {
    async fn query_rules(&self, namespace: &str) -> Result<Vec<ResourceRule>> {
        let api: Api<SelfSubjectRulesReview> = Api::all(self.client.clone());
        let review = SelfSubjectRulesReview {
            spec: SelfSubjectRulesReviewSpec {
                namespace: Some(namespace.to_string()),
            },
            ..Default::default()
        };

        let review = api
            .create(&PostParams::default(), &review)
            .await
            .map_err(|e| Error::authorization_query(namespace, e.to_string()))?;

        let Some(status) = review.status else {
            return Err(Error::authorization_query(
                namespace,
                "rules review returned no status",
            ));
        };

        if status.incomplete {
            warn!(
                namespace,
                evaluation_error = status.evaluation_error.as_deref().unwrap_or_default(),
                "Rules review incomplete, access may be under-reported"
            );
        } else if let Some(evaluation_error) = status.evaluation_error.as_deref() {
            warn!(namespace, evaluation_error, "Rules review reported an evaluation error");
        }

        Ok(status
            .resource_rules
            .into_iter()
            .map(ResourceRule::from)
            .collect())
    }
}

/// Builds [`RulesReviewClient`]s that impersonate each principal
pub struct ImpersonatingAuthProvider {
    base: Config,
}

impl ImpersonatingAuthProvider {
    /// Create a provider from the service's own client configuration
    pub fn new(base: Config) -> Self {
        Self { base }
    }
}

impl AuthorizationClientProvider for ImpersonatingAuthProvider {
    fn get(&self, principal: &UserPrincipal) -> Result<Arc<dyn AuthorizationClient>> {
        let config = impersonation_config(&self.base, principal);
        let client = Client::try_from(config).map_err(|e| {
            Error::authorization_client(principal.cache_key().short(), e.to_string())
        })?;
        Ok(Arc::new(RulesReviewClient::new(client)))
    }
}

fn impersonation_config(base: &Config, principal: &UserPrincipal) -> Config {
    let mut config = base.clone();
    config.auth_info.impersonate = Some(principal.id.clone());
    config.auth_info.impersonate_groups =
        (!principal.groups.is_empty()).then(|| principal.groups.clone());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config::new("https://cluster.example.invalid".parse().unwrap())
    }

    #[test]
    fn test_impersonates_user_and_groups() {
        let principal = UserPrincipal::new("alice", vec!["devs".into(), "ops".into()]);
        let config = impersonation_config(&base(), &principal);

        assert_eq!(config.auth_info.impersonate.as_deref(), Some("alice"));
        assert_eq!(
            config.auth_info.impersonate_groups,
            Some(vec!["devs".to_string(), "ops".to_string()])
        );
    }

    #[test]
    fn test_no_groups_leaves_group_impersonation_unset() {
        let principal = UserPrincipal::new("bob", vec![]);
        let config = impersonation_config(&base(), &principal);

        assert_eq!(config.auth_info.impersonate.as_deref(), Some("bob"));
        assert!(config.auth_info.impersonate_groups.is_none());
    }

    #[test]
    fn test_base_config_is_not_mutated() {
        let base = base();
        let _ = impersonation_config(&base, &UserPrincipal::new("carol", vec!["x".into()]));
        assert!(base.auth_info.impersonate.is_none());
        assert!(base.auth_info.impersonate_groups.is_none());
    }
}
