//! Authorization rule matching
//!
//! A namespace grants a kind only when a single rule entry covers every
//! dimension at once: both required verbs, the kind's API group, and its
//! resource name. Separate entries never combine, mirroring how RBAC
//! evaluates each PolicyRule on its own.

use crossns_common::{RequiredResourceKind, REQUIRED_VERBS, WILDCARD};
use k8s_openapi::api::authorization::v1 as authv1;

/// One grant returned by an authorization rules review
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRule {
    /// Allowed verbs (e.g., "get", "list", "*")
    pub verbs: Vec<String>,
    /// API groups the rule applies to ("" is the core group)
    pub api_groups: Vec<String>,
    /// Resource names the rule applies to (plural, e.g., "widgets")
    pub resources: Vec<String>,
    /// Object names the rule is restricted to; empty means all objects
    pub resource_names: Vec<String>,
}

impl ResourceRule {
    /// Build a rule from string slices
    pub fn new(verbs: &[&str], api_groups: &[&str], resources: &[&str]) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            verbs: owned(verbs),
            api_groups: owned(api_groups),
            resources: owned(resources),
            resource_names: Vec::new(),
        }
    }

    /// Restrict the rule to named objects
    pub fn with_resource_names(mut self, names: &[&str]) -> Self {
        self.resource_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether this single entry grants read access to the kind's collection
    pub fn grants(&self, target: &RequiredResourceKind) -> bool {
        // a get/list limited to named objects cannot list the collection
        if !self.resource_names.is_empty() {
            return false;
        }
        REQUIRED_VERBS.iter().all(|verb| matches(&self.verbs, verb))
            && matches(&self.api_groups, target.group)
            && matches(&self.resources, target.resource)
    }
}

impl From<authv1::ResourceRule> for ResourceRule {
    fn from(rule: authv1::ResourceRule) -> Self {
        Self {
            verbs: rule.verbs,
            api_groups: rule.api_groups.unwrap_or_default(),
            resources: rule.resources.unwrap_or_default(),
            resource_names: rule.resource_names.unwrap_or_default(),
        }
    }
}

/// Whether any entry in `rules` grants `list` and `get` on `target`
pub fn permits(rules: &[ResourceRule], target: &RequiredResourceKind) -> bool {
    rules.iter().any(|rule| rule.grants(target))
}

/// Exact, case-sensitive membership or the wildcard
fn matches(values: &[String], wanted: &str) -> bool {
    values.iter().any(|v| v == WILDCARD || v == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET: RequiredResourceKind =
        RequiredResourceKind::new("Widget", "example.io", "v1", "widgets");
    const CONFIG_MAP: RequiredResourceKind =
        RequiredResourceKind::new("ConfigMap", "", "v1", "configmaps");

    #[test]
    fn test_exact_rule_permits() {
        let rules = vec![ResourceRule::new(
            &["list", "get"],
            &["example.io"],
            &["widgets"],
        )];
        assert!(permits(&rules, &WIDGET));
    }

    #[test]
    fn test_full_wildcard_permits_every_kind() {
        let rules = vec![ResourceRule::new(&["*"], &["*"], &["*"])];
        assert!(permits(&rules, &WIDGET));
        assert!(permits(&rules, &CONFIG_MAP));
        assert!(permits(&rules, &crossns_common::registry::GITOPS_TEMPLATE));
    }

    #[test]
    fn test_empty_rules_deny() {
        assert!(!permits(&[], &WIDGET));
    }

    #[test]
    fn test_split_verbs_do_not_combine() {
        let rules = vec![
            ResourceRule::new(&["list"], &["example.io"], &["widgets"]),
            ResourceRule::new(&["get"], &["example.io"], &["widgets"]),
        ];
        assert!(!permits(&rules, &WIDGET));
    }

    #[test]
    fn test_split_group_and_resource_do_not_combine() {
        let rules = vec![
            ResourceRule::new(&["list", "get"], &["example.io"], &["gadgets"]),
            ResourceRule::new(&["list", "get"], &["other.io"], &["widgets"]),
        ];
        assert!(!permits(&rules, &WIDGET));
    }

    #[test]
    fn test_wildcard_widens_only_its_dimension() {
        let verbs_only = vec![ResourceRule::new(&["*"], &["other.io"], &["widgets"])];
        assert!(!permits(&verbs_only, &WIDGET));

        let groups_only = vec![ResourceRule::new(&["list"], &["*"], &["widgets"])];
        assert!(!permits(&groups_only, &WIDGET));

        let resources_only = vec![ResourceRule::new(&["list", "get"], &["example.io"], &["*"])];
        assert!(permits(&resources_only, &WIDGET));
    }

    #[test]
    fn test_missing_verb_denies() {
        let rules = vec![ResourceRule::new(
            &["list", "watch"],
            &["example.io"],
            &["widgets"],
        )];
        assert!(!permits(&rules, &WIDGET));
    }

    #[test]
    fn test_core_group_needs_explicit_empty_group() {
        let explicit = vec![ResourceRule::new(&["get", "list"], &[""], &["configmaps"])];
        assert!(permits(&explicit, &CONFIG_MAP));

        let no_groups = vec![ResourceRule::new(&["get", "list"], &[], &["configmaps"])];
        assert!(!permits(&no_groups, &CONFIG_MAP));

        let wildcard = vec![ResourceRule::new(&["get", "list"], &["*"], &["configmaps"])];
        assert!(permits(&wildcard, &CONFIG_MAP));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let rules = vec![ResourceRule::new(
            &["LIST", "GET"],
            &["example.io"],
            &["Widgets"],
        )];
        assert!(!permits(&rules, &WIDGET));
    }

    #[test]
    fn test_order_and_duplicates_are_irrelevant() {
        let rule = ResourceRule::new(&["get", "list"], &["example.io"], &["widgets"]);
        let deny = ResourceRule::new(&["get"], &["example.io"], &["widgets"]);
        let forward = vec![deny.clone(), rule.clone()];
        let reversed = vec![rule.clone(), deny.clone()];
        let duplicated = vec![rule.clone(), rule.clone(), deny];
        assert!(permits(&forward, &WIDGET));
        assert!(permits(&reversed, &WIDGET));
        assert!(permits(&duplicated, &WIDGET));
    }

    #[test]
    fn test_resource_names_restriction_denies() {
        let rules = vec![
            ResourceRule::new(&["get", "list"], &["example.io"], &["widgets"])
                .with_resource_names(&["only-this-one"]),
        ];
        assert!(!permits(&rules, &WIDGET));
    }

    #[test]
    fn test_subresource_does_not_match_parent() {
        let rules = vec![ResourceRule::new(
            &["get", "list"],
            &["example.io"],
            &["widgets/status"],
        )];
        assert!(!permits(&rules, &WIDGET));
    }

    #[test]
    fn test_from_k8s_rule() {
        let k8s = authv1::ResourceRule {
            verbs: vec!["get".to_string(), "list".to_string()],
            api_groups: Some(vec!["example.io".to_string()]),
            resources: Some(vec!["widgets".to_string()]),
            resource_names: None,
        };
        let rule = ResourceRule::from(k8s);
        assert!(rule.resource_names.is_empty());
        assert!(rule.grants(&WIDGET));
    }
}
