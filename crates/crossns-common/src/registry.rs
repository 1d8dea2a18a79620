//! Registry of resource kinds whose cross-namespace access is managed
//!
//! The registry is fixed when it is constructed. Every kind the fetcher can
//! serve appears here, and any kind label not present is rejected.

use kube::discovery::ApiResource;
use serde::Serialize;

use crate::{Error, Result};

/// A statically registered resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequiredResourceKind {
    /// Kind label (e.g., "GitOpsTemplate")
    pub kind: &'static str,
    /// API group ("" for the core group)
    pub group: &'static str,
    /// Served API version
    pub version: &'static str,
    /// Plural resource name used in RBAC rules (e.g., "gitopstemplates")
    pub resource: &'static str,
}

impl RequiredResourceKind {
    /// Describe a registered kind
    pub const fn new(
        kind: &'static str,
        group: &'static str,
        version: &'static str,
        resource: &'static str,
    ) -> Self {
        Self {
            kind,
            group,
            version,
            resource,
        }
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Build the `ApiResource` used for dynamic listing
    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.to_string(),
            version: self.version.to_string(),
            api_version: self.api_version(),
            kind: self.kind.to_string(),
            plural: self.resource.to_string(),
        }
    }
}

/// GitOpsTemplate (templates.weave.works)
pub const GITOPS_TEMPLATE: RequiredResourceKind = RequiredResourceKind::new(
    "GitOpsTemplate",
    "templates.weave.works",
    "v1alpha2",
    "gitopstemplates",
);

/// CAPITemplate (capi.weave.works)
pub const CAPI_TEMPLATE: RequiredResourceKind =
    RequiredResourceKind::new("CAPITemplate", "capi.weave.works", "v1alpha2", "capitemplates");

/// Kinds registered when no explicit registry is supplied
const DEFAULT_KINDS: &[RequiredResourceKind] = &[GITOPS_TEMPLATE, CAPI_TEMPLATE];

/// Immutable set of registered kinds, looked up by kind label
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    kinds: Vec<RequiredResourceKind>,
}

impl ResourceRegistry {
    /// Build a registry, rejecting duplicate kind labels
    pub fn new(kinds: impl IntoIterator<Item = RequiredResourceKind>) -> Result<Self> {
        let mut registered: Vec<RequiredResourceKind> = Vec::new();
        for kind in kinds {
            if registered.iter().any(|k| k.kind == kind.kind) {
                return Err(Error::registry(format!(
                    "kind {} registered more than once",
                    kind.kind
                )));
            }
            registered.push(kind);
        }
        Ok(Self { kinds: registered })
    }

    /// Look up a kind by label (case-sensitive)
    pub fn get(&self, kind: &str) -> Option<&RequiredResourceKind> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    /// Whether a kind label is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.get(kind).is_some()
    }

    /// Registered kinds in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RequiredResourceKind> {
        self.kinds.iter()
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the registry has no kinds
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self {
            kinds: DEFAULT_KINDS.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET: RequiredResourceKind =
        RequiredResourceKind::new("Widget", "example.io", "v1", "widgets");

    #[test]
    fn test_default_registry_has_templates() {
        let registry = ResourceRegistry::default();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("GitOpsTemplate"));
        assert!(registry.contains("CAPITemplate"));
        assert!(!registry.contains("Gadget"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = ResourceRegistry::new([WIDGET]).unwrap();
        assert!(registry.get("Widget").is_some());
        assert!(registry.get("widget").is_none());
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let err = ResourceRegistry::new([WIDGET, WIDGET]).unwrap_err();
        assert!(matches!(err, Error::Registry { .. }));
    }

    #[test]
    fn test_api_resource_for_group_kind() {
        let ar = WIDGET.api_resource();
        assert_eq!(ar.api_version, "example.io/v1");
        assert_eq!(ar.plural, "widgets");
        assert_eq!(ar.kind, "Widget");
    }

    #[test]
    fn test_api_version_for_core_group() {
        let config_map = RequiredResourceKind::new("ConfigMap", "", "v1", "configmaps");
        assert_eq!(config_map.api_version(), "v1");
        assert_eq!(config_map.api_resource().group, "");
    }

    #[test]
    fn test_kind_serializes() {
        let json = serde_json::to_value(WIDGET).unwrap();
        assert_eq!(json["resource"], "widgets");
    }
}
