//! Public API checks for the shared types

use crossns_common::registry::{CAPI_TEMPLATE, GITOPS_TEMPLATE};
use crossns_common::{Error, RequiredResourceKind, ResourceRegistry, UserPrincipal};

#[test]
fn default_registry_serves_both_template_kinds() {
    let registry = ResourceRegistry::default();

    assert_eq!(registry.len(), 2);
    let gitops = registry.get("GitOpsTemplate").unwrap();
    assert_eq!(gitops, &GITOPS_TEMPLATE);
    assert_eq!(gitops.api_version(), "templates.weave.works/v1alpha2");
    assert_eq!(registry.get("CAPITemplate").unwrap().resource, CAPI_TEMPLATE.resource);
    assert!(!registry.contains("Gadget"));
}

#[test]
fn duplicate_kind_labels_are_rejected() {
    let first = RequiredResourceKind::new("Widget", "example.io", "v1", "widgets");
    let second = RequiredResourceKind::new("Widget", "other.io", "v1", "widgets");

    let err = ResourceRegistry::new([first, second]).unwrap_err();
    assert!(matches!(err, Error::Registry { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn principal_key_tracks_every_identity_field() {
    let base = UserPrincipal::new("alice", vec!["devs".into()]).with_token("t1");
    let same = UserPrincipal::new("alice", vec!["devs".into()]).with_token("t1");
    let other_token = UserPrincipal::new("alice", vec!["devs".into()]).with_token("t2");
    let other_groups = UserPrincipal::new("alice", vec!["ops".into()]).with_token("t1");

    assert_eq!(base.cache_key(), same.cache_key());
    assert_ne!(base.cache_key(), other_token.cache_key());
    assert_ne!(base.cache_key(), other_groups.cache_key());
    assert_eq!(base.cache_key().to_string(), base.cache_key().short());
}
