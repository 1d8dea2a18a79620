//! Common types for crossns: principals, the resource-kind registry, errors,
//! telemetry, and Kubernetes client construction

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod principal;
pub mod registry;
pub mod telemetry;

pub use error::Error;
pub use principal::{PrincipalKey, UserPrincipal};
pub use registry::{RequiredResourceKind, ResourceRegistry};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Verbs a principal needs on a kind before its namespace is considered readable
pub const REQUIRED_VERBS: &[&str] = &["list", "get"];

/// Wildcard accepted in any rule dimension (verbs, apiGroups, resources)
pub const WILDCARD: &str = "*";
