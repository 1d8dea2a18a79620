//! RBAC resolution for cross-namespace reads
//!
//! Determines, per registered resource kind, which namespaces a principal
//! may `list` and `get` in, and caches that answer per principal for a
//! bounded time.
//!
//! # Layers
//!
//! ```text
//! rules::permits          pure matching of one namespace's rules
//!   └─ NamespaceAccessResolver   one rules query per namespace → NamespaceIndex
//!        └─ UserNamespaceCache   TTL rows keyed by (principal, kind)
//! ```
//!
//! [`review`] provides the production [`AuthorizationClient`] built on
//! `SelfSubjectRulesReview` with user impersonation.

#![deny(missing_docs)]

pub mod cache;
pub mod resolver;
pub mod review;
pub mod rules;

pub use cache::{UserNamespaceCache, DEFAULT_RESOLUTION_INTERVAL, DEFAULT_TTL};
pub use resolver::{
    AuthorizationClient, AuthorizationClientProvider, NamespaceAccessResolver, NamespaceIndex,
    DEFAULT_MAX_CONCURRENT_RULE_QUERIES,
};
pub use review::{ImpersonatingAuthProvider, RulesReviewClient};
pub use rules::{permits, ResourceRule};
