//! RBAC-scoped cross-namespace listing
//!
//! [`CrossNamespaceFetcher`] answers "list every `<kind>` this user may
//! read" by combining the per-principal authorization cache from
//! `crossns-rbac` with a concurrent per-namespace fan-out.
//!
//! ```text
//! fetch(ctx, kind, new_list)
//!   ├─ NamespaceLister snapshot
//!   ├─ cache hit?            ─▶ permitted namespaces
//!   └─ miss ─▶ principal lock ─▶ build from snapshot ─▶ permitted namespaces
//!        ─▶ JoinSet: KubernetesClient::list per namespace ─▶ Vec<NamespacedResult<L>>
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod context;
pub mod fetcher;
pub mod locks;
pub mod namespaces;
pub mod objects;

pub use config::FetcherConfig;
pub use context::RequestContext;
pub use fetcher::{CrossNamespaceFetcher, NamespacedResult};
pub use locks::PrincipalLocks;
pub use namespaces::{NamespaceLister, ReflectorNamespaceLister, StaticNamespaceLister};
pub use objects::{DynamicObjectClient, KubernetesClient, ObjectList, TypedList};
