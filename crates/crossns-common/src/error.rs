//! Error types for crossns
//!
//! Errors are structured with fields to aid debugging in production. Each
//! variant carries the namespace, kind, or principal reference it concerns.
//! Principal references are always the shortened cache key, never a token.

use std::time::Duration;

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for crossns operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error outside of a specific namespace operation
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The namespace lister could not produce the cluster's namespaces
    #[error("failed to list namespaces: {message}")]
    NamespaceList {
        /// Description of what failed
        message: String,
    },

    /// An authorization client could not be constructed for a principal
    #[error("failed to build authorization client for principal {principal}: {message}")]
    AuthorizationClient {
        /// Short principal reference
        principal: String,
        /// Description of what failed
        message: String,
    },

    /// An authorization rules round trip failed while resolving access
    #[error("authorization query failed in namespace {namespace} for principal {principal}: {message}")]
    AuthorizationQuery {
        /// Namespace the query was scoped to
        namespace: String,
        /// Short principal reference
        principal: String,
        /// Description of what failed
        message: String,
    },

    /// The requested kind is not in the resource registry
    #[error("unsupported resource kind: {kind}")]
    UnsupportedResourceKind {
        /// Kind label that was requested
        kind: String,
    },

    /// Listing a kind in one namespace failed
    #[error("failed to list {kind} in namespace {namespace}: {message}")]
    NamespaceFetch {
        /// Namespace the list was scoped to
        namespace: String,
        /// Kind label being listed
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// A configured deadline elapsed
    #[error("{operation} timed out after {elapsed:?} in namespace {namespace}")]
    Timeout {
        /// Operation that timed out (e.g., "rules query", "list")
        operation: String,
        /// Namespace the operation was scoped to
        namespace: String,
        /// The configured deadline
        elapsed: Duration,
    },

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Invalid resource registry
    #[error("registry error: {message}")]
    Registry {
        /// Description of what's invalid
        message: String,
    },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "fetch", "sweeper")
        context: String,
    },
}

impl Error {
    /// Create a namespace list error
    pub fn namespace_list(msg: impl Into<String>) -> Self {
        Self::NamespaceList {
            message: msg.into(),
        }
    }

    /// Create an authorization client error for a principal
    pub fn authorization_client(principal: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AuthorizationClient {
            principal: principal.into(),
            message: msg.into(),
        }
    }

    /// Create an authorization query error without principal context
    ///
    /// Collaborators return this; the resolver fills in the principal.
    pub fn authorization_query(namespace: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AuthorizationQuery {
            namespace: namespace.into(),
            principal: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create an unsupported kind error
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedResourceKind { kind: kind.into() }
    }

    /// Create a per-namespace fetch error
    pub fn namespace_fetch(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::NamespaceFetch {
            namespace: namespace.into(),
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, namespace: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            namespace: namespace.into(),
            elapsed,
        }
    }

    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry {
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Attach a principal reference to an authorization query error
    ///
    /// Other variants pass through unchanged except timeouts, which become
    /// authorization query failures for the namespace they occurred in.
    pub fn for_principal(self, principal: &str) -> Self {
        match self {
            Self::AuthorizationQuery {
                namespace, message, ..
            } => Self::AuthorizationQuery {
                namespace,
                principal: principal.to_string(),
                message,
            },
            Self::Timeout {
                operation,
                namespace,
                elapsed,
            } => Self::AuthorizationQuery {
                namespace,
                principal: principal.to_string(),
                message: format!("{operation} timed out after {elapsed:?}"),
            },
            other => other,
        }
    }

    /// Whether retrying the same request could succeed
    ///
    /// Unsupported kinds and invalid configuration are deterministic.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedResourceKind { .. } | Self::Registry { .. } | Self::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_query_names_namespace() {
        let err = Error::authorization_query("team-a", "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("team-a"));
        assert!(msg.contains("connection refused"));
        assert!(msg.contains(UNKNOWN_CONTEXT));
    }

    #[test]
    fn test_for_principal_fills_reference() {
        let err = Error::authorization_query("team-a", "boom").for_principal("ab12cd34");
        match err {
            Error::AuthorizationQuery {
                namespace,
                principal,
                ..
            } => {
                assert_eq!(namespace, "team-a");
                assert_eq!(principal, "ab12cd34");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_for_principal_converts_timeout() {
        let err = Error::timeout("rules query", "team-b", Duration::from_secs(2))
            .for_principal("ab12cd34");
        match err {
            Error::AuthorizationQuery {
                namespace, message, ..
            } => {
                assert_eq!(namespace, "team-b");
                assert!(message.contains("timed out"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_for_principal_leaves_other_variants() {
        let err = Error::unsupported_kind("Gadget").for_principal("ab12cd34");
        assert!(matches!(err, Error::UnsupportedResourceKind { kind } if kind == "Gadget"));
    }

    #[test]
    fn test_retryable() {
        assert!(!Error::unsupported_kind("Gadget").is_retryable());
        assert!(!Error::config("bad ttl").is_retryable());
        assert!(Error::namespace_list("watch not ready").is_retryable());
        assert!(Error::Cancelled.is_retryable());
    }
}
