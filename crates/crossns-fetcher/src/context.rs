//! Per-request caller context

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crossns_common::{PrincipalKey, UserPrincipal};

/// The authenticated caller and its cancellation signal
///
/// Cloning is cheap and shares both the principal and the token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Arc<UserPrincipal>,
    key: PrincipalKey,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Context for `principal` with a fresh, never-cancelled token
    pub fn new(principal: UserPrincipal) -> Self {
        Self::with_cancellation(principal, CancellationToken::new())
    }

    /// Context for `principal` that is cancelled along with `cancel`
    pub fn with_cancellation(principal: UserPrincipal, cancel: CancellationToken) -> Self {
        let key = principal.cache_key();
        Self {
            principal: Arc::new(principal),
            key,
            cancel,
        }
    }

    /// The authenticated caller
    pub fn principal(&self) -> &UserPrincipal {
        &self.principal
    }

    /// Cache key derived from the principal
    pub fn principal_key(&self) -> &PrincipalKey {
        &self.key
    }

    /// The caller's cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the caller has already cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the caller cancels
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
