//! Authenticated caller identity and its cache key
//!
//! The raw token never leaves [`UserPrincipal`]: it is zeroized on drop,
//! redacted from `Debug`, and only ever fed into the SHA-256 digest that
//! produces the [`PrincipalKey`].

use std::fmt;

use aws_lc_rs::digest::{Context, SHA256};
use zeroize::Zeroizing;

/// Number of hex characters of the key used in logs and error messages
const SHORT_KEY_LEN: usize = 12;

/// Authenticated caller identity, immutable per request
#[derive(Clone)]
pub struct UserPrincipal {
    /// User identifier (username or subject)
    pub id: String,
    /// Bearer token presented by the caller (may be empty)
    token: Zeroizing<String>,
    /// Group memberships
    pub groups: Vec<String>,
}

impl UserPrincipal {
    /// Create a principal without a token
    pub fn new(id: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            id: id.into(),
            token: Zeroizing::new(String::new()),
            groups,
        }
    }

    /// Attach the caller's bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Zeroizing::new(token.into());
        self
    }

    /// The bearer token, for collaborators that authenticate as the user
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Derive the stable cache key for this principal
    ///
    /// Any change to id, token, or groups yields a different key, which
    /// invalidates cached authorization implicitly.
    pub fn cache_key(&self) -> PrincipalKey {
        let mut ctx = Context::new(&SHA256);
        update_field(&mut ctx, self.id.as_bytes());
        update_field(&mut ctx, self.token.as_bytes());
        ctx.update(&(self.groups.len() as u64).to_le_bytes());
        for group in &self.groups {
            update_field(&mut ctx, group.as_bytes());
        }
        let hash = ctx.finish();
        let hex = hash
            .as_ref()
            .iter()
            .fold(String::with_capacity(64), |mut s, b| {
                use std::fmt::Write;
                let _ = write!(s, "{:02x}", b);
                s
            });
        PrincipalKey(hex)
    }
}

/// Length-prefix `bytes` so adjacent fields cannot run into each other
fn update_field(ctx: &mut Context, bytes: &[u8]) {
    ctx.update(&(bytes.len() as u64).to_le_bytes());
    ctx.update(bytes);
}

impl fmt::Debug for UserPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPrincipal")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("groups", &self.groups)
            .finish()
    }
}

/// Hex SHA-256 digest identifying a principal session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalKey(String);

impl PrincipalKey {
    /// Full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened digest, safe for logs and error messages
    pub fn short(&self) -> &str {
        &self.0[..SHORT_KEY_LEN.min(self.0.len())]
    }
}

impl fmt::Display for PrincipalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}
