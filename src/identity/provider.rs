use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::AuthError;

/// Opaque identity handle assigned by the identity provider.
///
/// Stable for the lifetime of a sign-in; compared by value everywhere
/// (record filters, role projections, self-dealing checks).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHandle(String);

impl IdentityHandle {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity provider contract.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a fresh anonymous identity.
    async fn sign_in_anonymous(&self) -> Result<IdentityHandle, AuthError>;

    /// Resolve the identity bound to `token`.
    async fn sign_in_with_token(&self, token: &str) -> Result<IdentityHandle, AuthError>;

    /// Discard the current identity, notifying watchers with `None`.
    async fn sign_out(&self);

    /// Change feed for the current identity. May fire repeatedly; `None`
    /// means signed out.
    fn watch_identity(&self) -> watch::Receiver<Option<IdentityHandle>>;
}
