use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::info;

use super::provider::{IdentityHandle, IdentityProvider};
use crate::error::AuthError;

/// In-memory identity provider.
///
/// Anonymous sign-in mints a fresh uid; token sign-in resolves against a
/// registered token table. `fail_next` injects transient outages so the
/// orchestrator's backoff path can be driven deterministically.
pub struct SimulatedIdentityProvider {
    tokens: Mutex<HashMap<String, IdentityHandle>>,
    current_tx: watch::Sender<Option<IdentityHandle>>,
    failures: AtomicU32,
}

impl SimulatedIdentityProvider {
    pub fn new() -> Self {
        let (current_tx, _) = watch::channel(None);
        Self {
            tokens: Mutex::new(HashMap::new()),
            current_tx,
            failures: AtomicU32::new(0),
        }
    }

    /// Register a token that resolves to `handle`.
    pub fn register_token(&self, token: impl Into<String>, handle: IdentityHandle) {
        self.lock_tokens().insert(token.into(), handle);
    }

    /// Make the next `count` sign-in attempts fail as transient outages.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Result<(), AuthError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AuthError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, HashMap<String, IdentityHandle>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn resolve(&self, handle: IdentityHandle) -> IdentityHandle {
        info!(identity = %handle, "signed in");
        self.current_tx.send_replace(Some(handle.clone()));
        handle
    }
}

impl Default for SimulatedIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SimulatedIdentityProvider {
    async fn sign_in_anonymous(&self) -> Result<IdentityHandle, AuthError> {
        self.take_failure()?;
        let handle = IdentityHandle::new(format!("anon-{}", uuid::Uuid::new_v4()));
        Ok(self.resolve(handle))
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<IdentityHandle, AuthError> {
        self.take_failure()?;
        let handle = self.lock_tokens().get(token).cloned();
        match handle {
            Some(handle) => Ok(self.resolve(handle)),
            None => Err(AuthError::InvalidToken),
        }
    }

    async fn sign_out(&self) {
        info!("signed out");
        self.current_tx.send_replace(None);
    }

    fn watch_identity(&self) -> watch::Receiver<Option<IdentityHandle>> {
        self.current_tx.subscribe()
    }
}
