use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;

use super::context::AppContext;
use crate::error::ErrorSlot;
use crate::identity::IdentityHandle;
use crate::library::{LibrarySynchronizer, Role};
use crate::retry::with_backoff;
use crate::session::{ControllerSnapshot, SessionController};
use crate::store::SessionRecord;

/// Wires identity, role selection, the lifecycle controller, and the
/// library synchronizer into one application surface.
///
/// Sign-in and subscription establishment retry transient failures under
/// backoff; exhaustion lands in the shared error slot as a blocking error.
/// Everything the presentation layer renders is available as a watch
/// channel.
pub struct Orchestrator {
    context: AppContext,
    controller: SessionController,
    library: LibrarySynchronizer,
    errors: ErrorSlot,
    role_tx: watch::Sender<Option<Role>>,
}

impl Orchestrator {
    pub fn new(context: AppContext) -> Self {
        let errors = ErrorSlot::new();
        let controller = SessionController::new(
            Arc::clone(&context.store),
            Arc::clone(&context.device),
            Arc::clone(&context.selector),
            errors.clone(),
            &context.config,
        );
        let library = LibrarySynchronizer::new(Arc::clone(&context.store), &context.config);
        let (role_tx, _) = watch::channel(None);

        Self {
            context,
            controller,
            library,
            errors,
            role_tx,
        }
    }

    /// Sign in with a fresh anonymous identity, retrying transient
    /// provider failures before giving up.
    pub async fn sign_in_anonymous(&self) -> Result<IdentityHandle> {
        let signed_in = with_backoff(&self.context.config.retry, "anonymous sign-in", || {
            self.context.identity.sign_in_anonymous()
        })
        .await;

        match signed_in {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.errors.set(format!("sign-in failed: {err}"));
                Err(err).context("anonymous sign-in failed")
            }
        }
    }

    /// Sign in with a provider token.
    pub async fn sign_in_with_token(&self, token: &str) -> Result<IdentityHandle> {
        let signed_in = with_backoff(&self.context.config.retry, "token sign-in", || {
            self.context.identity.sign_in_with_token(token)
        })
        .await;

        match signed_in {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.errors.set(format!("sign-in failed: {err}"));
                Err(err).context("token sign-in failed")
            }
        }
    }

    /// Activate the library projection for `role` under the signed-in
    /// identity.
    pub async fn select_role(&self, role: Role) -> Result<()> {
        let identity = self.require_identity()?;
        self.library
            .select_role(role, &identity)
            .await
            .context("failed to activate library projection")?;
        self.role_tx.send_replace(Some(role));
        Ok(())
    }

    /// Begin a new session as the signed-in customer.
    pub async fn start_session(&self, title: &str) -> Result<String> {
        let identity = self.require_identity()?;
        let id = self.controller.start_session(&identity, title).await?;
        Ok(id)
    }

    pub async fn pay(&self) -> Result<()> {
        self.controller.pay().await?;
        Ok(())
    }

    pub async fn start_recording(&self) -> Result<()> {
        self.controller.start_recording().await?;
        Ok(())
    }

    pub async fn stop_recording(&self) -> Result<SessionRecord> {
        let record = self.controller.stop_recording().await?;
        Ok(record)
    }

    /// Discard any in-flight session, tear down the library projection,
    /// and sign out.
    pub async fn logout(&self) {
        self.controller.cancel().await;
        self.library.deactivate().await;
        self.context.identity.sign_out().await;
        self.role_tx.send_replace(None);
        self.errors.clear();
        info!("logged out");
    }

    pub fn current_identity(&self) -> Option<IdentityHandle> {
        self.context.identity.watch_identity().borrow().clone()
    }

    pub fn watch_role(&self) -> watch::Receiver<Option<Role>> {
        self.role_tx.subscribe()
    }

    pub fn watch_session(&self) -> watch::Receiver<ControllerSnapshot> {
        self.controller.watch()
    }

    pub fn watch_library(&self) -> watch::Receiver<Vec<SessionRecord>> {
        self.library.watch()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<String>> {
        self.errors.watch()
    }

    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn library(&self) -> &LibrarySynchronizer {
        &self.library
    }

    fn require_identity(&self) -> Result<IdentityHandle> {
        self.current_identity().context("not signed in")
    }
}
