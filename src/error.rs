// Error taxonomy for the session service
//
// Each external collaborator gets its own error domain so callers can
// branch on the failure class: configuration problems are fatal at startup,
// auth failures block progress after retry exhaustion, device failures only
// block recording, and store failures split between delivery (retained
// projection) and finalize (surfaced, session dropped).

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

use crate::session::LifecyclePhase;

/// Startup configuration failure. Fatal; never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Identity provider failure.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Provider unreachable or overloaded; a later attempt may succeed.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// The presented token was rejected.
    #[error("sign-in token rejected")]
    InvalidToken,
}

/// Capture device failure. Non-fatal; keeps a session in `Prepared`.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// The user or platform denied camera/microphone access.
    #[error("capture permission denied")]
    PermissionDenied,

    /// Another stream already holds the device.
    #[error("capture device busy")]
    Busy,

    /// Transient device-layer failure.
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
}

/// Record store failure.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Write-once violation: a document with this id already exists.
    #[error("record {0} already exists")]
    AlreadyExists(String),

    /// Transient transport or backend failure.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The record could not be encoded as a store document.
    #[error("record serialization failed: {0}")]
    Serialization(String),
}

/// Rejected lifecycle call. Precondition violations carry no user-facing
/// message; the controller simply refuses to transition.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The call does not apply to the controller's current phase.
    #[error("{action} is not valid in the {phase:?} phase")]
    InvalidState {
        action: &'static str,
        phase: LifecyclePhase,
    },

    /// Recording requested before a capture stream was attached.
    #[error("no capture stream held")]
    NoStream,

    /// The selected actor is the customer's own identity.
    #[error("customer and actor identities must differ")]
    SelfDealing,

    /// No counterparty could be selected for the session.
    #[error("actor selection failed: {0}")]
    ActorUnavailable(String),

    /// Finalize exhausted its retries against the record store.
    #[error("finalize failed: {0}")]
    Finalize(#[source] StoreError),
}

/// Errors that may succeed on a later attempt. Drives the bounded-backoff
/// retry layer: terminal errors surface immediately.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for AuthError {
    fn is_transient(&self) -> bool {
        matches!(self, AuthError::Unavailable(_))
    }
}

impl Transient for DeviceError {
    fn is_transient(&self) -> bool {
        matches!(self, DeviceError::Unavailable(_) | DeviceError::Busy)
    }
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Single user-visible error message slot shared across components.
///
/// The presentation layer renders at most one error at a time; newer
/// messages replace older ones and `clear` empties the slot.
#[derive(Clone)]
pub struct ErrorSlot {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("surfacing error: {message}");
        self.tx.send_replace(Some(message));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn watch(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }
}

impl Default for ErrorSlot {
    fn default() -> Self {
        Self::new()
    }
}
