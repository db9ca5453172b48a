use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::actors::ActorSelector;
use super::state::{ControllerSnapshot, InFlightSession, LifecyclePhase};
use crate::capture::CaptureDevice;
use crate::config::{CaptureConfig, Config, RetryConfig};
use crate::error::{ErrorSlot, LifecycleError};
use crate::identity::IdentityHandle;
use crate::retry::with_backoff;
use crate::store::{RecordStore, SessionRecord};

struct Inner {
    phase: LifecyclePhase,
    session: Option<InFlightSession>,
    last_saved_id: Option<String>,
}

struct Shared {
    inner: Mutex<Inner>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
    device: Arc<dyn CaptureDevice>,
    errors: ErrorSlot,
}

impl Shared {
    fn publish(&self, inner: &Inner) {
        self.snapshot_tx.send_replace(ControllerSnapshot {
            phase: inner.phase,
            session: inner.session.as_ref().map(InFlightSession::view),
            stream_held: inner
                .session
                .as_ref()
                .is_some_and(|s| s.stream.is_some()),
            last_saved_id: inner.last_saved_id.clone(),
        });
    }
}

/// State machine for the single in-flight session.
///
/// Every lifecycle call takes the one controller lock for its whole
/// transition, so calls serialize and no transition is ever observed
/// half-applied. Device acquisition is the exception: it runs on its own
/// task and attaches the stream later, guarded by a session-id check.
pub struct SessionController {
    shared: Arc<Shared>,
    store: Arc<dyn RecordStore>,
    selector: Arc<dyn ActorSelector>,
    collection: String,
    capture: CaptureConfig,
    retry: RetryConfig,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        device: Arc<dyn CaptureDevice>,
        selector: Arc<dyn ActorSelector>,
        errors: ErrorSlot,
        config: &Config,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(ControllerSnapshot::idle());

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    phase: LifecyclePhase::Idle,
                    session: None,
                    last_saved_id: None,
                }),
                snapshot_tx,
                device,
                errors,
            }),
            store,
            selector,
            collection: config.store.collection.clone(),
            capture: config.capture.clone(),
            retry: config.retry.clone(),
        }
    }

    /// Change feed for the controller state.
    pub fn watch(&self) -> watch::Receiver<ControllerSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Begin a new session for `customer` and return its id.
    ///
    /// Capture acquisition is requested concurrently; entering `Prepared`
    /// never waits for the camera, and a missing stream only blocks
    /// `start_recording`.
    pub async fn start_session(
        &self,
        customer: &IdentityHandle,
        title: &str,
    ) -> Result<String, LifecycleError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.phase != LifecyclePhase::Idle {
            return Err(LifecycleError::InvalidState {
                action: "start_session",
                phase: inner.phase,
            });
        }

        let actor = self.selector.select(customer).await?;
        if actor == *customer {
            return Err(LifecycleError::SelfDealing);
        }

        let session = InFlightSession::new(customer.clone(), actor, title);
        let session_id = session.id.clone();
        inner.phase = LifecyclePhase::Prepared;
        inner.session = Some(session);
        self.shared.publish(&inner);
        drop(inner);

        info!(session = %session_id, "session prepared");
        self.spawn_acquisition(session_id.clone());
        Ok(session_id)
    }

    /// Confirm payment for the in-flight session.
    pub async fn pay(&self) -> Result<(), LifecycleError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.phase != LifecyclePhase::Prepared {
            return Err(LifecycleError::InvalidState {
                action: "pay",
                phase: inner.phase,
            });
        }

        if let Some(session) = inner.session.as_mut() {
            session.is_paid = true;
        }
        inner.phase = LifecyclePhase::Paid;
        self.shared.publish(&inner);

        info!("session paid");
        Ok(())
    }

    /// Start recording. Requires payment and an attached capture stream.
    pub async fn start_recording(&self) -> Result<(), LifecycleError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.phase != LifecyclePhase::Paid {
            return Err(LifecycleError::InvalidState {
                action: "start_recording",
                phase: inner.phase,
            });
        }

        {
            let Some(session) = inner.session.as_mut() else {
                return Err(LifecycleError::NoStream);
            };
            if session.stream.is_none() {
                return Err(LifecycleError::NoStream);
            }
            session.recording_started_at = Some(Utc::now());
        }
        inner.phase = LifecyclePhase::Recording;
        self.shared.publish(&inner);

        info!("recording started");
        Ok(())
    }

    /// Stop recording and finalize.
    ///
    /// The device is released before the store write, so a failed write
    /// never leaves the camera held. The write retries under backoff with
    /// the same document id; after retries are exhausted the error is
    /// surfaced and the session is dropped. Either way the controller ends
    /// in `Idle`.
    pub async fn stop_recording(&self) -> Result<SessionRecord, LifecycleError> {
        let mut inner = self.shared.inner.lock().await;
        if inner.phase != LifecyclePhase::Recording {
            return Err(LifecycleError::InvalidState {
                action: "stop_recording",
                phase: inner.phase,
            });
        }

        let Some(mut session) = inner.session.take() else {
            inner.phase = LifecyclePhase::Idle;
            self.shared.publish(&inner);
            return Err(LifecycleError::InvalidState {
                action: "stop_recording",
                phase: LifecyclePhase::Idle,
            });
        };

        inner.phase = LifecyclePhase::Finalizing;
        self.shared.publish(&inner);

        if let Some(stream) = session.stream.take() {
            self.shared.device.release(stream).await;
        }

        let now = Utc::now();
        let duration_secs = session
            .recording_started_at
            .map(|started| now.signed_duration_since(started).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);
        let record = session.into_record(now, duration_secs);

        let written = with_backoff(&self.retry, "session finalize", || {
            self.store.create(&self.collection, &record.id, &record)
        })
        .await;

        inner.phase = LifecyclePhase::Idle;
        let result = match written {
            Ok(()) => {
                info!(session = %record.id, "session record saved");
                inner.last_saved_id = Some(record.id.clone());
                Ok(record)
            }
            Err(err) => {
                self.shared
                    .errors
                    .set(format!("failed to save session: {err}"));
                Err(LifecycleError::Finalize(err))
            }
        };
        self.shared.publish(&inner);

        result
    }

    /// Discard the in-flight session, releasing the device. Safe to call
    /// from any phase, including `Idle`.
    pub async fn cancel(&self) {
        let mut inner = self.shared.inner.lock().await;
        let stream = inner.session.take().and_then(|mut s| s.stream.take());
        let had_session = inner.phase != LifecyclePhase::Idle;
        inner.phase = LifecyclePhase::Idle;
        self.shared.publish(&inner);

        if let Some(stream) = stream {
            self.shared.device.release(stream).await;
        }
        if had_session {
            info!("session cancelled");
        }
    }

    fn spawn_acquisition(&self, session_id: String) {
        let shared = Arc::clone(&self.shared);
        let retry = self.retry.clone();
        let video = self.capture.video;
        let audio = self.capture.audio;

        tokio::spawn(async move {
            let device = Arc::clone(&shared.device);
            let acquired = with_backoff(&retry, "capture acquisition", || {
                device.acquire(video, audio)
            })
            .await;

            let handle = match acquired {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(session = %session_id, "capture acquisition failed: {err}");
                    shared.errors.set(format!("camera unavailable: {err}"));
                    return;
                }
            };

            let mut inner = shared.inner.lock().await;
            let attachable = matches!(inner.phase, LifecyclePhase::Prepared | LifecyclePhase::Paid)
                && inner
                    .session
                    .as_ref()
                    .is_some_and(|s| s.id == session_id && s.stream.is_none());

            if attachable {
                if let Some(session) = inner.session.as_mut() {
                    session.stream = Some(handle);
                }
                shared.publish(&inner);
                info!(session = %session_id, "capture stream attached");
            } else {
                drop(inner);
                // The session this acquisition was started for is gone.
                shared.device.release(handle).await;
                debug!(session = %session_id, "late capture stream released");
            }
        });
    }
}
