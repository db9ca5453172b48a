use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::capture::StreamHandle;
use crate::identity::IdentityHandle;
use crate::store::{MediaType, SessionRecord};

/// Controller phase.
///
/// `Finalizing` is only ever observed through the snapshot channel: the
/// finalize transition runs to completion under the controller lock, so no
/// lifecycle call can find the controller in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Prepared,
    Paid,
    Recording,
    Finalizing,
}

/// The single in-progress session, exclusively owned by the controller.
///
/// Never persisted; the durable `SessionRecord` is produced from it at
/// finalize, and cancel drops it without a trace.
#[derive(Debug)]
pub struct InFlightSession {
    pub id: String,
    pub customer_id: IdentityHandle,
    pub actor_id: IdentityHandle,
    pub title: String,
    pub media_type: MediaType,
    pub is_paid: bool,
    pub stream: Option<StreamHandle>,
    pub recording_started_at: Option<DateTime<Utc>>,
}

impl InFlightSession {
    pub fn new(customer_id: IdentityHandle, actor_id: IdentityHandle, title: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            customer_id,
            actor_id,
            title: title.to_string(),
            media_type: MediaType::Video,
            is_paid: false,
            stream: None,
            recording_started_at: None,
        }
    }

    /// Stamp completion and produce the durable record. The stream handle
    /// must already have been released.
    pub fn into_record(self, date_created: DateTime<Utc>, duration_secs: f64) -> SessionRecord {
        let storage_url = format!("mem://sessions/{}", self.id);
        SessionRecord {
            id: self.id,
            customer_id: self.customer_id,
            actor_id: self.actor_id,
            title: self.title,
            media_type: self.media_type,
            is_paid: self.is_paid,
            is_complete: true,
            date_created,
            storage_url,
            duration_secs,
        }
    }

    pub fn view(&self) -> InFlightView {
        InFlightView {
            id: self.id.clone(),
            customer_id: self.customer_id.clone(),
            actor_id: self.actor_id.clone(),
            title: self.title.clone(),
            is_paid: self.is_paid,
        }
    }
}

/// Read-only copy of the in-flight session, published to watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightView {
    pub id: String,
    pub customer_id: IdentityHandle,
    pub actor_id: IdentityHandle,
    pub title: String,
    pub is_paid: bool,
}

/// Controller state as seen over the snapshot watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot {
    pub phase: LifecyclePhase,
    pub session: Option<InFlightView>,
    pub stream_held: bool,
    pub last_saved_id: Option<String>,
}

impl ControllerSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            session: None,
            stream_held: false,
            last_saved_id: None,
        }
    }
}
