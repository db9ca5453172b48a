use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityHandle;

/// Media captured in a session. Single-valued today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Video,
}

/// A finalized session, durable in the record store.
///
/// Persisted exactly once, at finalize; every stored record has
/// `is_paid == true` and `is_complete == true`. There is no draft state
/// visible to other clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Document id; equals the in-flight session id that produced it.
    pub id: String,

    /// The customer who booked and paid for the session.
    pub customer_id: IdentityHandle,

    /// The actor who performed the session.
    pub actor_id: IdentityHandle,

    pub title: String,

    pub media_type: MediaType,

    pub is_paid: bool,

    pub is_complete: bool,

    /// Stamped at finalize; drives newest-first library ordering.
    pub date_created: DateTime<Utc>,

    /// Where the captured media would live. Placeholder in the simulated
    /// pipeline.
    pub storage_url: String,

    pub duration_secs: f64,
}

/// Single-field equality filter over the identity columns.
///
/// Deliberately one field per subscription: the backing store never has to
/// combine a filter with a server-side sort, so no composite index is
/// needed and ordering stays a client concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    CustomerId(IdentityHandle),
    ActorId(IdentityHandle),
}

impl RecordFilter {
    pub fn matches(&self, record: &SessionRecord) -> bool {
        match self {
            RecordFilter::CustomerId(id) => record.customer_id == *id,
            RecordFilter::ActorId(id) => record.actor_id == *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(customer: &str, actor: &str) -> SessionRecord {
        SessionRecord {
            id: "session-1".to_string(),
            customer_id: IdentityHandle::new(customer),
            actor_id: IdentityHandle::new(actor),
            title: "Test session".to_string(),
            media_type: MediaType::Video,
            is_paid: true,
            is_complete: true,
            date_created: Utc::now(),
            storage_url: "mem://sessions/session-1".to_string(),
            duration_secs: 1.5,
        }
    }

    #[test]
    fn filter_matches_customer_field_only() {
        let r = record("customer-a", "actor-b");

        assert!(RecordFilter::CustomerId(IdentityHandle::new("customer-a")).matches(&r));
        assert!(!RecordFilter::CustomerId(IdentityHandle::new("actor-b")).matches(&r));
    }

    #[test]
    fn filter_matches_actor_field_only() {
        let r = record("customer-a", "actor-b");

        assert!(RecordFilter::ActorId(IdentityHandle::new("actor-b")).matches(&r));
        assert!(!RecordFilter::ActorId(IdentityHandle::new("customer-a")).matches(&r));
    }
}
