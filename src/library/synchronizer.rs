use std::sync::Arc;

use futures::stream::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{Config, RetryConfig};
use crate::error::StoreError;
use crate::identity::IdentityHandle;
use crate::retry::with_backoff;
use crate::store::{RecordFilter, RecordStore, SessionRecord, SnapshotEvent};

/// Which side of a session the caller is browsing as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Actor,
}

impl Role {
    pub fn filter(self, identity: &IdentityHandle) -> RecordFilter {
        match self {
            Role::Customer => RecordFilter::CustomerId(identity.clone()),
            Role::Actor => RecordFilter::ActorId(identity.clone()),
        }
    }
}

struct ActiveProjection {
    role: Role,
    identity: IdentityHandle,
    task: JoinHandle<()>,
}

/// Live role-filtered view of the session library.
///
/// At most one subscription is active at a time. Selecting a role resets
/// the projection to empty, opens a fresh filtered subscription, and from
/// then on every delivered snapshot replaces the projection wholesale,
/// re-sorted newest first. Delivery errors keep the last good projection.
pub struct LibrarySynchronizer {
    store: Arc<dyn RecordStore>,
    collection: String,
    limit: usize,
    retry: RetryConfig,
    active: Mutex<Option<ActiveProjection>>,
    projection_tx: Arc<watch::Sender<Vec<SessionRecord>>>,
}

impl LibrarySynchronizer {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        let (projection_tx, _) = watch::channel(Vec::new());

        Self {
            store,
            collection: config.store.collection.clone(),
            limit: config.store.library_limit,
            retry: config.retry.clone(),
            active: Mutex::new(None),
            projection_tx: Arc::new(projection_tx),
        }
    }

    /// Change feed for the active projection.
    pub fn watch(&self) -> watch::Receiver<Vec<SessionRecord>> {
        self.projection_tx.subscribe()
    }

    pub fn projection(&self) -> Vec<SessionRecord> {
        self.projection_tx.borrow().clone()
    }

    pub async fn active_role(&self) -> Option<Role> {
        self.active.lock().await.as_ref().map(|a| a.role)
    }

    /// Activate the projection for `role` as `identity`.
    ///
    /// Tears down any previous subscription first; the projection is empty
    /// until the new subscription's initial snapshot arrives.
    pub async fn select_role(
        &self,
        role: Role,
        identity: &IdentityHandle,
    ) -> Result<(), StoreError> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.task.abort();
            debug!(role = ?previous.role, identity = %previous.identity, "projection torn down");
        }
        self.projection_tx.send_replace(Vec::new());

        let subscription = with_backoff(&self.retry, "library subscription", || {
            self.store
                .subscribe(&self.collection, role.filter(identity), self.limit)
        })
        .await?;

        let projection_tx = Arc::clone(&self.projection_tx);
        let task = tokio::spawn(async move {
            let mut subscription = subscription;
            while let Some(event) = subscription.next().await {
                match event {
                    SnapshotEvent::Snapshot(mut records) => {
                        records.sort_by(|a, b| b.date_created.cmp(&a.date_created));
                        debug!(count = records.len(), "library snapshot applied");
                        projection_tx.send_replace(records);
                    }
                    SnapshotEvent::Error(err) => {
                        warn!("library delivery failed, keeping last snapshot: {err}");
                    }
                }
            }
            debug!("library subscription closed");
        });

        *active = Some(ActiveProjection {
            role,
            identity: identity.clone(),
            task,
        });

        info!(role = ?role, identity = %identity, "library projection active");
        Ok(())
    }

    /// Tear down the active subscription and clear the projection. Safe to
    /// call when nothing is active.
    pub async fn deactivate(&self) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.task.abort();
            info!(role = ?previous.role, "library projection deactivated");
        }
        self.projection_tx.send_replace(Vec::new());
    }
}

impl Drop for LibrarySynchronizer {
    fn drop(&mut self) {
        if let Ok(active) = self.active.try_lock() {
            if let Some(active) = active.as_ref() {
                active.task.abort();
            }
        }
    }
}
