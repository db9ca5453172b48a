use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::record::{RecordFilter, SessionRecord};
use crate::error::StoreError;

/// One delivery on a record subscription.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    /// The full current matching set. Replaces anything delivered before;
    /// arrival order within the batch is not meaningful.
    Snapshot(Vec<SessionRecord>),

    /// A delivery failed. The subscription itself stays alive and later
    /// snapshots may still arrive.
    Error(StoreError),
}

/// Live subscription over a filtered slice of a collection.
///
/// Yields `SnapshotEvent`s as a stream; dropping the subscription (or
/// calling `unsubscribe`) detaches it from the store.
pub struct RecordSubscription {
    events: mpsc::Receiver<SnapshotEvent>,
    canceller: Option<Box<dyn FnOnce() + Send>>,
}

impl RecordSubscription {
    pub fn new(
        events: mpsc::Receiver<SnapshotEvent>,
        canceller: Box<dyn FnOnce() + Send>,
    ) -> Self {
        Self {
            events,
            canceller: Some(canceller),
        }
    }

    /// Explicit teardown. Dropping the subscription does the same.
    pub fn unsubscribe(self) {}
}

impl Drop for RecordSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.canceller.take() {
            cancel();
        }
    }
}

impl Stream for RecordSubscription {
    type Item = SnapshotEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

/// Record store contract.
///
/// Callers only ever create and subscribe; there are no updates or deletes
/// in this system.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Write-once create. A duplicate id fails with
    /// `StoreError::AlreadyExists`, which makes retried writes that reuse
    /// the same id naturally idempotent.
    async fn create(
        &self,
        collection: &str,
        id: &str,
        record: &SessionRecord,
    ) -> Result<(), StoreError>;

    /// Open a bounded, filtered subscription. The first delivery is the
    /// initial snapshot; every later create that matches `filter` triggers
    /// a fresh full snapshot capped at `limit` records.
    async fn subscribe(
        &self,
        collection: &str,
        filter: RecordFilter,
        limit: usize,
    ) -> Result<RecordSubscription, StoreError>;
}
