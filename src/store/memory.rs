use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::adapter::{RecordStore, RecordSubscription, SnapshotEvent};
use super::record::{RecordFilter, SessionRecord};
use crate::error::StoreError;

const SUBSCRIPTION_BUFFER: usize = 16;

struct Subscriber {
    id: u64,
    collection: String,
    filter: RecordFilter,
    limit: usize,
    tx: mpsc::Sender<SnapshotEvent>,
}

type Collections = HashMap<String, BTreeMap<String, serde_json::Value>>;

/// In-memory document store with live filtered subscriptions.
///
/// Documents are held as JSON, mirroring the remote document store this
/// adapter simulates. Every create re-delivers the full current matching
/// set to each subscriber whose filter matches the new record, truncated
/// to the subscriber's limit and in no particular order.
pub struct MemoryStore {
    collections: Mutex<Collections>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_subscriber_id: AtomicU64,
    create_failures: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscriber_id: AtomicU64::new(1),
            create_failures: AtomicU32::new(0),
        }
    }

    /// Make the next `count` creates fail as transient outages.
    pub fn fail_next_creates(&self, count: u32) {
        self.create_failures.store(count, Ordering::SeqCst);
    }

    /// Push a delivery error to every subscriber of `collection` without
    /// tearing any subscription down.
    pub async fn push_delivery_error(&self, collection: &str, error: StoreError) {
        let targets: Vec<mpsc::Sender<SnapshotEvent>> = lock(&self.subscribers)
            .iter()
            .filter(|s| s.collection == collection)
            .map(|s| s.tx.clone())
            .collect();

        for tx in targets {
            let _ = tx.send(SnapshotEvent::Error(error.clone())).await;
        }
    }

    /// Re-deliver the current snapshot to every subscriber of `collection`,
    /// as a store re-sync would.
    pub async fn redeliver(&self, collection: &str) {
        let deliveries = {
            let collections = lock(&self.collections);
            lock(&self.subscribers)
                .iter()
                .filter(|s| s.collection == collection)
                .map(|s| (s.tx.clone(), snapshot_for(&collections, s)))
                .collect::<Vec<_>>()
        };

        for (tx, snapshot) in deliveries {
            let _ = tx.send(SnapshotEvent::Snapshot(snapshot)).await;
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn snapshot_for(collections: &Collections, subscriber: &Subscriber) -> Vec<SessionRecord> {
    let Some(documents) = collections.get(&subscriber.collection) else {
        return Vec::new();
    };

    documents
        .values()
        .filter_map(|doc| match serde_json::from_value(doc.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("skipping undecodable document: {err}");
                None
            }
        })
        .filter(|record| subscriber.filter.matches(record))
        .take(subscriber.limit)
        .collect()
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn create(
        &self,
        collection: &str,
        id: &str,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        let remaining = self.create_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.create_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }

        let document = serde_json::to_value(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let deliveries = {
            let mut collections = lock(&self.collections);
            let documents = collections.entry(collection.to_string()).or_default();
            if documents.contains_key(id) {
                return Err(StoreError::AlreadyExists(id.to_string()));
            }
            documents.insert(id.to_string(), document);

            // Snapshot only the subscribers whose result set just changed.
            lock(&self.subscribers)
                .iter()
                .filter(|s| s.collection == collection && s.filter.matches(record))
                .map(|s| (s.tx.clone(), snapshot_for(&collections, s)))
                .collect::<Vec<_>>()
        };

        info!(collection, id, "record created");

        for (tx, snapshot) in deliveries {
            if tx.send(SnapshotEvent::Snapshot(snapshot)).await.is_err() {
                debug!("dropping delivery to a closed subscription");
            }
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: RecordFilter,
        limit: usize,
    ) -> Result<RecordSubscription, StoreError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let subscriber_id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);

        let initial = {
            let collections = lock(&self.collections);
            let subscriber = Subscriber {
                id: subscriber_id,
                collection: collection.to_string(),
                filter,
                limit,
                tx: tx.clone(),
            };
            let initial = snapshot_for(&collections, &subscriber);
            lock(&self.subscribers).push(subscriber);
            initial
        };

        debug!(collection, subscriber = subscriber_id, "subscription opened");

        // Initial snapshot is delivered before the subscription is handed
        // back, so consumers always start from the current state.
        let _ = tx.send(SnapshotEvent::Snapshot(initial)).await;

        let subscribers = Arc::clone(&self.subscribers);
        let canceller = Box::new(move || {
            lock(&subscribers).retain(|s| s.id != subscriber_id);
            debug!(subscriber = subscriber_id, "subscription closed");
        });

        Ok(RecordSubscription::new(rx, canceller))
    }
}
