// Integration tests for the in-memory record store
//
// These tests pin down the adapter contract the rest of the system leans
// on: write-once creates, initial-snapshot-first delivery, filtered
// re-delivery on create, and subscription teardown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::StreamExt;
use stagecall::store::SnapshotEvent;
use stagecall::{
    IdentityHandle, MediaType, MemoryStore, RecordFilter, RecordStore, RecordSubscription,
    SessionRecord, StoreError,
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn record(id: &str, customer: &str, actor: &str) -> SessionRecord {
    SessionRecord {
        id: id.to_string(),
        customer_id: IdentityHandle::new(customer),
        actor_id: IdentityHandle::new(actor),
        title: format!("Session {id}"),
        media_type: MediaType::Video,
        is_paid: true,
        is_complete: true,
        date_created: Utc::now(),
        storage_url: format!("mem://sessions/{id}"),
        duration_secs: 1.0,
    }
}

async fn next_snapshot(sub: &mut RecordSubscription) -> Result<Vec<SessionRecord>> {
    let event = timeout(WAIT, sub.next())
        .await?
        .context("subscription closed unexpectedly")?;
    match event {
        SnapshotEvent::Snapshot(records) => Ok(records),
        SnapshotEvent::Error(err) => Err(err.into()),
    }
}

#[tokio::test]
async fn test_create_is_write_once() -> Result<()> {
    let store = MemoryStore::new();

    store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await?;
    let duplicate = store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await;

    assert!(matches!(duplicate, Err(StoreError::AlreadyExists(_))));

    Ok(())
}

#[tokio::test]
async fn test_subscribe_delivers_the_initial_snapshot_first() -> Result<()> {
    let store = MemoryStore::new();
    store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await?;

    let mut sub = store
        .subscribe(
            "sessions",
            RecordFilter::CustomerId(IdentityHandle::new("alice")),
            20,
        )
        .await?;

    let initial = next_snapshot(&mut sub).await?;
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].id, "s-1");

    Ok(())
}

#[tokio::test]
async fn test_creates_notify_only_matching_subscribers() -> Result<()> {
    let store = MemoryStore::new();

    let mut alice_sub = store
        .subscribe(
            "sessions",
            RecordFilter::CustomerId(IdentityHandle::new("alice")),
            20,
        )
        .await?;
    let mut bob_sub = store
        .subscribe(
            "sessions",
            RecordFilter::ActorId(IdentityHandle::new("bob")),
            20,
        )
        .await?;
    let mut carol_sub = store
        .subscribe(
            "sessions",
            RecordFilter::CustomerId(IdentityHandle::new("carol")),
            20,
        )
        .await?;

    // Drain the initial empty snapshots
    assert!(next_snapshot(&mut alice_sub).await?.is_empty());
    assert!(next_snapshot(&mut bob_sub).await?.is_empty());
    assert!(next_snapshot(&mut carol_sub).await?.is_empty());

    store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await?;

    // Verify: both sides of the session see it, the bystander does not
    assert_eq!(next_snapshot(&mut alice_sub).await?.len(), 1);
    assert_eq!(next_snapshot(&mut bob_sub).await?.len(), 1);
    let stray = timeout(Duration::from_millis(100), carol_sub.next()).await;
    assert!(stray.is_err(), "non-matching subscriber must stay quiet");

    Ok(())
}

#[tokio::test]
async fn test_snapshots_respect_the_subscription_limit() -> Result<()> {
    let store = MemoryStore::new();
    for i in 0..4 {
        let id = format!("s-{i}");
        store
            .create("sessions", &id, &record(&id, "alice", "bob"))
            .await?;
    }

    let mut sub = store
        .subscribe(
            "sessions",
            RecordFilter::CustomerId(IdentityHandle::new("alice")),
            2,
        )
        .await?;

    assert_eq!(next_snapshot(&mut sub).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_dropping_a_subscription_unsubscribes() -> Result<()> {
    let store = Arc::new(MemoryStore::new());

    let sub = store
        .subscribe(
            "sessions",
            RecordFilter::CustomerId(IdentityHandle::new("alice")),
            20,
        )
        .await?;
    assert_eq!(store.subscriber_count(), 1);

    drop(sub);
    assert_eq!(store.subscriber_count(), 0);

    // Creates after teardown do not error
    store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_injected_outages_fail_then_recover() -> Result<()> {
    let store = MemoryStore::new();
    store.fail_next_creates(1);

    let first = store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await;
    assert!(matches!(first, Err(StoreError::Unavailable(_))));

    // The same id succeeds on retry, so retried finalizes stay idempotent
    store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_delivery_errors_do_not_tear_the_subscription_down() -> Result<()> {
    let store = MemoryStore::new();

    let mut sub = store
        .subscribe(
            "sessions",
            RecordFilter::CustomerId(IdentityHandle::new("alice")),
            20,
        )
        .await?;
    assert!(next_snapshot(&mut sub).await?.is_empty());

    store
        .push_delivery_error("sessions", StoreError::Unavailable("blip".to_string()))
        .await;

    let event = timeout(WAIT, sub.next())
        .await?
        .context("subscription closed unexpectedly")?;
    assert!(matches!(event, SnapshotEvent::Error(_)));

    // The subscription keeps delivering afterwards
    store
        .create("sessions", "s-1", &record("s-1", "alice", "bob"))
        .await?;
    assert_eq!(next_snapshot(&mut sub).await?.len(), 1);

    Ok(())
}
