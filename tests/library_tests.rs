// Integration tests for the library synchronizer
//
// These tests exercise the role-filtered projections against the
// in-memory record store: client-side sort order, snapshot replacement,
// role switching, and delivery-error tolerance.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use stagecall::{
    Config, IdentityHandle, LibrarySynchronizer, MediaType, MemoryStore, RecordStore, Role,
    SessionRecord, StoreError,
};
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.base_delay_ms = 1;
    config
}

fn record(id: &str, customer: &str, actor: &str, minutes_ago: i64) -> SessionRecord {
    SessionRecord {
        id: id.to_string(),
        customer_id: IdentityHandle::new(customer),
        actor_id: IdentityHandle::new(actor),
        title: format!("Session {id}"),
        media_type: MediaType::Video,
        is_paid: true,
        is_complete: true,
        date_created: Utc::now() - chrono::Duration::minutes(minutes_ago),
        storage_url: format!("mem://sessions/{id}"),
        duration_secs: 1.0,
    }
}

async fn seed(store: &MemoryStore, records: &[SessionRecord]) -> Result<()> {
    for r in records {
        store.create("sessions", &r.id, r).await?;
    }
    Ok(())
}

async fn wait_for_len(
    rx: &mut watch::Receiver<Vec<SessionRecord>>,
    expected: usize,
) -> Result<Vec<SessionRecord>> {
    timeout(WAIT, async {
        while rx.borrow().len() != expected {
            rx.changed().await?;
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("projection never reached the expected size")??;
    let projection = rx.borrow().clone();
    Ok(projection)
}

#[tokio::test]
async fn test_projection_is_sorted_newest_first() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    // Created out of order on purpose
    seed(
        &store,
        &[
            record("s-middle", "alice", "bob", 10),
            record("s-newest", "alice", "bob", 1),
            record("s-oldest", "alice", "bob", 60),
        ],
    )
    .await?;

    let library = LibrarySynchronizer::new(store, &test_config());
    let mut rx = library.watch();
    library
        .select_role(Role::Customer, &IdentityHandle::new("alice"))
        .await?;

    let projection = wait_for_len(&mut rx, 3).await?;
    let ids: Vec<&str> = projection.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["s-newest", "s-middle", "s-oldest"]);

    Ok(())
}

#[tokio::test]
async fn test_repeated_snapshots_yield_the_same_projection() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            record("s-1", "alice", "bob", 5),
            record("s-2", "alice", "bob", 2),
        ],
    )
    .await?;

    let library = LibrarySynchronizer::new(store.clone(), &test_config());
    let mut rx = library.watch();
    library
        .select_role(Role::Customer, &IdentityHandle::new("alice"))
        .await?;
    let first = wait_for_len(&mut rx, 2).await?;

    // A store re-sync delivers an identical snapshot
    store.redeliver("sessions").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(library.projection(), first);

    Ok(())
}

#[tokio::test]
async fn test_role_switch_starts_from_an_empty_projection() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            record("s-1", "alice", "bob", 5),
            record("s-2", "alice", "bob", 2),
        ],
    )
    .await?;

    let library = LibrarySynchronizer::new(store.clone(), &test_config());
    let alice = IdentityHandle::new("alice");
    let mut rx = library.watch();

    library.select_role(Role::Customer, &alice).await?;
    wait_for_len(&mut rx, 2).await?;
    assert_eq!(library.active_role().await, Some(Role::Customer));

    // Alice has performed nothing, so the actor projection stays empty
    library.select_role(Role::Actor, &alice).await?;
    assert!(library.projection().is_empty());
    assert_eq!(library.active_role().await, Some(Role::Actor));

    // A session performed by alice arrives through the new subscription
    store
        .create("sessions", "s-3", &record("s-3", "carol", "alice", 0))
        .await?;
    wait_for_len(&mut rx, 1).await?;

    Ok(())
}

#[tokio::test]
async fn test_delivery_errors_keep_the_last_good_projection() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    seed(&store, &[record("s-1", "alice", "bob", 5)]).await?;

    let library = LibrarySynchronizer::new(store.clone(), &test_config());
    let mut rx = library.watch();
    library
        .select_role(Role::Customer, &IdentityHandle::new("alice"))
        .await?;
    let before = wait_for_len(&mut rx, 1).await?;

    store
        .push_delivery_error("sessions", StoreError::Unavailable("blip".to_string()))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Verify: projection untouched by the error
    assert_eq!(library.projection(), before);

    // Verify: the channel is still live afterwards
    store
        .create("sessions", "s-2", &record("s-2", "alice", "bob", 0))
        .await?;
    wait_for_len(&mut rx, 2).await?;

    Ok(())
}

#[tokio::test]
async fn test_projection_is_capped_at_the_configured_limit() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    seed(
        &store,
        &[
            record("s-1", "alice", "bob", 30),
            record("s-2", "alice", "bob", 20),
            record("s-3", "alice", "bob", 10),
        ],
    )
    .await?;

    let mut config = test_config();
    config.store.library_limit = 2;
    let library = LibrarySynchronizer::new(store, &config);
    let mut rx = library.watch();
    library
        .select_role(Role::Customer, &IdentityHandle::new("alice"))
        .await?;

    let projection = wait_for_len(&mut rx, 2).await?;
    assert_eq!(projection.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_deactivate_tears_the_subscription_down() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let library = LibrarySynchronizer::new(store.clone(), &test_config());

    library
        .select_role(Role::Customer, &IdentityHandle::new("alice"))
        .await?;
    assert_eq!(store.subscriber_count(), 1);

    library.deactivate().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(store.subscriber_count(), 0);
    assert!(library.projection().is_empty());
    assert_eq!(library.active_role().await, None);

    // Deactivating again is harmless
    library.deactivate().await;

    Ok(())
}
