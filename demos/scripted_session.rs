// Demo: a full customer/actor session lifecycle against the in-memory
// adapters
//
// The script walks the whole flow:
// 1. Customer signs in anonymously and opens the customer library
// 2. Customer starts a session (camera attaches after a delay), pays,
//    records, and stops
// 3. The finalize write survives injected store outages via backoff
// 4. The saved session shows up in the customer's projection, then in the
//    actor's projection on a second client sharing the same store
//
// Usage: cargo run --example scripted_session -- --record-secs 2

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use stagecall::{
    AppContext, Config, FixedActorSelector, IdentityHandle, MemoryStore, Orchestrator, Role,
    SimulatedCaptureDevice, SimulatedIdentityProvider,
};
use tokio::time::timeout;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "scripted_session")]
#[command(about = "Run a scripted customer/actor session lifecycle")]
struct Args {
    /// Session title
    #[arg(short, long, default_value = "Scripted rehearsal")]
    title: String,

    /// Seconds to spend in the recording phase
    #[arg(short, long, default_value = "2")]
    record_secs: u64,

    /// Camera acquisition delay in milliseconds
    #[arg(short, long, default_value = "150")]
    latency_ms: u64,

    /// Store outages to inject before the finalize write succeeds
    #[arg(short, long, default_value = "1")]
    fail_creates: u32,
}

const WAIT: Duration = Duration::from_secs(10);

fn client(
    store: &Arc<MemoryStore>,
    device: &Arc<SimulatedCaptureDevice>,
    actor: &IdentityHandle,
    config: &Config,
) -> (Orchestrator, Arc<SimulatedIdentityProvider>) {
    let identity = Arc::new(SimulatedIdentityProvider::new());
    let context = AppContext {
        identity: identity.clone(),
        store: store.clone(),
        device: device.clone(),
        selector: Arc::new(FixedActorSelector::new(actor.clone())),
        config: config.clone(),
    };
    (Orchestrator::new(context), identity)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::default();
    let actor = IdentityHandle::new("actor-demo");

    // One shared store, one camera per client
    let store = Arc::new(MemoryStore::new());
    store.fail_next_creates(args.fail_creates);

    let camera = Arc::new(SimulatedCaptureDevice::new());
    camera.set_latency(Duration::from_millis(args.latency_ms));

    // 1. Customer client
    let (customer_app, _) = client(&store, &camera, &actor, &config);
    let customer = customer_app.sign_in_anonymous().await?;
    customer_app.select_role(Role::Customer).await?;
    info!("Customer {customer} signed in, library open");

    // 2. Lifecycle: start, wait for the camera, pay, record
    let session_id = customer_app.start_session(&args.title).await?;
    info!("Session {session_id} prepared");

    let mut session_rx = customer_app.watch_session();
    timeout(WAIT, async {
        while !session_rx.borrow().stream_held {
            session_rx.changed().await?;
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("camera never attached")??;
    info!("Camera attached after {}ms latency", args.latency_ms);

    customer_app.pay().await?;
    customer_app.start_recording().await?;
    info!("Recording for {}s...", args.record_secs);
    tokio::time::sleep(Duration::from_secs(args.record_secs)).await;

    // 3. Finalize; the first create(s) fail and are retried with backoff
    let record = customer_app.stop_recording().await?;
    info!(
        "Saved session {} ({}s of {:?})",
        record.id, record.duration_secs, record.media_type
    );

    // 4. The record arrives through the subscription channel
    let mut library_rx = customer_app.watch_library();
    timeout(WAIT, async {
        while library_rx.borrow().is_empty() {
            library_rx.changed().await?;
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("customer projection never updated")??;
    info!(
        "Customer library now holds {} session(s)",
        customer_app.library().projection().len()
    );

    // 5. Actor client on the same store sees it from the other side
    let actor_camera = Arc::new(SimulatedCaptureDevice::new());
    let (actor_app, actor_identity) = client(&store, &actor_camera, &actor, &config);
    actor_identity.register_token("actor-token", actor.clone());
    actor_app.sign_in_with_token("actor-token").await?;
    actor_app.select_role(Role::Actor).await?;

    let mut actor_rx = actor_app.watch_library();
    timeout(WAIT, async {
        while actor_rx.borrow().is_empty() {
            actor_rx.changed().await?;
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("actor projection never updated")??;

    for session in actor_app.library().projection() {
        info!(
            "Actor sees \"{}\" from customer {}",
            session.title, session.customer_id
        );
    }

    customer_app.logout().await;
    actor_app.logout().await;
    info!("Done");

    Ok(())
}
