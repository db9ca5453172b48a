use std::sync::Arc;

use anyhow::Result;
use stagecall::{
    AppContext, Config, FixedActorSelector, IdentityHandle, MemoryStore, Orchestrator, Role,
    SimulatedCaptureDevice, SimulatedIdentityProvider,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/stagecall")?;

    info!("stagecall v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Session collection: {}", cfg.store.collection);
    info!("Library cap: {} records", cfg.store.library_limit);

    let context = AppContext {
        identity: Arc::new(SimulatedIdentityProvider::new()),
        store: Arc::new(MemoryStore::new()),
        device: Arc::new(SimulatedCaptureDevice::new()),
        selector: Arc::new(FixedActorSelector::new(IdentityHandle::new("actor-demo"))),
        config: cfg,
    };
    let app = Orchestrator::new(context);

    let identity = app.sign_in_anonymous().await?;
    info!("Signed in as {identity}");

    app.select_role(Role::Customer).await?;
    info!(
        "Customer library holds {} sessions",
        app.library().projection().len()
    );
    info!("Run the scripted_session demo for a full lifecycle walkthrough");

    Ok(())
}
