use std::sync::Arc;

use crate::capture::CaptureDevice;
use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::session::ActorSelector;
use crate::store::RecordStore;

/// Everything the orchestrator needs, constructed explicitly at startup.
///
/// There are no module-level singletons; tests and binaries build a context
/// from whichever adapter implementations they want and hand it over once.
pub struct AppContext {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn RecordStore>,
    pub device: Arc<dyn CaptureDevice>,
    pub selector: Arc<dyn ActorSelector>,
    pub config: Config,
}
