use tracing::debug;

use crate::error::LifecycleError;
use crate::identity::IdentityHandle;

/// Counterparty selection for a new session.
///
/// A production deployment would resolve a real booking (availability,
/// matching, scheduling). `FixedActorSelector` stands in for that step.
#[async_trait::async_trait]
pub trait ActorSelector: Send + Sync {
    async fn select(&self, customer: &IdentityHandle) -> Result<IdentityHandle, LifecycleError>;
}

/// Selects the same configured actor for every session.
pub struct FixedActorSelector {
    actor: IdentityHandle,
}

impl FixedActorSelector {
    pub fn new(actor: IdentityHandle) -> Self {
        Self { actor }
    }
}

#[async_trait::async_trait]
impl ActorSelector for FixedActorSelector {
    async fn select(&self, customer: &IdentityHandle) -> Result<IdentityHandle, LifecycleError> {
        debug!(customer = %customer, actor = %self.actor, "actor selected");
        Ok(self.actor.clone())
    }
}
