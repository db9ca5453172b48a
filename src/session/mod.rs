//! Session lifecycle
//!
//! This module owns the in-flight session state machine:
//! - `Idle -> Prepared -> Paid -> Recording -> Finalizing -> Idle`
//! - payment gates recording; an attached capture stream gates recording
//! - finalize releases the device, stamps completion, and persists the
//!   record exactly once (retries reuse the same document id)
//! - cancel discards the session from any phase without persisting
//!
//! State changes are published over a watch channel as `ControllerSnapshot`s
//! for the presentation layer.

mod actors;
mod controller;
mod state;

pub use actors::{ActorSelector, FixedActorSelector};
pub use controller::SessionController;
pub use state::{ControllerSnapshot, InFlightSession, InFlightView, LifecyclePhase};
