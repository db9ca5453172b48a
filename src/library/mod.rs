//! Library synchronization
//!
//! Keeps a live, role-filtered projection of the shared session collection:
//! - customer role sees sessions it authored, actor role sees sessions it
//!   performed
//! - every snapshot replaces the projection and is re-sorted client-side,
//!   newest first
//! - a delivery error never clears the projection or the subscription

mod synchronizer;

pub use synchronizer::{LibrarySynchronizer, Role};
