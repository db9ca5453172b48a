//! Record store adapter
//!
//! The shared collection of finalized session records lives behind this
//! boundary:
//! - `create` is write-once, keyed by document id
//! - `subscribe` delivers full filtered snapshots (never deltas) plus
//!   delivery errors over a cancellable channel
//!
//! `MemoryStore` simulates the remote document store: records are kept as
//! JSON documents and every create re-delivers the full matching set to
//! each affected subscriber.

mod adapter;
mod memory;
mod record;

pub use adapter::{RecordStore, RecordSubscription, SnapshotEvent};
pub use memory::MemoryStore;
pub use record::{MediaType, RecordFilter, SessionRecord};
