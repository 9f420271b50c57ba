//! Audit log
//!
//! Append-only JSONL files, one per day. Written after commit; the
//! relational tables stay the source of truth.

pub mod reader;
pub mod store;

pub use reader::{EventFilter, EventReader};
pub use store::EventStore;
