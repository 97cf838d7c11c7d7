//! Event log parsing and call-stack reconstruction.
//!
//! This module turns the collector's flat event log into:
//! - Typed events (`events`)
//! - Per-thread timed call records (`call_stack`)
//! - Flattened resource records wrapped in a profile (`resources`, `schema`)

pub mod call_stack;
pub mod events;
pub mod resources;
pub mod schema;
pub mod thread_parent;

// Re-export main types and functions
pub use call_stack::{process, CallRecord, Reconstruction, Reconstructor, ThreadState};
pub use events::{parse_event_line, parse_event_log, read_event_log, Event, EventKey, EventKind};
pub use resources::{extract, to_profile};
pub use schema::{CollectorInfo, Profile, ProfileHeader, Resource, Uid};
pub use thread_parent::{NearestPriorThread, NoParent, ParentStrategyKind, ParentThreadStrategy};
