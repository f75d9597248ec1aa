//! Shared types for rejoind
//!
//! This crate defines the data passed between the scheduler, the host
//! adapters and the reporter:
//! - Presence observations
//! - Decisions and rejoin actions
//! - Per-instance status and aggregate snapshots

mod action;
mod presence;
mod status;

pub use action::*;
pub use presence::*;
pub use status::*;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;
