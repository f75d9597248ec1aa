//! Shared utilities for rejoind
//!
//! This crate provides:
//! - ID types (InstanceId, AccountId, LocationId, SessionHandle, RunId)
//! - Time utilities (monotonic time, countdown and uptime formatting)
//! - Default configuration and scratch paths
//! - Minimum-interval throttling for outbound reports

mod ids;
mod paths;
mod throttle;
mod time;

pub use ids::*;
pub use paths::*;
pub use throttle::*;
pub use time::*;
