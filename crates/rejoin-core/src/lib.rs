//! Core decision rules and scheduler for rejoind
//!
//! This crate is the heart of rejoind, containing:
//! - Decision rules (presence observation -> status and action)
//! - Per-instance state (Idle -> Checking -> Idle, plus detached Acting)
//! - The action dispatcher (stop, settle, launch)
//! - The tick-driven scheduler and throttled reporting

mod decision;
mod dispatch;
mod instance;
mod reporting;
mod scheduler;

pub use decision::*;
pub use dispatch::*;
pub use instance::*;
pub use reporting::*;
pub use scheduler::*;
