//! Android host adapters for rejoind
//!
//! Provides:
//! - App control through the activity manager (`am`)
//! - The presence service HTTP client
//! - The webhook status reporter with host metrics and screenshots
//! - Device helpers (root check, wake lock)

mod adapter;
mod device;
mod metrics;
mod presence;
mod process;
mod screenshot;
mod webhook;

pub use adapter::*;
pub use device::*;
pub use metrics::*;
pub use presence::*;
pub use process::*;
pub use screenshot::*;
pub use webhook::*;
