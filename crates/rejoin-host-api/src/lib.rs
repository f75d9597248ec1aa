//! Host adapter trait interfaces for rejoind
//!
//! This crate defines the seams between the scheduler core and the outside
//! world: the presence service, the OS app controller and the status
//! reporter. It contains no platform code itself.

mod controller;
mod mock;
mod presence;
mod reporter;

pub use controller::*;
pub use mock::*;
pub use presence::*;
pub use reporter::*;
