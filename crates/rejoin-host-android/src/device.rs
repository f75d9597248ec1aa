//! Device helpers

use nix::unistd::Uid;
use rejoin_host_api::HostResult;
use tracing::info;

use crate::process::HostCommand;

/// Whether the daemon runs with root privileges
pub fn is_root() -> bool {
    Uid::effective().is_root()
}

/// Keep the CPU awake while the daemon runs (Termux only)
pub async fn acquire_wake_lock() -> HostResult<()> {
    HostCommand::new("termux-wake-lock").run().await?;
    info!("Wake lock acquired");
    Ok(())
}

pub async fn release_wake_lock() -> HostResult<()> {
    HostCommand::new("termux-wake-unlock").run().await?;
    info!("Wake lock released");
    Ok(())
}
