//! Best-effort screen capture

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::process::HostCommand;

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Capture attempts, in order
fn capture_commands(path: &Path) -> Vec<HostCommand> {
    let target = path.display().to_string();
    vec![
        HostCommand::new("screencap").args(["-p", target.as_str()]),
        HostCommand::new("screencap")
            .args(["-p", target.as_str()])
            .with_su(true),
        HostCommand::new("/system/bin/screencap").args(["-p", target.as_str()]),
    ]
}

/// Capture the screen as PNG into `path`.
///
/// Returns `None` if every capture method fails.
pub async fn capture_screenshot(path: &Path) -> Option<PathBuf> {
    for cmd in capture_commands(path) {
        let cmd = cmd.with_timeout(CAPTURE_TIMEOUT);
        match cmd.run().await {
            Ok(_) if path.exists() => {
                debug!(path = %path.display(), "Screenshot captured");
                return Some(path.to_path_buf());
            }
            Ok(_) => {}
            Err(e) => {
                debug!(command = %cmd.shell_line(), error = %e, "Screenshot attempt failed");
            }
        }
    }

    warn!("Could not capture screenshot");
    None
}
