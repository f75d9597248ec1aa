//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Scheduler and host settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Presence service endpoints
    #[serde(default)]
    pub presence: RawPresenceConfig,

    /// How the app is (re)launched
    #[serde(default)]
    pub launch: RawLaunchConfig,

    /// Optional status webhook
    #[serde(default)]
    pub reporter: Option<RawReporterConfig>,

    /// Managed instances
    #[serde(default)]
    pub instances: Vec<RawInstance>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Driver tick in seconds (default: 1)
    pub tick_seconds: Option<u64>,

    /// Ticks between report triggers (default: 30)
    pub report_every_ticks: Option<u32>,

    /// Wrap `am` commands in `su -c`
    #[serde(default)]
    pub use_su: bool,

    /// Acquire a Termux wake lock at startup
    #[serde(default)]
    pub wake_lock: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPresenceConfig {
    pub presence_url: Option<String>,
    pub account_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLaunchConfig {
    /// Deep-link scheme (default: roblox)
    pub scheme: Option<String>,

    /// Activity that handles the deep link
    pub activity: Option<String>,

    /// Pause between stop and launch, in milliseconds
    pub settle_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawReporterConfig {
    pub webhook_url: String,

    /// Shown as the embed author
    pub device_name: Option<String>,

    /// Minimum minutes between sends (default: 60)
    pub interval_minutes: Option<u64>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Attach a screenshot when one can be captured
    #[serde(default = "default_true")]
    pub screenshot: bool,

    pub screenshot_path: Option<PathBuf>,
}

/// Raw instance definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawInstance {
    /// App package name
    pub id: String,

    /// Display label (defaults to the id)
    pub label: Option<String>,

    /// Resolved from the session at startup when absent
    pub account_id: Option<u64>,

    /// Display only
    pub username: Option<String>,

    /// Inline session credential
    pub session: Option<String>,

    /// File holding the session credential
    pub session_file: Option<PathBuf>,

    /// Environment variable holding the session credential
    pub session_env: Option<String>,

    /// Target root location
    pub target: Option<String>,

    /// Sub-location (private server) token
    pub sub_token: Option<String>,

    /// Share link; supplies target and sub-token
    pub private_link: Option<String>,

    pub poll_interval_seconds: Option<u64>,

    #[serde(default)]
    pub disabled: bool,
}

fn default_true() -> bool {
    true
}
