//! Validated run configuration

use crate::schema::{
    RawConfig, RawInstance, RawLaunchConfig, RawPresenceConfig, RawReporterConfig,
    RawServiceConfig,
};
use crate::session::SessionSource;
use crate::validation::{ValidationError, parse_private_link, validate_instance};
use rejoin_util::{AccountId, InstanceId, LocationId, SessionHandle, default_screenshot_path};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub const MIN_POLL_INTERVAL_SECS: u64 = 15;
pub const MAX_POLL_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_TICK_SECS: u64 = 1;
pub const DEFAULT_REPORT_EVERY_TICKS: u32 = 30;
pub const DEFAULT_PRESENCE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
pub const DEFAULT_REPORT_INTERVAL_MINUTES: u64 = 60;

pub const MAX_TICK_SECS: u64 = 60;
pub const MAX_PRESENCE_TIMEOUT_SECS: u64 = 300;
pub const MAX_SETTLE_DELAY_MS: u64 = 60_000;
/// One day
pub const MAX_REPORT_INTERVAL_MINUTES: u64 = 1440;

pub const DEFAULT_PRESENCE_URL: &str = "https://presence.roproxy.com/v1/presence/users";
pub const DEFAULT_ACCOUNT_URL: &str = "https://users.roblox.com/v1/users/authenticated";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; Termux)";
pub const DEFAULT_LAUNCH_SCHEME: &str = "roblox";
pub const DEFAULT_LAUNCH_ACTIVITY: &str = "com.roblox.client.ActivityProtocolLaunch";

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub service: ServiceConfig,
    pub presence: PresenceConfig,
    pub launch: LaunchConfig,
    /// `None` when no reporter is configured or it is disabled
    pub reporter: Option<ReporterConfig>,
    /// Admitted instances
    pub instances: Vec<InstanceConfig>,
    /// Instances excluded by validation
    pub rejected: Vec<RejectedInstance>,
    /// Instances marked `disabled = true`
    pub disabled: Vec<InstanceId>,
}

impl RunConfig {
    /// Convert from raw config (after global validation).
    ///
    /// Instance validation happens here: invalid instances land in
    /// `rejected` and the rest of the run is unaffected.
    pub fn from_raw(raw: RawConfig) -> Self {
        let mut instances = Vec::new();
        let mut rejected = Vec::new();
        let mut disabled = Vec::new();
        let mut seen_ids = HashSet::new();

        for inst in raw.instances {
            if !seen_ids.insert(inst.id.clone()) {
                rejected.push(RejectedInstance {
                    id: inst.id.clone(),
                    errors: vec![ValidationError::DuplicateInstanceId(inst.id)],
                });
                continue;
            }

            if inst.disabled {
                disabled.push(InstanceId::new(inst.id));
                continue;
            }

            let errors = validate_instance(&inst);
            if !errors.is_empty() {
                rejected.push(RejectedInstance { id: inst.id, errors });
                continue;
            }

            match InstanceConfig::from_raw(inst) {
                Ok(config) => instances.push(config),
                Err(rejection) => rejected.push(rejection),
            }
        }

        Self {
            service: ServiceConfig::from_raw(raw.service),
            presence: PresenceConfig::from_raw(raw.presence),
            launch: LaunchConfig::from_raw(raw.launch),
            reporter: raw.reporter.and_then(ReporterConfig::from_raw),
            instances,
            rejected,
            disabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub tick: Duration,
    pub report_every_ticks: u32,
    pub use_su: bool,
    pub wake_lock: bool,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            tick: Duration::from_secs(raw.tick_seconds.unwrap_or(DEFAULT_TICK_SECS)),
            report_every_ticks: raw.report_every_ticks.unwrap_or(DEFAULT_REPORT_EVERY_TICKS),
            use_su: raw.use_su,
            wake_lock: raw.wake_lock,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub presence_url: String,
    pub account_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl PresenceConfig {
    fn from_raw(raw: RawPresenceConfig) -> Self {
        Self {
            presence_url: raw
                .presence_url
                .unwrap_or_else(|| DEFAULT_PRESENCE_URL.to_string()),
            account_url: raw
                .account_url
                .unwrap_or_else(|| DEFAULT_ACCOUNT_URL.to_string()),
            timeout: Duration::from_secs(
                raw.timeout_seconds.unwrap_or(DEFAULT_PRESENCE_TIMEOUT_SECS),
            ),
            user_agent: raw
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self::from_raw(RawPresenceConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub scheme: String,
    pub activity: String,
    pub settle_delay: Duration,
}

impl LaunchConfig {
    fn from_raw(raw: RawLaunchConfig) -> Self {
        Self {
            scheme: raw.scheme.unwrap_or_else(|| DEFAULT_LAUNCH_SCHEME.to_string()),
            activity: raw
                .activity
                .unwrap_or_else(|| DEFAULT_LAUNCH_ACTIVITY.to_string()),
            settle_delay: Duration::from_millis(
                raw.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS),
            ),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self::from_raw(RawLaunchConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub webhook_url: String,
    pub device_name: String,
    pub interval: Duration,
    pub screenshot: bool,
    pub screenshot_path: PathBuf,
}

impl ReporterConfig {
    fn from_raw(raw: RawReporterConfig) -> Option<Self> {
        if !raw.enabled {
            return None;
        }
        Some(Self {
            webhook_url: raw.webhook_url,
            device_name: raw.device_name.unwrap_or_else(|| "rejoind".to_string()),
            interval: Duration::from_secs(
                raw.interval_minutes
                    .unwrap_or(DEFAULT_REPORT_INTERVAL_MINUTES)
                    .saturating_mul(60),
            ),
            screenshot: raw.screenshot,
            screenshot_path: raw.screenshot_path.unwrap_or_else(default_screenshot_path),
        })
    }
}

/// Validated instance definition
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub id: InstanceId,
    pub label: String,
    pub account_id: Option<AccountId>,
    pub username: Option<String>,
    pub session: SessionSource,
    pub target: LocationId,
    pub sub_token: Option<String>,
    pub poll_interval: Duration,
}

impl InstanceConfig {
    /// Explicit `target` and `sub_token` win over values from `private_link`.
    fn from_raw(raw: RawInstance) -> Result<Self, RejectedInstance> {
        let from_link = match &raw.private_link {
            Some(link) => match parse_private_link(link) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    return Err(RejectedInstance {
                        id: raw.id,
                        errors: vec![e],
                    });
                }
            },
            None => None,
        };

        let (link_target, link_code) = match from_link {
            Some((place, code)) => (Some(place), Some(code)),
            None => (None, None),
        };

        let Some(target) = raw.target.or(link_target) else {
            return Err(RejectedInstance {
                errors: vec![ValidationError::InstanceError {
                    instance_id: raw.id.clone(),
                    message: "no target".into(),
                }],
                id: raw.id,
            });
        };

        let session = if let Some(value) = raw.session {
            SessionSource::Inline(SessionHandle::new(value.trim()))
        } else if let Some(path) = raw.session_file {
            SessionSource::File(path)
        } else if let Some(var) = raw.session_env {
            SessionSource::Env(var)
        } else {
            return Err(RejectedInstance {
                errors: vec![ValidationError::InstanceError {
                    instance_id: raw.id.clone(),
                    message: "no session source".into(),
                }],
                id: raw.id,
            });
        };

        Ok(Self {
            label: raw.label.unwrap_or_else(|| raw.id.clone()),
            id: InstanceId::new(raw.id),
            account_id: raw.account_id.map(AccountId::new),
            username: raw.username,
            session,
            target: LocationId::new(target),
            sub_token: raw.sub_token.or(link_code),
            poll_interval: Duration::from_secs(
                raw.poll_interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
        })
    }
}

/// An instance excluded from the run, with every reason
#[derive(Debug, Clone)]
pub struct RejectedInstance {
    pub id: String,
    pub errors: Vec<ValidationError>,
}
