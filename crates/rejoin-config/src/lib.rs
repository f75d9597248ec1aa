//! Configuration parsing and validation for rejoind
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Service, presence, launch and reporter sections
//! - Instance definitions with session sources and targets
//! - Validation that excludes bad instances without failing the run

mod run_config;
mod schema;
mod session;
mod validation;

pub use run_config::*;
pub use schema::*;
pub use session::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),

    #[error("Session for '{instance}': {message}")]
    Session { instance: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<RunConfig> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading configuration");
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<RunConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_global(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(RunConfig::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [[instances]]
            id = "com.roblox.client"
            session = "cookie"
            target = "2753915549"
        "#;

        let run = parse_config(config).unwrap();
        assert_eq!(run.instances.len(), 1);
        let inst = &run.instances[0];
        assert_eq!(inst.id.as_str(), "com.roblox.client");
        assert_eq!(inst.label, "com.roblox.client");
        assert_eq!(inst.poll_interval, Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        assert!(inst.account_id.is_none());

        assert_eq!(run.service.tick, Duration::from_secs(1));
        assert_eq!(run.service.report_every_ticks, 30);
        assert_eq!(run.presence.timeout, Duration::from_secs(10));
        assert_eq!(run.launch.settle_delay, Duration::from_secs(1));
        assert_eq!(run.launch.scheme, "roblox");
        assert!(run.reporter.is_none());
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn invalid_instance_is_excluded_not_fatal() {
        let config = r#"
            config_version = 1

            [[instances]]
            id = "com.roblox.client"
            session = "a"
            target = "1"
            poll_interval_seconds = 15

            [[instances]]
            id = "com.roblox.client.vnggames"
            session = "b"
            target = "1"
            poll_interval_seconds = 5

            [[instances]]
            id = "com.roblox.client"
            session = "c"
            target = "2"
        "#;

        let run = parse_config(config).unwrap();
        assert_eq!(run.instances.len(), 1);
        assert_eq!(run.rejected.len(), 2);
        assert!(
            run.rejected
                .iter()
                .any(|r| matches!(r.errors[0], ValidationError::DuplicateInstanceId(_)))
        );
    }

    #[test]
    fn private_link_fills_target_and_token() {
        let config = r#"
            config_version = 1

            [[instances]]
            id = "com.roblox.client"
            session_env = "ROBLOX_COOKIE"
            private_link = "https://www.roblox.com/games/2753915549/x?privateServerLinkCode=abc"
        "#;

        let run = parse_config(config).unwrap();
        let inst = &run.instances[0];
        assert_eq!(inst.target.as_str(), "2753915549");
        assert_eq!(inst.sub_token.as_deref(), Some("abc"));
        assert!(matches!(inst.session, SessionSource::Env(_)));
    }

    #[test]
    fn disabled_instances_are_listed() {
        let config = r#"
            config_version = 1

            [[instances]]
            id = "com.roblox.client"
            session = "a"
            target = "1"
            disabled = true
        "#;

        let run = parse_config(config).unwrap();
        assert!(run.instances.is_empty());
        assert!(run.rejected.is_empty());
        assert_eq!(run.disabled.len(), 1);
    }

    #[test]
    fn reporter_defaults() {
        let config = r#"
            config_version = 1

            [reporter]
            webhook_url = "https://discord.com/api/webhooks/1/abc"
        "#;

        let run = parse_config(config).unwrap();
        let reporter = run.reporter.unwrap();
        assert_eq!(reporter.interval, Duration::from_secs(3600));
        assert!(reporter.screenshot);
    }

    #[test]
    fn global_error_is_fatal() {
        let config = r#"
            config_version = 1

            [service]
            report_every_ticks = 0
        "#;

        assert!(matches!(
            parse_config(config),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn huge_report_interval_is_a_validation_error() {
        let config = r#"
            config_version = 1

            [reporter]
            webhook_url = "https://discord.com/api/webhooks/1/x"
            interval_minutes = 9223372036854775807
        "#;

        assert!(matches!(
            parse_config(config),
            Err(ConfigError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn report_interval_at_limit_is_accepted() {
        let config = r#"
            config_version = 1

            [reporter]
            webhook_url = "https://discord.com/api/webhooks/1/x"
            interval_minutes = 1440
        "#;

        let run = parse_config(config).unwrap();
        let reporter = run.reporter.unwrap();
        assert_eq!(reporter.interval, std::time::Duration::from_secs(86_400));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            config_version = 1

            [[instances]]
            id = "com.roblox.client"
            session = "a"
            target = "1"
            "#
        )
        .unwrap();

        let run = load_config(file.path()).unwrap();
        assert_eq!(run.instances.len(), 1);
    }
}
