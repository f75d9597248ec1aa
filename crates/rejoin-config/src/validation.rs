//! Configuration validation
//!
//! Global errors abort the whole run. Instance errors only exclude the
//! instance they belong to.

use crate::run_config::{
    MAX_POLL_INTERVAL_SECS, MAX_PRESENCE_TIMEOUT_SECS, MAX_REPORT_INTERVAL_MINUTES,
    MAX_SETTLE_DELAY_MS, MAX_TICK_SECS, MIN_POLL_INTERVAL_SECS,
};
use crate::schema::{RawConfig, RawInstance};
use thiserror::Error;
use url::Url;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Instance '{instance_id}': {message}")]
    InstanceError { instance_id: String, message: String },

    #[error("Duplicate instance ID: {0}")]
    DuplicateInstanceId(String),

    #[error("Invalid private link '{link}': {message}")]
    InvalidPrivateLink { link: String, message: String },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate the sections shared by every instance.
///
/// Any error returned here is fatal.
pub fn validate_global(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    check_range(&mut errors, "service.tick_seconds", config.service.tick_seconds, 1, MAX_TICK_SECS);
    if config.service.report_every_ticks == Some(0) {
        errors.push(ValidationError::GlobalError(
            "service.report_every_ticks must be at least 1".into(),
        ));
    }
    check_range(
        &mut errors,
        "presence.timeout_seconds",
        config.presence.timeout_seconds,
        1,
        MAX_PRESENCE_TIMEOUT_SECS,
    );
    check_range(
        &mut errors,
        "launch.settle_delay_ms",
        config.launch.settle_delay_ms,
        0,
        MAX_SETTLE_DELAY_MS,
    );

    for (field, value) in [
        ("presence.presence_url", &config.presence.presence_url),
        ("presence.account_url", &config.presence.account_url),
    ] {
        if let Some(url) = value
            && let Err(message) = check_http_url(url)
        {
            errors.push(ValidationError::GlobalError(format!("{}: {}", field, message)));
        }
    }

    if let Some(scheme) = &config.launch.scheme
        && (scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)))
    {
        errors.push(ValidationError::GlobalError(format!(
            "launch.scheme '{}' is not a valid URI scheme",
            scheme
        )));
    }

    if let Some(reporter) = &config.reporter {
        if reporter.enabled
            && let Err(message) = check_http_url(&reporter.webhook_url)
        {
            errors.push(ValidationError::GlobalError(format!(
                "reporter.webhook_url: {}",
                message
            )));
        }
        check_range(
            &mut errors,
            "reporter.interval_minutes",
            reporter.interval_minutes,
            1,
            MAX_REPORT_INTERVAL_MINUTES,
        );
    }

    errors
}

fn check_range(errors: &mut Vec<ValidationError>, field: &str, value: Option<u64>, min: u64, max: u64) {
    if let Some(value) = value
        && !(min..=max).contains(&value)
    {
        errors.push(ValidationError::GlobalError(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
}

/// Validate one instance in isolation
pub fn validate_instance(instance: &RawInstance) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let err = |message: String| ValidationError::InstanceError {
        instance_id: instance.id.clone(),
        message,
    };

    if !is_package_name(&instance.id) {
        errors.push(err(format!(
            "id '{}' is not a package name (letters, digits, '_' and '.', at least one '.')",
            instance.id
        )));
    }

    let sources = [
        instance.session.is_some(),
        instance.session_file.is_some(),
        instance.session_env.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    match sources {
        0 => errors.push(err(
            "no session source (set one of session, session_file, session_env)".into(),
        )),
        1 => {
            if instance.session.as_deref().is_some_and(|s| s.trim().is_empty()) {
                errors.push(err("session cannot be empty".into()));
            }
        }
        _ => errors.push(err(
            "only one of session, session_file, session_env may be set".into(),
        )),
    }

    if instance.target.is_none() && instance.private_link.is_none() {
        errors.push(err("no target (set target or private_link)".into()));
    }
    if let Some(target) = &instance.target
        && !is_numeric_id(target)
    {
        errors.push(err(format!("target '{}' must be a numeric place id", target)));
    }
    if let Some(link) = &instance.private_link
        && let Err(e) = parse_private_link(link)
    {
        errors.push(e);
    }

    if let Some(token) = &instance.sub_token
        && !is_link_code(token)
    {
        errors.push(err(format!("sub_token '{}' contains invalid characters", token)));
    }

    if let Some(secs) = instance.poll_interval_seconds
        && !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&secs)
    {
        errors.push(err(format!(
            "poll_interval_seconds {} is outside {}..={}",
            secs, MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS
        )));
    }

    errors
}

/// Extract `(place id, link code)` from a private server share link.
///
/// Accepts links like
/// `https://www.roblox.com/games/2753915549/Name?privateServerLinkCode=abc`.
/// The scheme may be omitted.
pub fn parse_private_link(link: &str) -> Result<(String, String), ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidPrivateLink {
        link: link.to_string(),
        message: message.to_string(),
    };

    let trimmed = link.trim();
    let url = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{}", trimmed)))
        .map_err(|_| invalid("not a URL"))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| invalid("URL has no path"))?;
    segments
        .by_ref()
        .find(|s| *s == "games")
        .ok_or_else(|| invalid("missing /games/<place id>"))?;
    let place = segments
        .next()
        .filter(|s| is_numeric_id(s))
        .ok_or_else(|| invalid("missing numeric place id after /games/"))?;

    let (_, code) = url
        .query_pairs()
        .next()
        .ok_or_else(|| invalid("missing link code query parameter"))?;
    if !is_link_code(&code) {
        return Err(invalid("link code is empty or contains invalid characters"));
    }

    Ok((place.to_string(), code.into_owned()))
}

/// Android-style package name
pub fn is_package_name(id: &str) -> bool {
    !id.is_empty()
        && id.contains('.')
        && !id.starts_with('.')
        && !id.ends_with('.')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_link_code(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn check_http_url(value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("invalid URL '{}': {}", value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}' (expected http or https)", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str) -> RawInstance {
        RawInstance {
            id: id.into(),
            label: None,
            account_id: Some(1),
            username: None,
            session: Some("cookie".into()),
            session_file: None,
            session_env: None,
            target: Some("2753915549".into()),
            sub_token: None,
            private_link: None,
            poll_interval_seconds: Some(30),
            disabled: false,
        }
    }

    #[test]
    fn valid_instance_has_no_errors() {
        assert!(validate_instance(&instance("com.roblox.client")).is_empty());
    }

    #[test]
    fn package_names() {
        assert!(is_package_name("com.roblox.client"));
        assert!(is_package_name("com.roblox.client_2"));
        assert!(!is_package_name("roblox"));
        assert!(!is_package_name("com.roblox client"));
        assert!(!is_package_name(".com.roblox"));
        assert!(!is_package_name(""));
    }

    #[test]
    fn interval_bounds() {
        let mut inst = instance("com.roblox.client");
        inst.poll_interval_seconds = Some(15);
        assert!(validate_instance(&inst).is_empty());
        inst.poll_interval_seconds = Some(120);
        assert!(validate_instance(&inst).is_empty());
        inst.poll_interval_seconds = Some(14);
        assert_eq!(validate_instance(&inst).len(), 1);
        inst.poll_interval_seconds = Some(121);
        assert_eq!(validate_instance(&inst).len(), 1);
    }

    #[test]
    fn session_sources_are_exclusive() {
        let mut inst = instance("com.roblox.client");
        inst.session_env = Some("COOKIE".into());
        assert_eq!(validate_instance(&inst).len(), 1);

        inst.session = None;
        inst.session_env = None;
        assert_eq!(validate_instance(&inst).len(), 1);
    }

    #[test]
    fn target_must_be_numeric() {
        let mut inst = instance("com.roblox.client");
        inst.target = Some("place-one".into());
        assert_eq!(validate_instance(&inst).len(), 1);

        inst.target = None;
        assert_eq!(validate_instance(&inst).len(), 1);
    }

    #[test]
    fn parse_share_link() {
        let (place, code) = parse_private_link(
            "https://www.roblox.com/games/2753915549/Blox-Fruits?privateServerLinkCode=8123-abc_X",
        )
        .unwrap();
        assert_eq!(place, "2753915549");
        assert_eq!(code, "8123-abc_X");
    }

    #[test]
    fn parse_share_link_without_scheme() {
        let (place, code) =
            parse_private_link("www.roblox.com/games/123?privateServerLinkCode=xyz").unwrap();
        assert_eq!(place, "123");
        assert_eq!(code, "xyz");
    }

    #[test]
    fn reject_bad_share_links() {
        assert!(parse_private_link("https://www.roblox.com/games/2753915549/Blox").is_err());
        assert!(parse_private_link("https://www.roblox.com/users/1?code=x").is_err());
        assert!(parse_private_link("https://www.roblox.com/games/abc?code=x").is_err());
        assert!(parse_private_link("https://www.roblox.com/games/1?code=a%20b").is_err());
    }

    #[test]
    fn private_link_supplies_target() {
        let mut inst = instance("com.roblox.client");
        inst.target = None;
        inst.private_link =
            Some("https://www.roblox.com/games/1/x?privateServerLinkCode=abc".into());
        assert!(validate_instance(&inst).is_empty());
    }

    #[test]
    fn global_errors() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1

            [service]
            tick_seconds = 0

            [reporter]
            webhook_url = "ftp://example.com/hook"
            "#,
        )
        .unwrap();

        assert_eq!(validate_global(&raw).len(), 2);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1

            [service]
            tick_seconds = 9223372036854775807

            [presence]
            timeout_seconds = 100000

            [launch]
            settle_delay_ms = 9223372036854775807

            [reporter]
            webhook_url = "https://discord.com/api/webhooks/1/x"
            interval_minutes = 9223372036854775807
            "#,
        )
        .unwrap();

        let errors = validate_global(&raw);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::GlobalError(_))));
    }

    #[test]
    fn disabled_reporter_url_is_not_checked() {
        let raw: RawConfig = toml::from_str(
            r#"
            config_version = 1

            [reporter]
            webhook_url = ""
            enabled = false
            "#,
        )
        .unwrap();

        assert!(validate_global(&raw).is_empty());
    }
}
