//! Decisions and the rejoin actions they produce

use rejoin_util::LocationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an instance after a presence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// Not checked yet
    Initializing,
    /// Presence could not be determined
    Unknown,
    /// Offline or online outside any app
    Offline,
    /// Online in something other than the app
    NotInApp,
    /// In the app, at the wrong location
    WrongLocation,
    /// In the app at the target location
    OnTarget,
}

impl StatusClass {
    /// Whether this classification means the instance is where it should be
    pub fn is_healthy(&self) -> bool {
        matches!(self, StatusClass::OnTarget)
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusClass::Initializing => "initializing",
            StatusClass::Unknown => "unknown",
            StatusClass::Offline => "offline",
            StatusClass::NotInApp => "not in game",
            StatusClass::WrongLocation => "wrong place",
            StatusClass::OnTarget => "in game",
        };
        f.write_str(s)
    }
}

/// Outcome of evaluating one observation against a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub class: StatusClass,
    pub detail: String,
    pub action_required: bool,
    /// Relaunch without stopping the app first
    pub skip_kill: bool,
}

impl Decision {
    pub fn no_action(class: StatusClass, detail: impl Into<String>) -> Self {
        Self {
            class,
            detail: detail.into(),
            action_required: false,
            skip_kill: false,
        }
    }

    pub fn relaunch(class: StatusClass, detail: impl Into<String>, skip_kill: bool) -> Self {
        Self {
            class,
            detail: detail.into(),
            action_required: true,
            skip_kill,
        }
    }

    /// Build the action this decision asks for, if any
    pub fn to_action(&self, target: &LocationId, sub_token: Option<&str>) -> Option<RejoinAction> {
        if !self.action_required {
            return None;
        }
        Some(RejoinAction {
            stop_first: !self.skip_kill,
            target: target.clone(),
            sub_token: sub_token.map(str::to_string),
        })
    }
}

/// Relaunch request handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejoinAction {
    pub stop_first: bool,
    pub target: LocationId,
    pub sub_token: Option<String>,
}

/// Deep-link URI that opens the app at a location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LaunchUri(String);

impl LaunchUri {
    /// `<scheme>://placeID=<target>[&linkCode=<sub_token>]`
    pub fn build(scheme: &str, target: &LocationId, sub_token: Option<&str>) -> Self {
        let mut uri = format!("{}://placeID={}", scheme, target);
        if let Some(token) = sub_token.filter(|t| !t.is_empty()) {
            uri.push_str("&linkCode=");
            uri.push_str(token);
        }
        Self(uri)
    }

    pub fn for_action(scheme: &str, action: &RejoinAction) -> Self {
        Self::build(scheme, &action.target, action.sub_token.as_deref())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LaunchUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
