//! Presence observations returned by the presence service

use rejoin_util::LocationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of presence reported for an account.
///
/// Serialized as the raw service code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum PresenceType {
    /// Code 0
    Offline,
    /// Code 1: online, not inside any app
    Away,
    /// Code 2
    InApp,
    /// Code 3: inside the authoring tool
    InStudio,
    /// Any code this daemon does not know about
    Other(i64),
}

impl PresenceType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => PresenceType::Offline,
            1 => PresenceType::Away,
            2 => PresenceType::InApp,
            3 => PresenceType::InStudio,
            other => PresenceType::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            PresenceType::Offline => 0,
            PresenceType::Away => 1,
            PresenceType::InApp => 2,
            PresenceType::InStudio => 3,
            PresenceType::Other(code) => *code,
        }
    }
}

impl From<i64> for PresenceType {
    fn from(code: i64) -> Self {
        PresenceType::from_code(code)
    }
}

impl From<PresenceType> for i64 {
    fn from(presence: PresenceType) -> Self {
        presence.code()
    }
}

impl fmt::Display for PresenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceType::Offline => write!(f, "offline"),
            PresenceType::Away => write!(f, "online"),
            PresenceType::InApp => write!(f, "in game"),
            PresenceType::InStudio => write!(f, "in studio"),
            PresenceType::Other(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// Result of one successful presence query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Missing when the service returned no presence entry or no type
    pub presence_type: Option<PresenceType>,
    /// Root location the account currently occupies
    pub location: Option<LocationId>,
    /// Raw presence code, kept for display
    pub raw_code: Option<i64>,
}

impl Observation {
    pub fn new(presence_type: PresenceType, location: Option<LocationId>) -> Self {
        Self {
            presence_type: Some(presence_type),
            location,
            raw_code: Some(presence_type.code()),
        }
    }

    /// Observation with no presence information at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self::new(PresenceType::Offline, None)
    }

    pub fn in_app(location: impl Into<LocationId>) -> Self {
        Self::new(PresenceType::InApp, Some(location.into()))
    }
}
