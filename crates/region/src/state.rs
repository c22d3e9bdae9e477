use crate::RegionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Best-known inside/outside status for the active region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Inside,
    Outside,
    #[default]
    Unknown,
}

impl PresenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::Inside => "inside",
            PresenceState::Outside => "outside",
            PresenceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceState {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inside" => Ok(PresenceState::Inside),
            "outside" => Ok(PresenceState::Outside),
            "unknown" => Ok(PresenceState::Unknown),
            other => Err(RegionError::InvalidPresence(other.to_string())),
        }
    }
}

/// Registration lifecycle of the monitored region.
///
/// ```text
/// Idle --activate--> Activating --confirmed--> Active
///                    Activating --failed-----> Error(reason)
/// Error --retry----> Activating
/// any  --deactivate--> Idle
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Activating,
    Active,
    Error(String),
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }

    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Status::Error(reason) => Some(reason.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => f.write_str("idle"),
            Status::Activating => f.write_str("activating"),
            Status::Active => f.write_str("active"),
            Status::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}
