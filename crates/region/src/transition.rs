use crate::{Coordinate, PresenceState, RegionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of boundary crossing reported by the monitoring collaborator.
///
/// Numeric codes follow the platform geofencing API (1, 2, 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Enter,
    Exit,
    Dwell,
}

impl TransitionKind {
    pub fn code(&self) -> i32 {
        match self {
            TransitionKind::Enter => 1,
            TransitionKind::Exit => 2,
            TransitionKind::Dwell => 4,
        }
    }

    /// Presence implied by this transition. Only enter and exit map.
    pub fn presence(&self) -> Result<PresenceState, RegionError> {
        match self {
            TransitionKind::Enter => Ok(PresenceState::Inside),
            TransitionKind::Exit => Ok(PresenceState::Outside),
            TransitionKind::Dwell => Err(RegionError::InvalidEventKind(self.to_string())),
        }
    }
}

impl TryFrom<i32> for TransitionKind {
    type Error = RegionError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TransitionKind::Enter),
            2 => Ok(TransitionKind::Exit),
            4 => Ok(TransitionKind::Dwell),
            other => Err(RegionError::InvalidEventKind(format!("code {other}"))),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Enter => f.write_str("enter"),
            TransitionKind::Exit => f.write_str("exit"),
            TransitionKind::Dwell => f.write_str("dwell"),
        }
    }
}

/// A single boundary crossing. Consumed once by the tracker, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    #[serde(flatten)]
    pub location: Coordinate,
    pub accuracy_meters: f32,
    pub timestamp_millis: i64,
}

impl TransitionEvent {
    pub fn new(
        kind: TransitionKind,
        location: Coordinate,
        accuracy_meters: f32,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            kind,
            location,
            accuracy_meters,
            timestamp_millis,
        }
    }

    /// Event stamped with the current wall clock.
    pub fn now(kind: TransitionKind, location: Coordinate, accuracy_meters: f32) -> Self {
        Self::new(
            kind,
            location,
            accuracy_meters,
            Utc::now().timestamp_millis(),
        )
    }

    /// Timestamp as a UTC datetime, if representable.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}
