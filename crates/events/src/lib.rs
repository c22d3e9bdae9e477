//! Event contracts for geofence observers.
//!
//! The tracker emits these DTOs on an [`EventBus`] whenever presence or
//! registration status changes, so a presentation or notification layer can
//! react without polling. Shared types keep producer and consumer field
//! names in lockstep.

mod bus;

pub use bus::{
    EventBus, EventBusExt, EventBusRef, NullEventBus, RecordedEvent, RecordingEventBus,
    TracingEventBus,
};

use geofence_region::{PresenceState, Region, Status, TransitionEvent, TransitionKind};
use serde::{Deserialize, Serialize};

/// A notification payload bound to its topic.
pub trait GeofenceEvent: Serialize {
    const TOPIC: &'static str;
}

/// Emitted when a transition changes the stored presence.
///
/// Producers: tracker
/// Consumers: notification layer, UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceChangedEvent {
    pub presence: PresenceState,
    pub previous: PresenceState,
    pub kind: TransitionKind,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f32,
    pub timestamp_millis: i64,
    /// Region the transition applied to.
    #[serde(default)]
    pub region: Option<Region>,
}

impl PresenceChangedEvent {
    pub fn new(
        event: &TransitionEvent,
        previous: PresenceState,
        presence: PresenceState,
        region: Option<Region>,
    ) -> Self {
        Self {
            presence,
            previous,
            kind: event.kind,
            latitude: event.location.latitude,
            longitude: event.location.longitude,
            accuracy_meters: event.accuracy_meters,
            timestamp_millis: event.timestamp_millis,
            region,
        }
    }
}

/// Emitted on every registration status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    pub status: Status,
    pub previous: Status,
}

/// Emitted when a transition event is dropped without touching presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDiscardedEvent {
    pub kind: TransitionKind,
    pub reason: String,
    pub timestamp_millis: i64,
}

/// Emitted when the monitoring collaborator fails outside a caller's path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorErrorEvent {
    /// "register" or "unregister".
    pub operation: String,
    pub error: String,
}

impl GeofenceEvent for PresenceChangedEvent {
    const TOPIC: &'static str = event_names::PRESENCE_CHANGED;
}

impl GeofenceEvent for StatusChangedEvent {
    const TOPIC: &'static str = event_names::STATUS_CHANGED;
}

impl GeofenceEvent for TransitionDiscardedEvent {
    const TOPIC: &'static str = event_names::TRANSITION_DISCARDED;
}

impl GeofenceEvent for MonitorErrorEvent {
    const TOPIC: &'static str = event_names::MONITOR_ERROR;
}

/// Topic names, shared by producers and any consumer matching on strings.
pub mod event_names {
    pub const PRESENCE_CHANGED: &str = "geofence:presence_changed";
    pub const STATUS_CHANGED: &str = "geofence:status_changed";
    pub const TRANSITION_DISCARDED: &str = "geofence:transition_discarded";
    pub const MONITOR_ERROR: &str = "geofence:monitor_error";
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofence_region::Coordinate;

    #[test]
    fn test_presence_changed_from_transition() {
        let event = TransitionEvent::new(
            TransitionKind::Enter,
            Coordinate::new(37.0, -122.0),
            8.0,
            42,
        );
        let dto = PresenceChangedEvent::new(
            &event,
            PresenceState::Unknown,
            PresenceState::Inside,
            None,
        );
        assert_eq!(dto.kind, TransitionKind::Enter);
        assert_eq!(dto.latitude, 37.0);
        assert_eq!(dto.timestamp_millis, 42);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["presence"], "inside");
        assert_eq!(json["previous"], "unknown");
    }

    #[test]
    fn test_presence_changed_deserialize_without_region() {
        let json = r#"{"presence":"outside","previous":"inside","kind":"exit","latitude":1.0,"longitude":2.0,"accuracy_meters":5.0,"timestamp_millis":7}"#;
        let dto: PresenceChangedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(dto.presence, PresenceState::Outside);
        assert!(dto.region.is_none());
    }

    #[test]
    fn test_status_changed_serialize() {
        let dto = StatusChangedEvent {
            status: Status::Error("permission denied".into()),
            previous: Status::Activating,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["status"]["state"], "error");
        assert_eq!(json["status"]["reason"], "permission denied");
        assert_eq!(json["previous"]["state"], "activating");
    }
}
