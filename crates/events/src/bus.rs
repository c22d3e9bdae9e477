//! Sinks for tracker notifications.
//!
//! The tracker only knows the [`EventBus`] trait. Typed DTOs go through
//! [`EventBusExt::publish`], which picks the topic from the DTO itself so a
//! payload can never be sent under the wrong name.

use crate::GeofenceEvent;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receives serialized notifications by topic.
pub trait EventBus: Send + Sync {
    fn emit(&self, topic: &str, payload: Value);
}

pub type EventBusRef = Arc<dyn EventBus>;

/// Typed publishing on top of any [`EventBus`].
pub trait EventBusExt {
    /// Serialize `event` and emit it on [`GeofenceEvent::TOPIC`].
    ///
    /// Serialization failures are logged and dropped; a notification is
    /// never allowed to fail the state change that produced it.
    fn publish<E: GeofenceEvent>(&self, event: &E);
}

impl<B: EventBus + ?Sized> EventBusExt for B {
    fn publish<E: GeofenceEvent>(&self, event: &E) {
        match serde_json::to_value(event) {
            Ok(payload) => self.emit(E::TOPIC, payload),
            Err(err) => tracing::warn!(topic = E::TOPIC, "failed to serialize event: {err}"),
        }
    }
}

/// One notification captured by [`RecordingEventBus`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub topic: String,
    pub payload: Value,
}

/// Keeps every notification in emission order.
#[derive(Default)]
pub struct RecordingEventBus {
    log: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Topics in the order they were emitted.
    pub fn topics(&self) -> Vec<String> {
        self.log().iter().map(|e| e.topic.clone()).collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.log().iter().filter(|e| e.topic == topic).count()
    }

    pub fn payloads(&self, topic: &str) -> Vec<Value> {
        self.log()
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| e.payload.clone())
            .collect()
    }

    /// Every recorded `E`, decoded back from its payload.
    pub fn decoded<E: GeofenceEvent + DeserializeOwned>(&self) -> Vec<E> {
        self.payloads(E::TOPIC)
            .into_iter()
            .filter_map(|payload| serde_json::from_value(payload).ok())
            .collect()
    }
}

impl EventBus for RecordingEventBus {
    fn emit(&self, topic: &str, payload: Value) {
        self.log().push(RecordedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Drops everything.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: Value) {}
}

/// Writes every notification to `tracing`, for headless runs where there is
/// no user to notify.
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn emit(&self, topic: &str, payload: Value) {
        tracing::info!(target: "geofence::events", topic, %payload, "event");
    }
}
