//! Transition reduction and registration lifecycle.

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::monitor::RegionMonitor;
use futures::{Stream, StreamExt};
use geofence_bus::{Signal, Subscription};
use geofence_events::{
    EventBusExt, EventBusRef, MonitorErrorEvent, PresenceChangedEvent, StatusChangedEvent,
    TransitionDiscardedEvent,
};
use geofence_region::{
    Coordinate, PresenceState, Region, RegionStateRepository, Status, TransitionEvent,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// What happened to a single transition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Presence changed to the contained state.
    Applied(PresenceState),
    /// Presence already matched; nothing written.
    Duplicate,
    /// No region is active; the event was stale.
    Discarded,
}

/// Tally of a consumed event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumeSummary {
    pub applied: u64,
    pub duplicates: u64,
    pub discarded: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Reduces transition events into durable presence for one region.
///
/// Holds no persistent state of its own: whether a region is active is read
/// from the repository on every event, so a tracker built after a process
/// restart behaves exactly like the one that activated the region.
pub struct GeofenceTracker<R> {
    store: Arc<R>,
    monitor: Arc<dyn RegionMonitor>,
    events: EventBusRef,
    config: TrackerConfig,
    status: Signal<Status>,
    // Serializes activate/deactivate/retry across their awaits.
    lifecycle: tokio::sync::Mutex<()>,
    // Makes "region active?" + presence write atomic against region changes.
    transition: Mutex<()>,
}

impl<R> GeofenceTracker<R>
where
    R: RegionStateRepository,
{
    /// Build a tracker, reconstructing status from the store: `Active` when a
    /// region is persisted, `Idle` otherwise.
    ///
    /// An unreadable region starts the tracker `Idle` rather than failing, so
    /// [`deactivate_region`](Self::deactivate_region) or a fresh activation
    /// can still overwrite the damaged rows.
    pub fn new(
        store: Arc<R>,
        monitor: Arc<dyn RegionMonitor>,
        events: EventBusRef,
        config: TrackerConfig,
    ) -> Self {
        let initial = match store.region() {
            Ok(Some(region)) => {
                tracing::info!(region = %region, "restored active region");
                Status::Active
            }
            Ok(None) => Status::Idle,
            Err(err) => {
                tracing::error!("stored region unreadable, starting idle: {err}");
                Status::Idle
            }
        };

        Self {
            store,
            monitor,
            events,
            config,
            status: Signal::new(initial),
            lifecycle: tokio::sync::Mutex::new(()),
            transition: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<R> {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Current status first, then every transition.
    pub fn status_signal(&self) -> Subscription<Status> {
        self.status.subscribe()
    }

    /// Store and start watching a region, replacing any current one.
    ///
    /// An invalid radius or center is rejected before anything is touched.
    /// The new region is written before the previous registration is torn
    /// down, so a storage failure leaves store, collaborator and status as
    /// they were. On registration failure the region stays stored so
    /// [`retry_registration`](Self::retry_registration) can re-arm it.
    pub async fn activate_region(&self, center: Coordinate, radius_meters: f32) -> Result<Region> {
        let region = Region::new(center, radius_meters).map_err(TrackerError::InvalidArgument)?;
        let _lifecycle = self.lifecycle.lock().await;

        let previous = self.status.get();
        let replacing = self.has_region() || previous != Status::Idle;

        {
            let _transition = self.transition_guard();
            self.store
                .set_region(center, radius_meters)
                .map_err(TrackerError::storage)?;
        }

        if replacing {
            tracing::debug!(from = %previous, "replacing existing registration");
            self.unregister_monitor().await;
            // A retry out of ERROR goes straight back to ACTIVATING.
            if previous.error_reason().is_none() {
                self.set_status(Status::Idle);
            }
        }

        self.register(region).await
    }

    /// Re-register the stored region without new coordinates.
    pub async fn retry_registration(&self) -> Result<Region> {
        let _lifecycle = self.lifecycle.lock().await;
        let region = self
            .store
            .region()
            .map_err(TrackerError::storage)?
            .ok_or(TrackerError::NoActiveRegion)?;
        tracing::info!(region = %region, "retrying registration");
        self.register(region).await
    }

    /// Stop watching and forget the region. Status ends `Idle` regardless of
    /// whether the collaborator or the store succeeded.
    pub async fn deactivate_region(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.has_region() || self.status.get() != Status::Idle {
            self.unregister_monitor().await;
        }

        let cleared = {
            let _transition = self.transition_guard();
            self.store.clear_region()
        };
        self.set_status(Status::Idle);
        cleared.map_err(TrackerError::storage)
    }

    /// Reduce one transition event into presence.
    ///
    /// Stale events (no active region) are discarded; an event whose implied
    /// presence is already stored is a no-op. Accuracy is logged but never
    /// second-guessed: loitering and confidence are the collaborator's job.
    pub fn on_transition_event(&self, event: TransitionEvent) -> Result<TransitionOutcome> {
        let _transition = self.transition_guard();

        let Some(region) = self.store.region().map_err(TrackerError::storage)? else {
            tracing::debug!(kind = %event.kind, "no active region, discarding transition");
            self.events.publish(&TransitionDiscardedEvent {
                kind: event.kind,
                reason: "no active region".to_string(),
                timestamp_millis: event.timestamp_millis,
            });
            return Ok(TransitionOutcome::Discarded);
        };

        let candidate = event.kind.presence().map_err(|err| {
            tracing::warn!(kind = %event.kind, code = event.kind.code(), "rejected transition: {err}");
            TrackerError::InvalidEventKind(event.kind.to_string())
        })?;

        let at = event
            .occurred_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| event.timestamp_millis.to_string());
        tracing::info!(
            kind = %event.kind,
            location = %event.location,
            accuracy_m = event.accuracy_meters,
            distance_m = region.distance_from_center(&event.location).round(),
            radius_m = region.radius_meters,
            at = %at,
            "geofence transition"
        );

        let previous = self.store.presence().map_err(TrackerError::storage)?;
        if previous == candidate {
            tracing::debug!(presence = %candidate, "duplicate transition ignored");
            return Ok(TransitionOutcome::Duplicate);
        }

        if !self
            .store
            .set_presence(candidate)
            .map_err(TrackerError::storage)?
        {
            return Ok(TransitionOutcome::Duplicate);
        }

        self.events
            .publish(&PresenceChangedEvent::new(&event, previous, candidate, Some(region)));
        Ok(TransitionOutcome::Applied(candidate))
    }

    /// Feed a stream of transition events through the tracker until it ends.
    ///
    /// Failures are logged and counted; the stream is never abandoned early
    /// because event delivery has no caller to hand an error back to.
    pub async fn consume<S>(&self, events: S) -> ConsumeSummary
    where
        S: Stream<Item = TransitionEvent>,
    {
        let mut summary = ConsumeSummary::default();
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            match self.on_transition_event(event) {
                Ok(TransitionOutcome::Applied(_)) => summary.applied += 1,
                Ok(TransitionOutcome::Duplicate) => summary.duplicates += 1,
                Ok(TransitionOutcome::Discarded) => summary.discarded += 1,
                Err(TrackerError::InvalidEventKind(_)) => summary.rejected += 1,
                Err(err) => {
                    tracing::error!("failed to apply transition: {err}");
                    summary.failed += 1;
                }
            }
        }

        tracing::debug!(?summary, "transition stream ended");
        summary
    }

    async fn register(&self, region: Region) -> Result<Region> {
        self.set_status(Status::Activating);
        let registration = self.config.registration(region);

        match self.monitor.register(&registration).await {
            Ok(()) => {
                tracing::info!(region = %region, request_id = %registration.request_id, "region registered");
                self.set_status(Status::Active);
                Ok(region)
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::error!(region = %region, "failed to register region: {reason}");
                self.events.publish(&MonitorErrorEvent {
                    operation: "register".to_string(),
                    error: reason.clone(),
                });
                self.set_status(Status::Error(reason.clone()));
                Err(TrackerError::Registration(reason))
            }
        }
    }

    async fn unregister_monitor(&self) {
        if let Err(err) = self.monitor.unregister().await {
            tracing::warn!("failed to unregister region: {err}");
            self.events.publish(&MonitorErrorEvent {
                operation: "unregister".to_string(),
                error: err.to_string(),
            });
        }
    }

    fn set_status(&self, next: Status) {
        let previous = self.status.get();
        if self.status.publish(next.clone()) {
            tracing::debug!(from = %previous, to = %next, "status changed");
            self.events.publish(&StatusChangedEvent {
                status: next,
                previous,
            });
        }
    }

    // An unreadable region counts as present: it still has to be torn down.
    fn has_region(&self) -> bool {
        match self.store.region() {
            Ok(region) => region.is_some(),
            Err(err) => {
                tracing::warn!("stored region unreadable, treating as active: {err}");
                true
            }
        }
    }

    fn transition_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
