//! Geofence presence tracking.
//!
//! Consumes ENTER/EXIT transition events for one configured circular region
//! and keeps a durable inside/outside/unknown state, independent of the
//! platform service that actually watches the region.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  register/unregister  ┌──────────────────────┐
//! │ GeofenceTracker      │ ────────────────────▶ │ RegionMonitor        │
//! │  - status signal     │                       │ (platform service)   │
//! │  - transition reduce │ ◀──────────────────── │                      │
//! └──────────┬───────────┘   TransitionEvent     └──────────────────────┘
//!            │ set_region / set_presence
//!            ▼
//! ┌──────────────────────┐
//! │ RegionStateRepository│ ──▶ presence subscribers
//! └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use geofence_events::NullEventBus;
//! use geofence_region::Coordinate;
//! use geofence_storage::RegionStateStore;
//! use geofence_tracker::{GeofenceTracker, NullMonitor, TrackerConfig};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RegionStateStore::open_in_memory()?);
//! let tracker = GeofenceTracker::new(
//!     store,
//!     Arc::new(NullMonitor),
//!     Arc::new(NullEventBus),
//!     TrackerConfig::default(),
//! );
//! tracker.activate_region(Coordinate::new(37.0, -122.0), 100.0).await?;
//! ```

mod config;
mod error;
mod monitor;
mod tracker;

pub use config::{TrackerConfig, DEFAULT_LOITERING_DELAY_MS, DEFAULT_REQUEST_ID};
pub use error::{Result, TrackerError};
pub use monitor::{
    MonitorCall, MonitorError, NullMonitor, RecordingMonitor, RegionMonitor, RegionRegistration,
};
pub use tracker::{ConsumeSummary, GeofenceTracker, TransitionOutcome};
