//! Domain types for single-region geofence tracking.
//!
//! Everything here is a plain value: no I/O, no locking. Persistence is
//! expressed through [`RegionStateRepository`], implemented by the storage
//! layer so the tracker stays decoupled from SQLite.

mod region;
mod state;
mod transition;

pub use region::{Coordinate, Region, EARTH_RADIUS_METERS};
pub use state::{PresenceState, Status};
pub use transition::{TransitionEvent, TransitionKind};

use geofence_bus::Subscription;

/// Errors raised when building or interpreting domain values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    #[error("invalid radius {0}m: must be finite and greater than zero")]
    InvalidRadius(f32),

    #[error("invalid latitude {0}: must be within [-90, 90]")]
    InvalidLatitude(f64),

    #[error("invalid longitude {0}: must be within [-180, 180]")]
    InvalidLongitude(f64),

    #[error("invalid transition kind: {0}")]
    InvalidEventKind(String),

    #[error("invalid presence state: {0}")]
    InvalidPresence(String),
}

/// Repository for the configured region and the last known presence.
///
/// Implemented by the storage layer. Every mutating call is atomic: readers
/// observe either the previous or the new value, never a mix.
pub trait RegionStateRepository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist an active region and reset presence to unknown.
    fn set_region(&self, center: Coordinate, radius_meters: f32) -> Result<Region, Self::Error>;

    /// Deactivate the region and reset presence to unknown. Idempotent.
    fn clear_region(&self) -> Result<(), Self::Error>;

    /// The configured region, or `None` when inactive.
    fn region(&self) -> Result<Option<Region>, Self::Error>;

    /// Persist presence. Returns whether the stored value changed.
    fn set_presence(&self, state: PresenceState) -> Result<bool, Self::Error>;

    fn presence(&self) -> Result<PresenceState, Self::Error>;

    /// Current presence first, then one value per committed change.
    fn subscribe_presence(&self) -> Subscription<PresenceState>;
}
