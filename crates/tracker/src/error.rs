//! Error types for the tracker.

use geofence_region::RegionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Rejected before any state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(RegionError),

    /// Transition kind with no presence mapping. Never mutates state.
    #[error("invalid event kind: {0}")]
    InvalidEventKind(String),

    /// The monitoring collaborator refused the registration.
    #[error("registration failed: {0}")]
    Registration(String),

    #[error("no region is configured")]
    NoActiveRegion,

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    pub(crate) fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TrackerError::Storage(Box::new(err))
    }
}
