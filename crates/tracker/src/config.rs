//! Registration options handed to the monitoring collaborator.

use crate::monitor::RegionRegistration;
use geofence_region::Region;
use serde::{Deserialize, Serialize};

/// Default request id for the single monitored region.
pub const DEFAULT_REQUEST_ID: &str = "GEOFENCE_ID";

/// Default loitering delay before the collaborator reports a crossing.
pub const DEFAULT_LOITERING_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub request_id: String,
    pub loitering_delay_ms: u64,
    /// Ask the collaborator to fire ENTER right away if already inside.
    pub initial_trigger_enter: bool,
    /// Ask the collaborator to fire EXIT right away if already outside.
    pub initial_trigger_exit: bool,
    /// `None` keeps the registration until explicitly removed.
    pub expiration_ms: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            request_id: DEFAULT_REQUEST_ID.to_string(),
            loitering_delay_ms: DEFAULT_LOITERING_DELAY_MS,
            initial_trigger_enter: true,
            initial_trigger_exit: true,
            expiration_ms: None,
        }
    }
}

impl TrackerConfig {
    pub fn registration(&self, region: Region) -> RegionRegistration {
        RegionRegistration {
            request_id: self.request_id.clone(),
            region,
            loitering_delay_ms: self.loitering_delay_ms,
            initial_trigger_enter: self.initial_trigger_enter,
            initial_trigger_exit: self.initial_trigger_exit,
            expiration_ms: self.expiration_ms,
        }
    }
}
