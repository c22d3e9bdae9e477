//! Monitoring collaborator seam.
//!
//! The platform service that watches a region and wakes the process on a
//! boundary crossing is external. The tracker only needs to ask it to start
//! and stop watching; transition events arrive separately.

use async_trait::async_trait;
use geofence_region::Region;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Everything the collaborator needs to start watching a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRegistration {
    pub request_id: String,
    pub region: Region,
    pub loitering_delay_ms: u64,
    pub initial_trigger_enter: bool,
    pub initial_trigger_exit: bool,
    pub expiration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Registration(String),

    #[error("{0}")]
    Unregistration(String),
}

/// Region-monitoring registration service.
///
/// Uses async_trait so the tracker can hold it as `Arc<dyn RegionMonitor>`.
#[async_trait]
pub trait RegionMonitor: Send + Sync {
    /// Begin watching the region. Replaces any previous registration.
    async fn register(&self, registration: &RegionRegistration) -> Result<(), MonitorError>;

    /// Stop watching. Succeeds when nothing is registered.
    async fn unregister(&self) -> Result<(), MonitorError>;
}

/// Monitor that accepts every request and does nothing.
pub struct NullMonitor;

#[async_trait]
impl RegionMonitor for NullMonitor {
    async fn register(&self, registration: &RegionRegistration) -> Result<(), MonitorError> {
        tracing::debug!(request_id = %registration.request_id, "null monitor register");
        Ok(())
    }

    async fn unregister(&self) -> Result<(), MonitorError> {
        Ok(())
    }
}

/// A call observed by [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCall {
    Register(RegionRegistration),
    Unregister,
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<MonitorCall>,
    register_failure: Option<MonitorError>,
    unregister_failure: Option<MonitorError>,
}

/// In-memory monitor for testing.
///
/// Records every call and can be told to fail registrations or
/// unregistrations until reset.
#[derive(Default)]
pub struct RecordingMonitor {
    state: Mutex<RecordingState>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following `register` fail with `error`, or succeed with `None`.
    pub fn fail_register(&self, error: Option<MonitorError>) {
        self.lock().register_failure = error;
    }

    /// Make every following `unregister` fail with `error`, or succeed with `None`.
    pub fn fail_unregister(&self, error: Option<MonitorError>) {
        self.lock().unregister_failure = error;
    }

    pub fn calls(&self) -> Vec<MonitorCall> {
        self.lock().calls.clone()
    }

    pub fn registrations(&self) -> Vec<RegionRegistration> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MonitorCall::Register(reg) => Some(reg.clone()),
                MonitorCall::Unregister => None,
            })
            .collect()
    }

    pub fn unregister_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, MonitorCall::Unregister))
            .count()
    }
}

#[async_trait]
impl RegionMonitor for RecordingMonitor {
    async fn register(&self, registration: &RegionRegistration) -> Result<(), MonitorError> {
        let mut state = self.lock();
        state.calls.push(MonitorCall::Register(registration.clone()));
        match &state.register_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn unregister(&self) -> Result<(), MonitorError> {
        let mut state = self.lock();
        state.calls.push(MonitorCall::Unregister);
        match &state.unregister_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
