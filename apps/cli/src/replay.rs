//! Replay-driven monitoring collaborator.
//!
//! Stands in for the platform region monitor: registrations are accepted and
//! logged, and transition events come from newline-delimited JSON instead of
//! OS wakeups.

use async_trait::async_trait;
use futures::Stream;
use geofence_region::TransitionEvent;
use geofence_tracker::{MonitorError, RegionMonitor, RegionRegistration};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

pub struct ReplayMonitor;

#[async_trait]
impl RegionMonitor for ReplayMonitor {
    async fn register(&self, registration: &RegionRegistration) -> Result<(), MonitorError> {
        tracing::info!(
            request_id = %registration.request_id,
            region = %registration.region,
            loitering_delay_ms = registration.loitering_delay_ms,
            initial_enter = registration.initial_trigger_enter,
            initial_exit = registration.initial_trigger_exit,
            "replay monitor registered region"
        );
        Ok(())
    }

    async fn unregister(&self) -> Result<(), MonitorError> {
        tracing::info!("replay monitor unregistered region");
        Ok(())
    }
}

/// Where replayed events are read from.
pub enum ReplaySource {
    Stdin,
    File(PathBuf),
}

impl ReplaySource {
    pub fn from_arg(arg: PathBuf) -> Self {
        if arg.as_os_str() == "-" {
            ReplaySource::Stdin
        } else {
            ReplaySource::File(arg)
        }
    }

    pub async fn open(self) -> std::io::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
        Ok(match self {
            ReplaySource::Stdin => Box::new(BufReader::new(tokio::io::stdin())),
            ReplaySource::File(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        })
    }
}

/// Parse one JSON `TransitionEvent` per line. Blank lines and `#` comments
/// are skipped; malformed lines are logged and skipped.
pub fn transition_events<R>(reader: R) -> impl Stream<Item = TransitionEvent>
where
    R: AsyncBufRead + Unpin,
{
    async_stream::stream! {
        let mut lines = reader.lines();
        let mut line_no = 0usize;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!("failed to read transition events: {err}");
                    break;
                }
            };
            line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match serde_json::from_str::<TransitionEvent>(trimmed) {
                Ok(event) => yield event,
                Err(err) => tracing::warn!(line = line_no, "skipping malformed event: {err}"),
            }
        }
    }
}
