//! Observer sinks for republish events.

use tracing::{debug, info, warn};

use crate::telemetry::events::{EventEnvelope, RepublishEvent};

/// Receives structured republish events
pub trait PublishObserver: Send + Sync {
    fn on_event(&self, envelope: &EventEnvelope);
}

/// Emits each event as a `tracing` record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PublishObserver for TracingObserver {
    fn on_event(&self, envelope: &EventEnvelope) {
        match &envelope.event {
            RepublishEvent::Scheduled { hash } => {
                debug!(hash = %hash, "Publish scheduled");
            }
            RepublishEvent::Attempt { hash, attempt } => {
                debug!(hash = %hash, attempt, "Publish attempt");
            }
            RepublishEvent::Published {
                hash,
                attempt,
                duration_ms,
            } => {
                info!(hash = %hash, attempt, duration_ms, "Published root");
            }
            RepublishEvent::Failed {
                hash,
                attempt,
                error,
            } => {
                warn!(hash = %hash, attempt, error = %error, "Publish failed, will retry");
            }
            RepublishEvent::Stopped { last_published } => {
                info!(last_published = ?last_published, "Republisher stopped");
            }
        }
    }
}

/// Discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PublishObserver for NoopObserver {
    fn on_event(&self, _envelope: &EventEnvelope) {}
}
