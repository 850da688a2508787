//! Event schema for republish telemetry.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle events of the republisher loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepublishEvent {
    /// A new value became pending
    Scheduled { hash: String },
    Attempt { hash: String, attempt: u32 },
    Published {
        hash: String,
        attempt: u32,
        duration_ms: u128,
    },
    Failed {
        hash: String,
        attempt: u32,
        error: String,
    },
    Stopped {
        #[serde(skip_serializing_if = "Option::is_none")]
        last_published: Option<String>,
    },
}

impl RepublishEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RepublishEvent::Scheduled { .. } => "scheduled",
            RepublishEvent::Attempt { .. } => "attempt",
            RepublishEvent::Published { .. } => "published",
            RepublishEvent::Failed { .. } => "failed",
            RepublishEvent::Stopped { .. } => "stopped",
        }
    }
}

/// Timestamped event as delivered to observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub ts: String,
    #[serde(flatten)]
    pub event: RepublishEvent,
}

impl EventEnvelope {
    pub fn with_now(event: RepublishEvent) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
        }
    }
}
