//! Telemetry domain: republish events, routing, and sinks.
//!
//! The republisher never logs through a global; it is handed an
//! `Arc<dyn PublishObserver>` at construction and reports every attempt
//! through it.

pub mod events;
pub mod routing;
pub mod sinks;

pub use events::{EventEnvelope, RepublishEvent};
pub use routing::bus::EventBus;
pub use sinks::{NoopObserver, PublishObserver, TracingObserver};
