//! In-process routing of telemetry events.

pub mod bus;
