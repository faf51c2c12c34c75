//! OpenTelemetry observability integration
//!
//! This module owns the OTLP export pipelines and the trace-context
//! propagation used by the RPC client.

pub mod otlp;
pub mod propagation;

pub use otlp::{Telemetry, TelemetryProvider};
