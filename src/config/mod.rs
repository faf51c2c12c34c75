//! Configuration module for the SPDK telemetry collector
//!
//! This module handles configuration loading, validation, and management.

pub mod loader;
pub mod types;

pub use types::{CollectorConfig, FailurePolicyKind, TelemetryConfig};
