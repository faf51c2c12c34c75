//! Configuration loader for the SPDK telemetry collector
//!
//! This module handles loading configuration from YAML files and environment variables.

use crate::config::types::{CollectorConfig, FailurePolicyKind, TelemetryConfig};
use crate::error::CollectorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// YAML configuration structure (for deserialization)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigYaml {
    pub rpc: Option<RpcYaml>,
    pub poll_interval_secs: Option<u64>,
    pub failure_policy: Option<FailurePolicyKind>,
    pub telemetry: Option<TelemetryYaml>,
}

/// Telemetry section; unset keys fall back to the environment or defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryYaml {
    pub otlp_endpoint: Option<String>,
    pub service_name: Option<String>,
    pub metric_export_interval_secs: Option<u64>,
    pub shutdown_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcYaml {
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Load configuration from YAML file
///
/// Every key is optional; missing keys keep their defaults.
///
/// # Arguments
///
/// * `path` - Path to YAML configuration file
///
/// # Returns
///
/// Returns `CollectorConfig` if successful, or `CollectorError` if loading fails.
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<CollectorConfig, CollectorError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        CollectorError::ConfigurationError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;

    load_from_yaml_str(&content)
}

/// Parse and validate configuration from a YAML string
///
/// `OTEL_EXPORTER_OTLP_ENDPOINT` still applies when the document leaves
/// `telemetry.otlp_endpoint` unset.
pub fn load_from_yaml_str(content: &str) -> Result<CollectorConfig, CollectorError> {
    load_from_yaml_str_with_lookup(content, |key| std::env::var(key).ok())
}

/// Parse a YAML string, consulting `lookup` for keys the document leaves unset
pub fn load_from_yaml_str_with_lookup<F>(
    content: &str,
    lookup: F,
) -> Result<CollectorConfig, CollectorError>
where
    F: Fn(&str) -> Option<String>,
{
    let yaml: ConfigYaml = serde_yaml::from_str(content).map_err(|e| {
        CollectorError::ConfigurationError(format!("Failed to parse YAML: {}", e))
    })?;

    let mut config = CollectorConfig::default();

    if let Some(rpc) = yaml.rpc {
        if let Some(endpoint) = rpc.endpoint {
            config.rpc_endpoint = endpoint;
        }
        if let Some(method) = rpc.method {
            config = config.with_rpc_method(method);
        }
        if let Some(username) = rpc.username {
            config = config.with_username(username);
        }
        if let Some(password) = rpc.password {
            config = config.with_password(password);
        }
        config = config.with_request_timeout_secs(rpc.timeout_secs);
    }

    if let Some(interval) = yaml.poll_interval_secs {
        config = config.with_poll_interval_secs(interval);
    }

    if let Some(policy) = yaml.failure_policy {
        config = config.with_failure_policy(policy);
    }

    let section = yaml.telemetry.unwrap_or_default();
    let mut telemetry = TelemetryConfig::default();

    if let Some(endpoint) = section
        .otlp_endpoint
        .or_else(|| lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|s| !s.is_empty()))
    {
        telemetry.otlp_endpoint = endpoint;
    }
    if let Some(service_name) = section.service_name {
        telemetry.service_name = service_name;
    }
    if let Some(interval) = section.metric_export_interval_secs {
        telemetry.metric_export_interval_secs = interval;
    }
    if let Some(timeout) = section.shutdown_timeout_ms {
        telemetry.shutdown_timeout_ms = timeout;
    }
    if let Some(level) = section.log_level {
        telemetry.log_level = level;
    }

    config = config.with_telemetry(telemetry);
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Reads the following variables; unset ones keep their defaults:
/// - `SPDK_RPC_URL`, `SPDK_RPC_METHOD`, `SPDK_RPC_USER`, `SPDK_RPC_PASSWORD`,
///   `SPDK_RPC_TIMEOUT_SECS` for the JSON-RPC endpoint
/// - `COLLECTOR_POLL_INTERVAL_SECS`, `COLLECTOR_FAILURE_POLICY`,
///   `COLLECTOR_LOG_LEVEL` for the loop
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`,
///   `OTEL_METRIC_EXPORT_INTERVAL_SECS`, `OTEL_SHUTDOWN_TIMEOUT_MS` for export
///
/// # Returns
///
/// Returns `CollectorConfig` if successful, or `CollectorError` if loading fails.
pub fn load_from_env() -> Result<CollectorConfig, CollectorError> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary key lookup
///
/// `load_from_env` delegates here; tests pass a map instead of mutating the
/// process environment.
pub fn load_from_lookup<F>(lookup: F) -> Result<CollectorConfig, CollectorError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = CollectorConfig::default();

    if let Some(endpoint) = lookup("SPDK_RPC_URL") {
        config.rpc_endpoint = endpoint;
    }

    if let Some(method) = lookup("SPDK_RPC_METHOD") {
        config = config.with_rpc_method(method);
    }

    if let Some(username) = lookup("SPDK_RPC_USER") {
        config = config.with_username(username);
    }

    if let Some(password) = lookup("SPDK_RPC_PASSWORD") {
        config = config.with_password(password);
    }

    if let Some(timeout) = lookup("SPDK_RPC_TIMEOUT_SECS") {
        config = config.with_request_timeout_secs(Some(parse_number(
            "SPDK_RPC_TIMEOUT_SECS",
            &timeout,
        )?));
    }

    if let Some(interval) = lookup("COLLECTOR_POLL_INTERVAL_SECS") {
        config = config
            .with_poll_interval_secs(parse_number("COLLECTOR_POLL_INTERVAL_SECS", &interval)?);
    }

    if let Some(policy) = lookup("COLLECTOR_FAILURE_POLICY") {
        config = config.with_failure_policy(policy.parse()?);
    }

    let mut telemetry = TelemetryConfig::default();

    if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|s| !s.is_empty()) {
        telemetry.otlp_endpoint = endpoint;
    }

    if let Some(service_name) = lookup("OTEL_SERVICE_NAME") {
        telemetry.service_name = service_name;
    }

    if let Some(interval) = lookup("OTEL_METRIC_EXPORT_INTERVAL_SECS") {
        telemetry.metric_export_interval_secs =
            parse_number("OTEL_METRIC_EXPORT_INTERVAL_SECS", &interval)?;
    }

    if let Some(timeout) = lookup("OTEL_SHUTDOWN_TIMEOUT_MS") {
        telemetry.shutdown_timeout_ms = parse_number("OTEL_SHUTDOWN_TIMEOUT_MS", &timeout)?;
    }

    if let Some(level) = lookup("COLLECTOR_LOG_LEVEL") {
        telemetry.log_level = level;
    }

    config = config.with_telemetry(telemetry);
    config.validate()?;
    Ok(config)
}

fn parse_number(key: &str, value: &str) -> Result<u64, CollectorError> {
    value.trim().parse::<u64>().map_err(|e| {
        CollectorError::ConfigurationError(format!(
            "{} must be a non-negative integer, got: '{}' ({})",
            key, value, e
        ))
    })
}
