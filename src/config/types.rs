//! Configuration types for the SPDK telemetry collector
//!
//! This module defines the configuration structures and validation logic.

use crate::error::CollectorError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_RPC_ENDPOINT: &str = "http://spdk:9009";
pub const DEFAULT_RPC_METHOD: &str = "bdev_get_iostat";
pub const DEFAULT_RPC_USERNAME: &str = "spdkuser";
pub const DEFAULT_RPC_PASSWORD: &str = "spdkpass";
pub const DEFAULT_OTLP_ENDPOINT: &str = "otel-gw-collector:4317";
pub const DEFAULT_SERVICE_NAME: &str = "spdk-client";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// What the collector loop does when a cycle fails on the fetch path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicyKind {
    /// Stop the loop and exit non-zero
    #[default]
    Exit,
    /// Log the error and wait for the next tick
    Skip,
}

impl std::str::FromStr for FailurePolicyKind {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exit" => Ok(FailurePolicyKind::Exit),
            "skip" => Ok(FailurePolicyKind::Skip),
            other => Err(CollectorError::ConfigurationError(format!(
                "failure_policy must be 'exit' or 'skip', got: '{}'",
                other
            ))),
        }
    }
}

/// OpenTelemetry export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint shared by the metric and trace exporters
    ///
    /// A bare `host:port` is accepted and dialed over plain `http://`.
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    /// Value of the `service.name` resource attribute
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Periodic reader export interval in seconds (default: 60)
    #[serde(default = "default_metric_export_interval")]
    pub metric_export_interval_secs: u64,
    /// Upper bound on provider shutdown in milliseconds (default: 1000)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
    /// Log level filter for tracing (e.g., "info", "debug", "warn", "error")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_otlp_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_metric_export_interval() -> u64 {
    60
}

fn default_shutdown_timeout() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            metric_export_interval_secs: default_metric_export_interval(),
            shutdown_timeout_ms: default_shutdown_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl TelemetryConfig {
    /// OTLP endpoint with an `http://` scheme added when none was given
    pub fn otlp_endpoint_url(&self) -> String {
        if self.otlp_endpoint.contains("://") {
            self.otlp_endpoint.clone()
        } else {
            format!("http://{}", self.otlp_endpoint)
        }
    }

    pub fn metric_export_interval(&self) -> Duration {
        Duration::from_secs(self.metric_export_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validate the telemetry configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if:
    /// - `otlp_endpoint` does not parse as an http(s) URL
    /// - `service_name` is empty
    /// - `metric_export_interval_secs` or `shutdown_timeout_ms` is 0
    /// - `log_level` is not a valid log level
    pub fn validate(&self) -> Result<(), CollectorError> {
        validate_http_url("otlp_endpoint", &self.otlp_endpoint_url())?;

        if self.service_name.trim().is_empty() {
            return Err(CollectorError::ConfigurationError(
                "service_name must be non-empty".to_string(),
            ));
        }

        if self.metric_export_interval_secs == 0 {
            return Err(CollectorError::ConfigurationError(
                "metric_export_interval_secs must be > 0".to_string(),
            ));
        }

        if self.shutdown_timeout_ms == 0 {
            return Err(CollectorError::ConfigurationError(
                "shutdown_timeout_ms must be > 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(CollectorError::ConfigurationError(format!(
                "log_level must be one of {:?}, got: '{}'",
                VALID_LOG_LEVELS, self.log_level
            )));
        }

        Ok(())
    }
}

/// Complete configuration for the collector process
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// SPDK JSON-RPC endpoint URL
    pub rpc_endpoint: String,
    /// JSON-RPC method polled every cycle
    pub rpc_method: String,
    /// Basic-auth user name
    pub rpc_username: String,
    /// Basic-auth password
    pub rpc_password: SecretString,
    /// Per-request timeout; `None` lets a hung call block the loop
    pub request_timeout_secs: Option<u64>,
    /// Sleep between cycles in seconds (default: 5)
    pub poll_interval_secs: u64,
    /// Reaction to fetch-path errors (default: exit)
    pub failure_policy: FailurePolicyKind,
    /// Export pipeline configuration
    pub telemetry: TelemetryConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            rpc_method: DEFAULT_RPC_METHOD.to_string(),
            rpc_username: DEFAULT_RPC_USERNAME.to_string(),
            rpc_password: SecretString::new(DEFAULT_RPC_PASSWORD.to_string()),
            request_timeout_secs: None,
            poll_interval_secs: 5,
            failure_policy: FailurePolicyKind::Exit,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Create a configuration polling `rpc_endpoint` with all other defaults
    ///
    /// # Example
    ///
    /// ```no_run
    /// use spdk_telemetry_collector::CollectorConfig;
    ///
    /// let config = CollectorConfig::new("http://127.0.0.1:9009".to_string());
    /// ```
    pub fn new(rpc_endpoint: String) -> Self {
        Self {
            rpc_endpoint,
            ..Self::default()
        }
    }

    /// Set basic-auth credentials
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.rpc_username = username;
        self.rpc_password = SecretString::new(password);
        self
    }

    pub fn with_username(mut self, username: String) -> Self {
        self.rpc_username = username;
        self
    }

    pub fn with_password(mut self, password: String) -> Self {
        self.rpc_password = SecretString::new(password);
        self
    }

    pub fn with_rpc_method(mut self, method: String) -> Self {
        self.rpc_method = method;
        self
    }

    pub fn with_request_timeout_secs(mut self, timeout_secs: Option<u64>) -> Self {
        self.request_timeout_secs = timeout_secs;
        self
    }

    pub fn with_poll_interval_secs(mut self, interval_secs: u64) -> Self {
        self.poll_interval_secs = interval_secs;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicyKind) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the export pipeline configuration
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if:
    /// - `rpc_endpoint` does not parse as an http(s) URL
    /// - `rpc_method` is empty
    /// - `poll_interval_secs` is 0
    /// - `request_timeout_secs` is `Some(0)`
    /// - the telemetry configuration is invalid
    pub fn validate(&self) -> Result<(), CollectorError> {
        validate_http_url("rpc_endpoint", &self.rpc_endpoint)?;

        if self.rpc_method.trim().is_empty() {
            return Err(CollectorError::ConfigurationError(
                "rpc_method must be non-empty".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(CollectorError::ConfigurationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(CollectorError::ConfigurationError(
                "request_timeout_secs must be > 0 when set".to_string(),
            ));
        }

        self.telemetry.validate()
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), CollectorError> {
    let parsed = Url::parse(value).map_err(|e| {
        CollectorError::ConfigurationError(format!(
            "{} must be a valid URL, got: '{}' ({})",
            field, value, e
        ))
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        _ => Err(CollectorError::ConfigurationError(format!(
            "{} must start with 'https://' or 'http://', got: '{}'",
            field, value
        ))),
    }
}
