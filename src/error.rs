//! Error types for the SPDK telemetry collector
//!
//! This module defines all error types used throughout the collector.
//! Each variant maps to one failure kind of the poll–collect–export cycle.

use thiserror::Error;

/// Error type for collector operations
#[derive(Debug, Clone, Error)]
pub enum CollectorError {
    /// Invalid configuration or export pipeline construction failure
    ///
    /// Raised at startup; nothing downstream can run without a working pipeline.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Request build/send failure, non-2xx status or body read failure
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Malformed or non-JSON response body
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// JSON-RPC error object returned by the storage engine
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// Exporter flush/stop failure
    ///
    /// Only ever logged; shutdown never fails because of it.
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl CollectorError {
    /// Check if the error was raised on the fetch path of a cycle
    ///
    /// Returns true for transport, decode and RPC errors. These are the
    /// errors a [`FailurePolicy`](crate::collector::FailurePolicy) is asked about.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            CollectorError::TransportError(_)
                | CollectorError::DecodeError(_)
                | CollectorError::RpcError { .. }
        )
    }
}
