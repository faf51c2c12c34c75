//! Wire types for the SPDK `bdev_get_iostat` JSON-RPC call

use crate::error::CollectorError;
use serde::{Deserialize, Serialize};

/// Per-device I/O counters reported by one poll
///
/// Every counter is cumulative since the device came up; nothing here is a
/// delta against a previous poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStat {
    pub name: String,
    #[serde(default)]
    pub bytes_read: u64,
    #[serde(default)]
    pub num_read_ops: u64,
    #[serde(default)]
    pub bytes_written: u64,
    #[serde(default)]
    pub num_write_ops: u64,
    #[serde(default)]
    pub read_latency_ticks: u64,
    #[serde(default)]
    pub write_latency_ticks: u64,
}

/// `result` member of a successful reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_rate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<u64>,
    pub bdevs: Vec<DeviceStat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC reply envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcReply {
    #[serde(default)]
    pub result: Option<StatResponse>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC request body
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
        }
    }
}

impl RpcReply {
    /// Unwrap the reply into its device list
    ///
    /// An `error` member wins over `result`. A reply carrying neither is
    /// treated as malformed.
    pub fn into_stats(self) -> Result<StatResponse, CollectorError> {
        if let Some(err) = self.error {
            return Err(CollectorError::RpcError {
                code: err.code,
                message: err.message,
            });
        }

        self.result.ok_or_else(|| {
            CollectorError::DecodeError("reply has neither 'result' nor 'error'".to_string())
        })
    }
}

/// Decode a raw response body into the device list
pub fn decode_reply(body: &[u8]) -> Result<StatResponse, CollectorError> {
    let reply: RpcReply = serde_json::from_slice(body).map_err(|e| {
        CollectorError::DecodeError(format!("Failed to parse SPDK response: {}", e))
    })?;
    reply.into_stats()
}
