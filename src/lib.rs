//! SPDK Telemetry Collector
//!
//! Polls the SPDK JSON-RPC `bdev_get_iostat` endpoint on a fixed interval
//! and republishes per-bdev read counters and a per-poll trace span over
//! OTLP/gRPC.
//!
//! # Features
//!
//! - One JSON-RPC call per cycle with basic auth and W3C trace propagation
//! - `spdk/bdev/bytes_read` and `spdk/bdev/read_ops` counters keyed by `bdev.name`
//! - A `FetchSPDKMetrics` root span per cycle with a nested HTTP client span
//! - Cancellable loop with a pluggable failure policy
//! - YAML or environment configuration
//!
//! # Example
//!
//! ```no_run
//! use spdk_telemetry_collector::collector::{Collector, CounterRegistry, RpcStatsFetcher};
//! use spdk_telemetry_collector::{CollectorConfig, TelemetryProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), spdk_telemetry_collector::CollectorError> {
//! let config = CollectorConfig::new("http://127.0.0.1:9009".to_string());
//! let provider = TelemetryProvider::init(&config.telemetry)?;
//! let telemetry = provider.telemetry();
//!
//! let fetcher = RpcStatsFetcher::new(&config, telemetry.clone())?;
//! let counters = CounterRegistry::new(telemetry.meter());
//! let collector = Collector::new(fetcher, counters, &telemetry, config.poll_interval());
//!
//! let result = collector.run(CancellationToken::new()).await;
//! provider.shutdown().await;
//! result?;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;

pub use config::{CollectorConfig, FailurePolicyKind, TelemetryConfig};
pub use error::CollectorError;
pub use model::{DeviceStat, StatResponse};
pub use observability::{Telemetry, TelemetryProvider};
