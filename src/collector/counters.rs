//! Per-device counters
//!
//! Each cycle adds the device's cumulative counter value as reported by the
//! storage engine. No previous value is kept, so two polls of an idle device
//! add the same value twice; the backend sees the sum of reported values.

use crate::model::DeviceStat;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;

pub const BYTES_READ_METRIC: &str = "spdk/bdev/bytes_read";
pub const READ_OPS_METRIC: &str = "spdk/bdev/read_ops";
/// Sole dimension of both counters
pub const BDEV_NAME_KEY: &str = "bdev.name";

/// Sink for the stats of one device
pub trait StatRecorder {
    fn record(&self, stat: &DeviceStat);
}

/// OpenTelemetry counters fed by the collector loop
#[derive(Clone)]
pub struct CounterRegistry {
    bytes_read: Counter<u64>,
    read_ops: Counter<u64>,
}

impl CounterRegistry {
    /// Create both counters on `meter`
    ///
    /// Call once; instruments are cached by the SDK but the registry is the
    /// only place that should name them.
    pub fn new(meter: &Meter) -> Self {
        let bytes_read = meter
            .u64_counter(BYTES_READ_METRIC)
            .with_description("Bytes read from the bdev as reported per poll")
            .with_unit("By")
            .build();
        let read_ops = meter
            .u64_counter(READ_OPS_METRIC)
            .with_description("Read operations completed by the bdev as reported per poll")
            .build();

        Self {
            bytes_read,
            read_ops,
        }
    }
}

impl StatRecorder for CounterRegistry {
    fn record(&self, stat: &DeviceStat) {
        let attributes = [KeyValue::new(BDEV_NAME_KEY, stat.name.clone())];
        self.bytes_read.add(stat.bytes_read, &attributes);
        self.read_ops.add(stat.num_read_ops, &attributes);
    }
}

/// Human-readable report line for one device
pub fn console_line(stat: &DeviceStat) -> String {
    format!(
        "Bdev: {}, BytesRead: {}, NumReadOps: {}",
        stat.name, stat.bytes_read, stat.num_read_ops
    )
}
