//! Shared fixtures for integration tests
//!
//! In-memory export pipelines plus scripted stand-ins for the stats source
//! and the counter registry.

#![allow(dead_code)]

use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use opentelemetry::Context;
use spdk_telemetry_collector::collector::counters::BDEV_NAME_KEY;
use spdk_telemetry_collector::collector::{StatRecorder, StatsSource};
use spdk_telemetry_collector::{CollectorError, DeviceStat, TelemetryProvider};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider wired to in-memory exporters
pub struct TestPipeline {
    pub provider: TelemetryProvider,
    pub spans: InMemorySpanExporter,
    pub metrics: InMemoryMetricExporter,
}

impl TestPipeline {
    pub fn new() -> Self {
        let spans = InMemorySpanExporter::default();
        let metrics = InMemoryMetricExporter::default();

        let tracer_provider = SdkTracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(metrics.clone()).build())
            .build();

        Self {
            provider: TelemetryProvider::from_providers(
                tracer_provider,
                meter_provider,
                Duration::from_secs(1),
            ),
            spans,
            metrics,
        }
    }

    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.provider.force_flush().unwrap();
        self.spans.get_finished_spans().unwrap()
    }

    pub fn spans_named(&self, name: &str) -> Vec<SpanData> {
        self.finished_spans()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }

    /// Cumulative exported value of `metric` for one bdev
    pub fn counter_value(&self, metric: &str, bdev: &str) -> Option<u64> {
        self.provider.force_flush().unwrap();
        let exported = self.metrics.get_finished_metrics().unwrap();
        let latest = exported.last()?;

        for scope in latest.scope_metrics() {
            for m in scope.metrics() {
                if m.name() != metric {
                    continue;
                }
                if let AggregatedMetrics::U64(MetricData::Sum(sum)) = m.data() {
                    for point in sum.data_points() {
                        let matches = point
                            .attributes()
                            .any(|kv| kv.key.as_str() == BDEV_NAME_KEY && kv.value.as_str() == bdev);
                        if matches {
                            return Some(point.value());
                        }
                    }
                }
            }
        }
        None
    }
}

pub fn device(name: &str, bytes_read: u64, num_read_ops: u64) -> DeviceStat {
    DeviceStat {
        name: name.to_string(),
        bytes_read,
        num_read_ops,
        ..DeviceStat::default()
    }
}

/// Stats source replaying a fixed list of replies, then empty lists
#[derive(Default)]
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Result<Vec<DeviceStat>, CollectorError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Result<Vec<DeviceStat>, CollectorError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatsSource for ScriptedSource {
    async fn fetch(&self, _cx: &Context) -> Result<Vec<DeviceStat>, CollectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Recorder keeping every (name, bytes_read, num_read_ops) it was handed
#[derive(Clone, Default)]
pub struct RecordingRecorder {
    records: Arc<Mutex<Vec<(String, u64, u64)>>>,
}

impl RecordingRecorder {
    pub fn records(&self) -> Vec<(String, u64, u64)> {
        self.records.lock().unwrap().clone()
    }
}

impl StatRecorder for RecordingRecorder {
    fn record(&self, stat: &DeviceStat) {
        self.records
            .lock()
            .unwrap()
            .push((stat.name.clone(), stat.bytes_read, stat.num_read_ops));
    }
}
