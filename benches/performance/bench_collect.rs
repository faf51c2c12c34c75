//! Performance benchmark for one cycle's decode and record path
//!
//! Measures decoding a `bdev_get_iostat` reply and feeding every device into
//! the counters, without network I/O.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry::metrics::MeterProvider as _;
use spdk_telemetry_collector::collector::{CounterRegistry, StatRecorder};
use spdk_telemetry_collector::model::decode_reply;

fn create_reply(num_bdevs: usize) -> Vec<u8> {
    let bdevs: Vec<serde_json::Value> = (0..num_bdevs)
        .map(|i| {
            serde_json::json!({
                "name": format!("Nvme{}n1", i),
                "bytes_read": i * 4096,
                "num_read_ops": i,
                "bytes_written": i * 512,
                "num_write_ops": i,
                "read_latency_ticks": i * 100,
                "write_latency_ticks": i * 50
            })
        })
        .collect();

    serde_json::to_vec(&serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": { "tick_rate": 2300000000u64, "bdevs": bdevs }
    }))
    .unwrap()
}

fn bench_collect(c: &mut Criterion) {
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(InMemoryMetricExporter::default()).build())
        .build();
    let counters = CounterRegistry::new(&meter_provider.meter("bench"));

    let mut group = c.benchmark_group("collect");

    for num_bdevs in [1, 16, 256] {
        let body = create_reply(num_bdevs);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}bdevs", num_bdevs)),
            &body,
            |b, body| {
                b.iter(|| {
                    let stats = decode_reply(black_box(body)).unwrap();
                    for stat in &stats.bdevs {
                        counters.record(stat);
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_collect);
criterion_main!(benches);
