//! Integration tests for the SPDK JSON-RPC fetcher against a stub server

mod common;

use common::TestPipeline;
use opentelemetry::trace::{SpanKind, Status};
use serde_json::json;
use spdk_telemetry_collector::collector::counters::{BYTES_READ_METRIC, READ_OPS_METRIC};
use spdk_telemetry_collector::collector::{
    Collector, CounterRegistry, RpcStatsFetcher, StatsSource, CYCLE_SPAN_NAME,
};
use spdk_telemetry_collector::{CollectorConfig, CollectorError};
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVAL: Duration = Duration::from_secs(5);

fn config_for(server: &MockServer) -> CollectorConfig {
    CollectorConfig::new(server.uri())
        .with_credentials("spdkuser".to_string(), "spdkpass".to_string())
        .with_request_timeout_secs(Some(5))
}

fn iostat_reply(bdevs: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "tick_rate": 2300000000u64,
            "ticks": 12345,
            "bdevs": bdevs
        }
    }))
}

async fn mount_iostat(server: &MockServer, bdevs: serde_json::Value) {
    Mock::given(method("POST"))
        .and(basic_auth("spdkuser", "spdkpass"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"id": 1, "method": "bdev_get_iostat"})))
        .respond_with(iostat_reply(bdevs))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_returns_devices_in_server_order() {
    let server = MockServer::start().await;
    mount_iostat(
        &server,
        json!([
            {"name": "Nvme0n1", "bytes_read": 36864, "num_read_ops": 9, "bytes_written": 4096,
             "num_write_ops": 1, "read_latency_ticks": 100, "write_latency_ticks": 50},
            {"name": "Malloc0", "bytes_read": 1024, "num_read_ops": 4, "bytes_written": 0,
             "num_write_ops": 0, "read_latency_ticks": 0, "write_latency_ticks": 0}
        ]),
    )
    .await;

    let pipeline = TestPipeline::new();
    let fetcher = RpcStatsFetcher::new(&config_for(&server), pipeline.provider.telemetry()).unwrap();

    let bdevs = fetcher.fetch(&opentelemetry::Context::new()).await.unwrap();

    assert_eq!(bdevs.len(), 2);
    assert_eq!(bdevs[0].name, "Nvme0n1");
    assert_eq!(bdevs[0].bytes_written, 4096);
    assert_eq!(bdevs[0].write_latency_ticks, 50);
    assert_eq!(bdevs[1].name, "Malloc0");
}

#[tokio::test]
async fn test_cycle_records_counters_and_nested_client_span() {
    let server = MockServer::start().await;
    mount_iostat(
        &server,
        json!([{"name": "Malloc0", "bytes_read": 1024, "num_read_ops": 4}]),
    )
    .await;

    let pipeline = TestPipeline::new();
    let telemetry = pipeline.provider.telemetry();
    let fetcher = RpcStatsFetcher::new(&config_for(&server), telemetry.clone()).unwrap();
    let collector = Collector::new(
        fetcher,
        CounterRegistry::new(telemetry.meter()),
        &telemetry,
        INTERVAL,
    );

    let report = collector.run_once().await.unwrap();
    assert_eq!(report.devices, 1);

    assert_eq!(
        pipeline.counter_value(BYTES_READ_METRIC, "Malloc0"),
        Some(1024)
    );
    assert_eq!(pipeline.counter_value(READ_OPS_METRIC, "Malloc0"), Some(4));

    let cycle = pipeline.spans_named(CYCLE_SPAN_NAME);
    let client = pipeline.spans_named("POST");
    assert_eq!(cycle.len(), 1);
    assert_eq!(client.len(), 1);
    assert_eq!(client[0].span_kind, SpanKind::Client);
    assert_eq!(client[0].parent_span_id, cycle[0].span_context.span_id());
    assert_eq!(
        client[0].span_context.trace_id(),
        cycle[0].span_context.trace_id()
    );

    // The server saw a traceparent naming the client span.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let traceparent = requests[0]
        .headers
        .get("traceparent")
        .expect("traceparent header")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        traceparent,
        format!(
            "00-{}-{}-01",
            cycle[0].span_context.trace_id(),
            client[0].span_context.span_id()
        )
    );
}

#[tokio::test]
async fn test_malformed_body_is_decode_error_without_counters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let pipeline = TestPipeline::new();
    let telemetry = pipeline.provider.telemetry();
    let fetcher = RpcStatsFetcher::new(&config_for(&server), telemetry.clone()).unwrap();
    let collector = Collector::new(
        fetcher,
        CounterRegistry::new(telemetry.meter()),
        &telemetry,
        INTERVAL,
    );

    let result = collector.run_once().await;

    assert!(matches!(result, Err(CollectorError::DecodeError(_))));
    assert_eq!(pipeline.counter_value(BYTES_READ_METRIC, "Malloc0"), None);
    let client = pipeline.spans_named("POST");
    assert_eq!(client.len(), 1);
    assert!(matches!(client[0].status, Status::Error { .. }));
}

#[tokio::test]
async fn test_connection_failure_records_no_client_span() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let config = CollectorConfig::new(format!("http://127.0.0.1:{}", port))
        .with_credentials("spdkuser".to_string(), "spdkpass".to_string())
        .with_request_timeout_secs(Some(5));

    let pipeline = TestPipeline::new();
    let telemetry = pipeline.provider.telemetry();
    let fetcher = RpcStatsFetcher::new(&config, telemetry.clone()).unwrap();
    let collector = Collector::new(
        fetcher,
        CounterRegistry::new(telemetry.meter()),
        &telemetry,
        INTERVAL,
    );

    let result = collector.run_once().await;

    assert!(matches!(result, Err(CollectorError::TransportError(_))));
    assert!(pipeline.spans_named("POST").is_empty());
    let cycle = pipeline.spans_named(CYCLE_SPAN_NAME);
    assert_eq!(cycle.len(), 1);
    assert!(matches!(cycle[0].status, Status::Error { .. }));
}

#[tokio::test]
async fn test_non_success_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let pipeline = TestPipeline::new();
    let fetcher = RpcStatsFetcher::new(&config_for(&server), pipeline.provider.telemetry()).unwrap();

    match fetcher.fetch(&opentelemetry::Context::new()).await {
        Err(CollectorError::TransportError(msg)) => assert!(msg.contains("401")),
        other => panic!("expected TransportError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rpc_error_object_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "Method not found"}
        })))
        .mount(&server)
        .await;

    let pipeline = TestPipeline::new();
    let fetcher = RpcStatsFetcher::new(&config_for(&server), pipeline.provider.telemetry()).unwrap();

    let result = fetcher.fetch(&opentelemetry::Context::new()).await;
    assert!(matches!(
        result,
        Err(CollectorError::RpcError { code: -32601, .. })
    ));
}

#[tokio::test]
async fn test_wrong_credentials_do_not_match_stub() {
    let server = MockServer::start().await;
    mount_iostat(&server, json!([])).await;

    let pipeline = TestPipeline::new();
    let config = CollectorConfig::new(server.uri())
        .with_credentials("spdkuser".to_string(), "wrong".to_string());
    let fetcher = RpcStatsFetcher::new(&config, pipeline.provider.telemetry()).unwrap();

    // Unmatched requests get wiremock's 404.
    let result = fetcher.fetch(&opentelemetry::Context::new()).await;
    assert!(matches!(result, Err(CollectorError::TransportError(_))));
}
