//! SPDK JSON-RPC stats fetcher
//!
//! Issues one `bdev_get_iostat` call per cycle over an instrumented HTTP
//! client: the caller's trace context is propagated in `traceparent` and the
//! call is recorded as a child `Client` span.

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::model::{decode_reply, DeviceStat, RpcRequest};
use crate::observability::propagation::inject_context;
use crate::observability::Telemetry;
use opentelemetry::trace::{
    Span as _, SpanContext, SpanId, SpanKind, Status, TraceContextExt, Tracer,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator, SdkTracer};
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::time::SystemTime;
use tracing::{debug, warn};
use url::Url;

/// Source of one poll's worth of device stats
pub trait StatsSource {
    /// Fetch the current device list
    ///
    /// `cx` carries the cycle span; implementations parent their own spans
    /// on it. Dropping the returned future abandons the call.
    fn fetch(
        &self,
        cx: &Context,
    ) -> impl Future<Output = Result<Vec<DeviceStat>, CollectorError>> + Send;
}

/// HTTP client for the SPDK JSON-RPC endpoint
pub struct RpcStatsFetcher {
    client: reqwest::Client,
    endpoint: String,
    server_address: String,
    method: String,
    username: String,
    password: SecretString,
    telemetry: Telemetry,
    id_generator: RandomIdGenerator,
}

impl RpcStatsFetcher {
    /// Create a fetcher for the endpoint and credentials in `config`
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the endpoint is not a URL or the HTTP
    /// client cannot be built.
    pub fn new(config: &CollectorConfig, telemetry: Telemetry) -> Result<Self, CollectorError> {
        let url = Url::parse(&config.rpc_endpoint).map_err(|e| {
            CollectorError::ConfigurationError(format!(
                "Invalid rpc_endpoint '{}': {}",
                config.rpc_endpoint, e
            ))
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            CollectorError::ConfigurationError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: config.rpc_endpoint.clone(),
            server_address: url.host_str().unwrap_or_default().to_string(),
            method: config.rpc_method.clone(),
            username: config.rpc_username.clone(),
            password: config.rpc_password.clone(),
            telemetry,
            id_generator: RandomIdGenerator::default(),
        })
    }

    /// Record the client span once a response is in hand
    ///
    /// The span id was fixed before the request went out so the
    /// `traceparent` the server saw names this span.
    fn start_client_span(
        &self,
        cx: &Context,
        span_id: SpanId,
        started_at: SystemTime,
        status_code: u16,
    ) -> <SdkTracer as Tracer>::Span {
        let tracer = self.telemetry.tracer();
        tracer
            .span_builder("POST")
            .with_kind(SpanKind::Client)
            .with_span_id(span_id)
            .with_start_time(started_at)
            .with_attributes(vec![
                KeyValue::new("http.request.method", "POST"),
                KeyValue::new("url.full", self.endpoint.clone()),
                KeyValue::new("server.address", self.server_address.clone()),
                KeyValue::new("http.response.status_code", i64::from(status_code)),
                KeyValue::new("rpc.system", "jsonrpc"),
                KeyValue::new("rpc.method", self.method.clone()),
            ])
            .start_with_context(tracer, cx)
    }

    async fn read_devices(response: reqwest::Response) -> Result<Vec<DeviceStat>, CollectorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CollectorError::TransportError(format!(
                "SPDK RPC returned status {}: {}",
                status, body
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            CollectorError::TransportError(format!("Failed to read response body: {}", e))
        })?;

        Ok(decode_reply(&body)?.bdevs)
    }
}

/// Context whose span is the not-yet-recorded client span
fn client_context(cx: &Context, span_id: SpanId) -> Context {
    let parent = cx.span().span_context().clone();
    if !parent.is_valid() {
        return cx.clone();
    }

    cx.with_remote_span_context(SpanContext::new(
        parent.trace_id(),
        span_id,
        parent.trace_flags(),
        false,
        parent.trace_state().clone(),
    ))
}

impl StatsSource for RpcStatsFetcher {
    async fn fetch(&self, cx: &Context) -> Result<Vec<DeviceStat>, CollectorError> {
        let span_id = self.id_generator.new_span_id();
        let headers = inject_context(self.telemetry.propagator(), &client_context(cx, span_id));

        debug!(endpoint = %self.endpoint, method = %self.method, "Fetching SPDK stats");

        let started_at = SystemTime::now();
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .headers(headers)
            .json(&RpcRequest::new(&self.method))
            .send()
            .await
            .map_err(|e| CollectorError::TransportError(format!("Failed to send request: {}", e)))?;

        let mut span = self.start_client_span(cx, span_id, started_at, response.status().as_u16());
        let result = Self::read_devices(response).await;

        match &result {
            Ok(bdevs) => debug!(bdev.count = bdevs.len(), "SPDK stats received"),
            Err(e) => {
                warn!(error = %e, endpoint = %self.endpoint, "SPDK stats call failed");
                span.set_status(Status::error(e.to_string()));
            }
        }
        span.end();

        result
    }
}
