//! OpenTelemetry export pipelines
//!
//! Builds the OTLP/gRPC metric and trace pipelines, registers them as the
//! process-wide providers and tears them down on exit.

use crate::config::TelemetryConfig;
use crate::error::CollectorError;
use opentelemetry::global;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Instrumentation scope of the cycle and HTTP client spans
pub const TRACER_NAME: &str = "spdk-client";
/// Instrumentation scope of the bdev counters
pub const METER_NAME: &str = "spdk-client-meter";

/// Handles the collector uses to emit spans and counters
///
/// Built once by [`TelemetryProvider`] and passed by reference into the
/// loop and the fetcher; nothing on the hot path reads the globals.
#[derive(Clone)]
pub struct Telemetry {
    tracer: SdkTracer,
    meter: Meter,
    propagator: TraceContextPropagator,
}

impl Telemetry {
    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    pub fn propagator(&self) -> &TraceContextPropagator {
        &self.propagator
    }
}

/// Owner of the SDK meter and tracer providers
///
/// Dropping it without calling [`TelemetryProvider::shutdown`] loses
/// whatever the batch processor and periodic reader still hold.
pub struct TelemetryProvider {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    shutdown_timeout: Duration,
}

impl TelemetryProvider {
    /// Build the OTLP pipelines and register them globally
    ///
    /// Both exporters dial the same insecure gRPC endpoint. Must be called
    /// from within a tokio runtime; the tonic channel is bound to it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if either exporter cannot be built.
    /// Callers treat this as fatal.
    pub fn init(config: &TelemetryConfig) -> Result<Self, CollectorError> {
        let endpoint = config.otlp_endpoint_url();
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .build();

        let metric_exporter = MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .build()
            .map_err(|e| {
                CollectorError::ConfigurationError(format!(
                    "Failed to create the collector metric exporter: {}",
                    e
                ))
            })?;

        let reader = PeriodicReader::builder(metric_exporter)
            .with_interval(config.metric_export_interval())
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource.clone())
            .build();

        let span_exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .build()
            .map_err(|e| {
                CollectorError::ConfigurationError(format!(
                    "Failed to create trace exporter: {}",
                    e
                ))
            })?;

        let batch_processor = BatchSpanProcessor::builder(span_exporter).build();
        let tracer_provider = SdkTracerProvider::builder()
            .with_span_processor(batch_processor)
            .with_resource(resource)
            .build();

        let provider = Self::from_providers(
            tracer_provider,
            meter_provider,
            config.shutdown_timeout(),
        );
        provider.install_global();

        info!(
            endpoint = %endpoint,
            service_name = %config.service_name,
            "OpenTelemetry export pipelines initialized"
        );

        Ok(provider)
    }

    /// Wrap pre-built SDK providers without touching the globals
    ///
    /// Used by tests that export into in-memory exporters.
    pub fn from_providers(
        tracer_provider: SdkTracerProvider,
        meter_provider: SdkMeterProvider,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            tracer_provider,
            meter_provider,
            shutdown_timeout,
        }
    }

    /// Register both providers and the W3C trace-context propagator globally
    pub fn install_global(&self) {
        global::set_meter_provider(self.meter_provider.clone());
        global::set_tracer_provider(self.tracer_provider.clone());
        global::set_text_map_propagator(TraceContextPropagator::new());
    }

    /// Tracer, meter and propagator handles for the collector
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            tracer: self.tracer_provider.tracer(TRACER_NAME),
            meter: self.meter_provider.meter(METER_NAME),
            propagator: TraceContextPropagator::new(),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Export everything buffered so far without stopping the pipelines
    pub fn force_flush(&self) -> Result<(), CollectorError> {
        self.tracer_provider.force_flush().map_err(|e| {
            CollectorError::ShutdownError(format!("Failed to flush traces: {}", e))
        })?;
        self.meter_provider.force_flush().map_err(|e| {
            CollectorError::ShutdownError(format!("Failed to flush metrics: {}", e))
        })
    }

    /// Flush and stop both pipelines, reporting the first failure
    ///
    /// Both providers share one deadline: the metric pipeline gets whatever
    /// the trace pipeline left. Both are always asked to stop, even if the
    /// first one fails.
    pub fn try_shutdown_blocking(&self) -> Result<(), CollectorError> {
        let deadline = Instant::now() + self.shutdown_timeout;
        let traces = self
            .tracer_provider
            .shutdown_with_timeout(self.shutdown_timeout)
            .map_err(|e| {
                CollectorError::ShutdownError(format!(
                    "Failed to shutdown trace exporter: {}",
                    e
                ))
            });
        let metrics = self
            .meter_provider
            .shutdown_with_timeout(deadline.saturating_duration_since(Instant::now()))
            .map_err(|e| {
                CollectorError::ShutdownError(format!(
                    "Failed to shutdown metric exporter: {}",
                    e
                ))
            });

        if let Err(e) = &traces {
            warn!(error = %e, "trace pipeline shutdown failed");
        }
        if let Err(e) = &metrics {
            warn!(error = %e, "metric pipeline shutdown failed");
        }

        traces.and(metrics)
    }

    /// Flush and stop both pipelines
    ///
    /// Never fails: a flush or stop error is logged and swallowed. Returns
    /// once the shutdown timeout has elapsed even if an exporter is still
    /// stuck; the SDK calls run on a detached thread so a stalled exporter
    /// cannot hold up process exit.
    pub async fn shutdown(self) {
        let budget = self.shutdown_timeout;
        debug!(timeout_ms = budget.as_millis() as u64, "Shutting down telemetry");

        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::runtime::Handle::current();
        let spawned = std::thread::Builder::new()
            .name("telemetry-shutdown".to_string())
            .spawn(move || {
                let _guard = handle.enter();
                let _ = tx.send(self.try_shutdown_blocking());
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to start telemetry shutdown thread");
            return;
        }

        match tokio::time::timeout(budget, rx).await {
            Ok(Ok(Ok(()))) => debug!("Telemetry pipelines shut down"),
            Ok(Ok(Err(_))) => {}
            Ok(Err(_)) => warn!("telemetry shutdown thread exited without a result"),
            Err(_) => warn!(
                timeout_ms = budget.as_millis() as u64,
                "telemetry shutdown timed out"
            ),
        }
    }
}
