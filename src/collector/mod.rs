//! Poll–collect–export loop
//!
//! One cycle opens a root span, fetches the device list, feeds every device
//! into the counters and closes the span. [`Collector::run`] repeats cycles
//! with a fixed sleep in between until cancelled or stopped by its
//! [`FailurePolicy`].

pub mod counters;
pub mod fetcher;
pub mod policy;

pub use counters::{console_line, CounterRegistry, StatRecorder};
pub use fetcher::{RpcStatsFetcher, StatsSource};
pub use policy::{Decision, ExitOnError, FailurePolicy, SkipCycle};

use crate::error::CollectorError;
use crate::observability::Telemetry;
use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracer;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Name of the root span opened for every cycle
pub const CYCLE_SPAN_NAME: &str = "FetchSPDKMetrics";

/// Outcome of one successful cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Devices recorded in this cycle
    pub devices: usize,
}

/// The collector loop
pub struct Collector<S, R> {
    source: S,
    recorder: R,
    tracer: SdkTracer,
    policy: Box<dyn FailurePolicy>,
    interval: Duration,
}

impl<S, R> Collector<S, R>
where
    S: StatsSource,
    R: StatRecorder,
{
    /// Create a loop polling `source` every `interval`
    ///
    /// The failure policy defaults to [`ExitOnError`].
    pub fn new(source: S, recorder: R, telemetry: &Telemetry, interval: Duration) -> Self {
        Self {
            source,
            recorder,
            tracer: telemetry.tracer().clone(),
            policy: Box::new(ExitOnError),
            interval,
        }
    }

    pub fn with_failure_policy(mut self, policy: Box<dyn FailurePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Run exactly one cycle
    ///
    /// The cycle span is rooted at an empty context, so consecutive cycles
    /// land in unrelated traces. On error nothing is recorded and the span
    /// carries an error status.
    pub async fn run_once(&self) -> Result<CycleReport, CollectorError> {
        let span = self.tracer.start_with_context(CYCLE_SPAN_NAME, &Context::new());
        let cx = Context::new().with_span(span);

        let outcome = match self.source.fetch(&cx).await {
            Ok(bdevs) => {
                for stat in &bdevs {
                    self.recorder.record(stat);
                    println!("{}", console_line(stat));
                }
                cx.span()
                    .set_attribute(KeyValue::new("spdk.bdev.count", bdevs.len() as i64));
                Ok(CycleReport {
                    devices: bdevs.len(),
                })
            }
            Err(e) => {
                cx.span().set_status(Status::error(e.to_string()));
                Err(e)
            }
        };

        cx.span().end();
        outcome
    }

    /// Repeat cycles until `shutdown` fires or the policy says stop
    ///
    /// Cycles never overlap; the sleep starts after a cycle finishes, so the
    /// period is the cycle latency plus the interval. Cancellation interrupts
    /// both an in-flight fetch and the sleep.
    ///
    /// # Returns
    ///
    /// The number of cycles started, or the error the policy refused to skip.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<u64, CollectorError> {
        let mut cycles: u64 = 0;
        info!(interval_secs = self.interval.as_secs(), "Collector loop started");

        loop {
            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                outcome = self.run_once() => outcome,
            };
            cycles += 1;

            match outcome {
                Ok(report) => debug!(cycle = cycles, bdev.count = report.devices, "Cycle complete"),
                Err(e) => match self.policy.on_error(&e) {
                    Decision::Stop => {
                        error!(cycle = cycles, error = %e, "Cycle failed, stopping collector");
                        return Err(e);
                    }
                    Decision::Continue => {
                        warn!(cycle = cycles, error = %e, "Cycle failed, waiting for next tick");
                    }
                },
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(cycles, "Collector loop stopped");
        Ok(cycles)
    }
}
