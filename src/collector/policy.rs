//! Failure handling for the collector loop

use crate::config::FailurePolicyKind;
use crate::error::CollectorError;

/// What the loop does after a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sleep and run the next cycle as scheduled
    Continue,
    /// Leave the loop, surfacing the error to the caller
    Stop,
}

/// Decides how the loop reacts to a failed cycle
///
/// Policies never re-run the failed fetch; the only choice is whether the
/// loop keeps its schedule or stops.
pub trait FailurePolicy: Send + Sync {
    fn on_error(&self, error: &CollectorError) -> Decision;
}

/// Every error stops the loop; the binary then exits non-zero
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitOnError;

impl FailurePolicy for ExitOnError {
    fn on_error(&self, _error: &CollectorError) -> Decision {
        Decision::Stop
    }
}

/// Fetch-path errors drop the cycle; anything else still stops the loop
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipCycle;

impl FailurePolicy for SkipCycle {
    fn on_error(&self, error: &CollectorError) -> Decision {
        if error.is_fetch_error() {
            Decision::Continue
        } else {
            Decision::Stop
        }
    }
}

impl From<FailurePolicyKind> for Box<dyn FailurePolicy> {
    fn from(kind: FailurePolicyKind) -> Self {
        match kind {
            FailurePolicyKind::Exit => Box::new(ExitOnError),
            FailurePolicyKind::Skip => Box::new(SkipCycle),
        }
    }
}
