use cronwatch_core::CronwatchError;
use tracing::error;

/// Destination for failures that have no caller to return to: failed runs,
/// recovered panics, dashboard bind errors, rejected `every` registrations.
pub trait ErrorSink: Send + Sync {
    fn report(&self, operation: &'static str, error: &CronwatchError);
}

/// Default sink: one structured `tracing` error event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, operation: &'static str, error: &CronwatchError) {
        error!(operation, code = error.code(), error = %error, "cronwatch failure");
    }
}
