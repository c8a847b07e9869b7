//! Injected status surface. Views report background work and outcomes
//! through this interface instead of a process-wide loading/error context,
//! so ownership is explicit and tests can install recording doubles.

use tracing::{debug, error, info};

pub trait StatusSink: Send + Sync {
    /// Global busy indicator for long-running background work.
    fn loading(&self, active: bool);

    fn notify_success(&self, message: &str);

    /// Dismissible error surface; the reported failure never rolls back
    /// local state.
    fn notify_error(&self, message: &str);
}

/// Routes notifications to the log; the default sink for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn loading(&self, active: bool) {
        debug!(active, "background work");
    }

    fn notify_success(&self, message: &str) {
        info!("{message}");
    }

    fn notify_error(&self, message: &str) {
        error!("{message}");
    }
}
