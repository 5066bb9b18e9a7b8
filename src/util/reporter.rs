//! The logging collaborator threaded through every component.
//!
//! Components never log through globals they capture implicitly; they are
//! handed a `&dyn Reporter`. The binary uses [`TracingReporter`], which
//! feeds the console and the run log through `tracing`.

/// Sink for leveled progress and diagnostic messages.
pub trait Reporter {
    /// Detail that only belongs in the run log (or verbose console).
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every message to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}
