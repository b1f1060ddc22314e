//! Threshold alert evaluation.
//!
//! Alerts are advisory: a crossed threshold produces a single warning
//! line and nothing else. They never alter control flow.

use std::sync::Arc;

use crate::config::ExecutionMode;

/// Prefix applied to every alert line.
pub const ALERT_PREFIX: &str = "[perfmon-lite]";

/// Destination for alert warnings.
///
/// The default sink forwards to `tracing::warn!`; tests inject a
/// capturing sink instead.
pub trait AlertSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards alert text to the `tracing` warn level.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "perfmon", "{message}");
    }
}

/// Compares sampled values against configured thresholds and emits
/// warnings through the sink.
#[derive(Clone)]
pub struct AlertEvaluator {
    sink: Arc<dyn AlertSink>,
    mode: ExecutionMode,
}

impl AlertEvaluator {
    pub fn new(sink: Arc<dyn AlertSink>, mode: ExecutionMode) -> Self {
        Self { sink, mode }
    }

    /// Emit one warning iff a threshold is configured, positive, and the
    /// measured value strictly exceeds it. The message builder receives
    /// the threshold that was crossed.
    ///
    /// In `Production` mode nothing is emitted.
    pub fn check(&self, value: f64, threshold: Option<f64>, message: impl FnOnce(f64) -> String) {
        let Some(threshold) = threshold else {
            return;
        };
        if threshold <= 0.0 || value <= threshold {
            return;
        }
        if self.mode == ExecutionMode::Production {
            return;
        }
        self.sink.warn(&format!("{ALERT_PREFIX} {}", message(threshold)));
    }
}
