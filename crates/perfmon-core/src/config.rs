//! Monitor configuration.
//!
//! Built from `MonitorConfig::default()` plus `with_*` overrides. Unset
//! fields keep their defaults, so overriding one alert threshold leaves
//! the others at their default values.

use std::sync::Arc;
use std::time::Duration;

use crate::alert::{AlertSink, TracingAlertSink};

pub(crate) const MIB: u64 = 1024 * 1024;

/// Default period for the lag and memory sampling tasks.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(2000);

/// Alert thresholds. `None` disables the corresponding alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Event-loop lag threshold in milliseconds.
    pub lag_ms: Option<f64>,
    /// Heap-used threshold in bytes.
    pub memory_bytes: Option<u64>,
    /// Per-request latency threshold in milliseconds.
    pub latency_ms: Option<f64>,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            lag_ms: Some(200.0),
            memory_bytes: Some(500 * MIB),
            latency_ms: Some(1000.0),
        }
    }
}

/// Execution mode supplied by the host. Alert emission is silenced
/// entirely in `Production`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Development,
    Production,
}

/// Monitor configuration, immutable once the monitor is constructed.
#[derive(Clone)]
pub struct MonitorConfig {
    /// Sample event-loop lag on the timer.
    pub enable_lag: bool,
    /// Sample process memory on the timer.
    pub enable_memory: bool,
    /// Track per-request latency.
    pub enable_latency: bool,
    /// Path served as the JSON metrics endpoint; `None` disables it.
    pub metrics_route: Option<String>,
    /// Have the factory return the bare monitor instead of a request hook.
    pub standalone: bool,
    /// Period shared by both sampling tasks.
    pub sample_interval: Duration,
    pub alert_thresholds: AlertThresholds,
    pub execution_mode: ExecutionMode,
    /// Sink receiving alert warnings.
    pub alert_sink: Arc<dyn AlertSink>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enable_lag: true,
            enable_memory: true,
            enable_latency: true,
            metrics_route: Some("/metrics".to_string()),
            standalone: false,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            alert_thresholds: AlertThresholds::default(),
            execution_mode: ExecutionMode::Development,
            alert_sink: Arc::new(TracingAlertSink),
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lag_sampling(mut self, enabled: bool) -> Self {
        self.enable_lag = enabled;
        self
    }

    pub fn with_memory_sampling(mut self, enabled: bool) -> Self {
        self.enable_memory = enabled;
        self
    }

    pub fn with_latency_tracking(mut self, enabled: bool) -> Self {
        self.enable_latency = enabled;
        self
    }

    pub fn with_metrics_route(mut self, route: impl Into<String>) -> Self {
        self.metrics_route = Some(route.into());
        self
    }

    /// Disable the metrics endpoint; requests are never intercepted.
    pub fn without_metrics_route(mut self) -> Self {
        self.metrics_route = None;
        self
    }

    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_alert_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alert_thresholds = thresholds;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = sink;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert!(config.enable_lag);
        assert!(config.enable_memory);
        assert!(config.enable_latency);
        assert_eq!(config.metrics_route.as_deref(), Some("/metrics"));
        assert!(!config.standalone);
        assert_eq!(config.sample_interval, Duration::from_millis(2000));
        assert_eq!(config.alert_thresholds.lag_ms, Some(200.0));
        assert_eq!(config.alert_thresholds.memory_bytes, Some(500 * MIB));
        assert_eq!(config.alert_thresholds.latency_ms, Some(1000.0));
        assert_eq!(config.execution_mode, ExecutionMode::Development);
    }

    #[test]
    fn overriding_one_threshold_keeps_the_others() {
        let config = MonitorConfig::default().with_alert_thresholds(AlertThresholds {
            latency_ms: Some(100.0),
            ..Default::default()
        });
        assert_eq!(config.alert_thresholds.latency_ms, Some(100.0));
        assert_eq!(config.alert_thresholds.lag_ms, Some(200.0));
        assert_eq!(config.alert_thresholds.memory_bytes, Some(500 * MIB));
    }

    #[test]
    fn builders_override_defaults() {
        let config = MonitorConfig::new()
            .with_lag_sampling(false)
            .with_metrics_route("/status")
            .with_standalone(true)
            .with_sample_interval(Duration::from_millis(50));
        assert!(!config.enable_lag);
        assert!(config.enable_memory);
        assert_eq!(config.metrics_route.as_deref(), Some("/status"));
        assert!(config.standalone);
        assert_eq!(config.sample_interval, Duration::from_millis(50));
    }

    #[test]
    fn metrics_route_can_be_disabled() {
        let config = MonitorConfig::default().without_metrics_route();
        assert!(config.metrics_route.is_none());
    }
}
