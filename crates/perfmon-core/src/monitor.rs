//! Monitor façade — owns configuration, aggregation, and sampling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::info;

use crate::alert::AlertEvaluator;
use crate::config::MonitorConfig;
use crate::latency::LatencyAggregator;
use crate::probe::{DelaySampler, MemoryProbe, SysinfoMemoryProbe, TimerDelaySampler};
use crate::sampler::{SampledState, SamplerScheduler};
use crate::types::{PerfMetrics, round2};

/// The performance monitor.
///
/// Constructed behind `Arc` so request hooks and middleware can hold a
/// back-reference. `start`/`stop` are idempotent; the monitor can be
/// restarted any number of times and each start resets the uptime
/// origin.
pub struct PerfMonitor {
    config: MonitorConfig,
    latency: LatencyAggregator,
    sampled: Arc<Mutex<SampledState>>,
    scheduler: SamplerScheduler,
    alerts: AlertEvaluator,
    started_at: Mutex<Instant>,
    running: AtomicBool,
}

impl PerfMonitor {
    /// Build a monitor with the platform probes (sysinfo memory reader,
    /// timer-based delay sampler).
    pub fn new(config: MonitorConfig) -> Arc<Self> {
        Self::with_probes(
            config,
            Arc::new(TimerDelaySampler::with_default_resolution()),
            Arc::new(SysinfoMemoryProbe::new()),
        )
    }

    /// Build a monitor with injected probes.
    pub fn with_probes(
        config: MonitorConfig,
        delay_sampler: Arc<dyn DelaySampler>,
        memory_probe: Arc<dyn MemoryProbe>,
    ) -> Arc<Self> {
        let alerts = AlertEvaluator::new(config.alert_sink.clone(), config.execution_mode);
        // Seed memory so snapshots are meaningful before the first tick.
        let sampled = Arc::new(Mutex::new(SampledState {
            event_loop_lag: 0.0,
            memory: memory_probe.sample(),
        }));
        let scheduler = SamplerScheduler::new(
            &config,
            delay_sampler,
            memory_probe,
            alerts.clone(),
            sampled.clone(),
        );

        Arc::new(Self {
            config,
            latency: LatencyAggregator::new(),
            sampled,
            scheduler,
            alerts,
            started_at: Mutex::new(Instant::now()),
            running: AtomicBool::new(false),
        })
    }

    /// Arm the sampling tasks and reset the uptime origin. A no-op when
    /// already running. Must run inside a tokio runtime context.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut started_at) = self.started_at.lock() {
            *started_at = Instant::now();
        }
        self.scheduler.start();
        info!(
            interval_ms = self.config.sample_interval.as_millis() as u64,
            "performance monitor started"
        );
    }

    /// Disarm all sampling tasks. A no-op when idle.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.scheduler.stop();
        info!("performance monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Fresh snapshot of uptime, last sampled lag/memory, and latency.
    pub fn get_metrics(&self) -> PerfMetrics {
        let uptime = self
            .started_at
            .lock()
            .map(|started_at| started_at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let (event_loop_lag, memory) = self
            .sampled
            .lock()
            .map(|state| (state.event_loop_lag, state.memory))
            .unwrap_or_default();

        PerfMetrics {
            uptime: round2(uptime),
            event_loop_lag,
            memory,
            latency: self.latency.read(),
        }
    }

    /// Record one completed request: feeds the aggregator, then
    /// evaluates the latency alert. Skipped when latency tracking is
    /// disabled.
    pub fn record_request(&self, route_key: &str, duration_ms: f64) {
        if !self.config.enable_latency {
            return;
        }
        let duration = round2(duration_ms);
        self.latency.record(route_key, duration);
        self.alerts.check(
            duration,
            self.config.alert_thresholds.latency_ms,
            |t| format!("Slow request detected ({route_key}): {duration}ms (threshold {t}ms)"),
        );
    }
}
