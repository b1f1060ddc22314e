//! Periodic sampling scheduler.
//!
//! Owns the background tasks that sample event-loop lag and process
//! memory at a fixed interval. Task handles are scoped to the owning
//! monitor and stopped deterministically; there is no global timer
//! registry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::alert::AlertEvaluator;
use crate::config::{AlertThresholds, MIB, MonitorConfig};
use crate::probe::{DelaySampler, MemoryProbe};
use crate::types::{MemorySnapshot, round2};

/// Values written by the sampling tasks and read by snapshots.
#[derive(Debug, Clone, Default)]
pub struct SampledState {
    /// Mean event-loop lag over the last completed interval, ms.
    pub event_loop_lag: f64,
    /// Most recent memory reading.
    pub memory: MemorySnapshot,
}

struct SamplerTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Arms and disarms the periodic lag/memory sampling tasks.
pub struct SamplerScheduler {
    interval: Duration,
    enable_lag: bool,
    enable_memory: bool,
    delay_sampler: Arc<dyn DelaySampler>,
    memory_probe: Arc<dyn MemoryProbe>,
    thresholds: AlertThresholds,
    alerts: AlertEvaluator,
    sampled: Arc<Mutex<SampledState>>,
    tasks: Mutex<Vec<SamplerTask>>,
}

impl SamplerScheduler {
    pub fn new(
        config: &MonitorConfig,
        delay_sampler: Arc<dyn DelaySampler>,
        memory_probe: Arc<dyn MemoryProbe>,
        alerts: AlertEvaluator,
        sampled: Arc<Mutex<SampledState>>,
    ) -> Self {
        Self {
            interval: config.sample_interval,
            enable_lag: config.enable_lag,
            enable_memory: config.enable_memory,
            delay_sampler,
            memory_probe,
            thresholds: config.alert_thresholds,
            alerts,
            sampled,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Arm one task per enabled signal. Starting while already armed
    /// adds nothing. Must run inside a tokio runtime context.
    pub fn start(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if !tasks.is_empty() {
            return;
        }

        if self.enable_lag {
            self.delay_sampler.enable();
            tasks.push(self.spawn_lag_task());
        }
        if self.enable_memory {
            tasks.push(self.spawn_memory_task());
        }

        debug!(
            armed = tasks.len(),
            interval_ms = self.interval.as_millis() as u64,
            "sampler tasks armed"
        );
    }

    /// Disarm every task and release the delay sampler. A no-op when
    /// nothing is armed.
    pub fn stop(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if tasks.is_empty() {
            return;
        }

        for task in tasks.drain(..) {
            let _ = task.shutdown.send(true);
            task.handle.abort();
        }
        if self.enable_lag {
            self.delay_sampler.disable();
        }
        debug!("sampler tasks stopped");
    }

    /// Number of currently armed tasks.
    pub fn active_tasks(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }

    fn spawn_lag_task(&self) -> SamplerTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;
        let sampler = self.delay_sampler.clone();
        let sampled = self.sampled.clone();
        let alerts = self.alerts.clone();
        let threshold = self.thresholds.lag_ms;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let lag_ms = round2(sampler.mean_nanos() / 1e6);
                        if let Ok(mut state) = sampled.lock() {
                            state.event_loop_lag = lag_ms;
                        }
                        sampler.reset();
                        alerts.check(lag_ms, threshold, |t| {
                            format!("Event loop lag: {lag_ms}ms (threshold {t}ms)")
                        });
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        SamplerTask {
            handle,
            shutdown: shutdown_tx,
        }
    }

    fn spawn_memory_task(&self) -> SamplerTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;
        let probe = self.memory_probe.clone();
        let sampled = self.sampled.clone();
        let alerts = self.alerts.clone();
        let threshold = self.thresholds.memory_bytes.map(|bytes| bytes as f64);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let usage = probe.sample();
                        if let Ok(mut state) = sampled.lock() {
                            state.memory = usage;
                        }
                        alerts.check(usage.heap_used as f64, threshold, |t| {
                            format!(
                                "High memory usage: {:.1}MB (threshold {:.1}MB)",
                                usage.heap_used as f64 / MIB as f64,
                                t / MIB as f64
                            )
                        });
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        SamplerTask {
            handle,
            shutdown: shutdown_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSink;
    use crate::config::ExecutionMode;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    #[derive(Default)]
    struct CapturingSink {
        messages: Mutex<Vec<String>>,
    }

    impl CapturingSink {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl AlertSink for CapturingSink {
        fn warn(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    /// Delay sampler reporting a fixed mean, counting resets.
    struct FakeDelaySampler {
        mean_nanos: AtomicU64,
        enabled: AtomicBool,
        resets: AtomicU64,
    }

    impl FakeDelaySampler {
        fn new(mean_nanos: u64) -> Self {
            Self {
                mean_nanos: AtomicU64::new(mean_nanos),
                enabled: AtomicBool::new(false),
                resets: AtomicU64::new(0),
            }
        }
    }

    impl DelaySampler for FakeDelaySampler {
        fn enable(&self) {
            self.enabled.store(true, Ordering::SeqCst);
        }
        fn disable(&self) {
            self.enabled.store(false, Ordering::SeqCst);
        }
        fn mean_nanos(&self) -> f64 {
            self.mean_nanos.load(Ordering::SeqCst) as f64
        }
        fn reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeMemoryProbe {
        heap_used: u64,
    }

    impl MemoryProbe for FakeMemoryProbe {
        fn sample(&self) -> MemorySnapshot {
            MemorySnapshot {
                rss: self.heap_used,
                heap_total: self.heap_used * 2,
                heap_used: self.heap_used,
                external: 0,
                array_buffers: 0,
            }
        }
    }

    struct Harness {
        scheduler: SamplerScheduler,
        sampled: Arc<Mutex<SampledState>>,
        sink: Arc<CapturingSink>,
        delay: Arc<FakeDelaySampler>,
    }

    fn harness(config: MonitorConfig, lag_mean_nanos: u64, heap_used: u64) -> Harness {
        let sink = Arc::new(CapturingSink::default());
        let delay = Arc::new(FakeDelaySampler::new(lag_mean_nanos));
        let sampled = Arc::new(Mutex::new(SampledState::default()));
        let alerts = AlertEvaluator::new(
            sink.clone() as Arc<dyn AlertSink>,
            ExecutionMode::Development,
        );
        let scheduler = SamplerScheduler::new(
            &config,
            delay.clone() as Arc<dyn DelaySampler>,
            Arc::new(FakeMemoryProbe { heap_used }),
            alerts,
            sampled.clone(),
        );
        Harness {
            scheduler,
            sampled,
            sink,
            delay,
        }
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig::default().with_sample_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn starting_twice_arms_one_task_per_signal() {
        let h = harness(fast_config(), 0, 0);
        h.scheduler.start();
        h.scheduler.start();
        assert_eq!(h.scheduler.active_tasks(), 2);
        h.scheduler.stop();
        assert_eq!(h.scheduler.active_tasks(), 0);
    }

    #[tokio::test]
    async fn stop_when_idle_is_a_noop() {
        let h = harness(fast_config(), 0, 0);
        h.scheduler.stop();
        h.scheduler.stop();
        assert_eq!(h.scheduler.active_tasks(), 0);
    }

    #[tokio::test]
    async fn disabled_signals_arm_nothing() {
        let config = fast_config()
            .with_lag_sampling(false)
            .with_memory_sampling(false);
        let h = harness(config, 0, 0);
        h.scheduler.start();
        assert_eq!(h.scheduler.active_tasks(), 0);
        assert!(!h.delay.enabled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn lag_task_stores_rounded_millis_and_resets_sampler() {
        // 1_234_567 ns → 1.23 ms, below the default 200 ms threshold.
        let h = harness(fast_config(), 1_234_567, 0);
        h.scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.scheduler.stop();

        assert_eq!(h.sampled.lock().unwrap().event_loop_lag, 1.23);
        assert!(h.delay.resets.load(Ordering::SeqCst) > 0);
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn lag_alert_fires_with_threshold_in_message() {
        // 250 ms mean against the default 200 ms threshold.
        let h = harness(fast_config().with_memory_sampling(false), 250_000_000, 0);
        h.scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.scheduler.stop();

        let messages = h.sink.messages();
        assert!(!messages.is_empty());
        assert!(messages[0].contains("Event loop lag: 250ms"));
        assert!(messages[0].contains("threshold 200ms"));
    }

    #[tokio::test]
    async fn memory_task_stores_snapshot_and_alerts() {
        let heap = 600 * MIB; // above the default 500 MiB threshold
        let h = harness(fast_config().with_lag_sampling(false), 0, heap);
        h.scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.scheduler.stop();

        assert_eq!(h.sampled.lock().unwrap().memory.heap_used, heap);
        let messages = h.sink.messages();
        assert!(!messages.is_empty());
        assert!(messages[0].contains("High memory usage: 600.0MB"));
        assert!(messages[0].contains("threshold 500.0MB"));
    }

    #[tokio::test]
    async fn stop_releases_delay_sampler() {
        let h = harness(fast_config(), 0, 0);
        h.scheduler.start();
        assert!(h.delay.enabled.load(Ordering::SeqCst));
        h.scheduler.stop();
        assert!(!h.delay.enabled.load(Ordering::SeqCst));
    }
}
