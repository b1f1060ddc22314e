//! Platform probes — process memory and event-loop delay.
//!
//! The monitor reads the platform through these traits so tests can
//! substitute deterministic fakes for the real clock and process tables.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::MemorySnapshot;

/// Default tick resolution for the delay sampler.
pub const DEFAULT_RESOLUTION: Duration = Duration::from_millis(20);

/// Reads current process memory usage.
pub trait MemoryProbe: Send + Sync {
    fn sample(&self) -> MemorySnapshot;
}

/// Memory probe backed by `sysinfo`, reading the current process.
///
/// Field mapping: `rss` and `heap_used` report the resident set,
/// `heap_total` the virtual size; `external` and `array_buffers` stay 0
/// (no allocator-level split is available for a native process).
pub struct SysinfoMemoryProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for SysinfoMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SysinfoMemoryProbe {
    fn sample(&self) -> MemorySnapshot {
        let Some(pid) = self.pid else {
            return MemorySnapshot::default();
        };
        let Ok(mut system) = self.system.lock() else {
            return MemorySnapshot::default();
        };
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        match system.process(pid) {
            Some(process) => MemorySnapshot {
                rss: process.memory(),
                heap_total: process.virtual_memory(),
                heap_used: process.memory(),
                external: 0,
                array_buffers: 0,
            },
            None => MemorySnapshot::default(),
        }
    }
}

/// Accumulates event-loop delay samples between scheduler reads.
pub trait DelaySampler: Send + Sync {
    /// Begin accumulating delay samples. Idempotent.
    fn enable(&self);
    /// Stop sampling, release the timer task, and clear the accumulator.
    fn disable(&self);
    /// Mean accumulated delay since the last reset, in nanoseconds.
    fn mean_nanos(&self) -> f64;
    /// Clear the accumulator.
    fn reset(&self);
}

struct SamplerHandle {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Measures event-loop responsiveness by scheduling a fixed-resolution
/// tick and accumulating how late each tick actually fires (actual −
/// scheduled). An idle runtime therefore reports a mean near zero.
pub struct TimerDelaySampler {
    resolution: Duration,
    total_lag_nanos: Arc<AtomicU64>,
    samples: Arc<AtomicU64>,
    task: Mutex<Option<SamplerHandle>>,
}

impl TimerDelaySampler {
    pub fn new(resolution: Duration) -> Self {
        Self {
            resolution,
            total_lag_nanos: Arc::new(AtomicU64::new(0)),
            samples: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn with_default_resolution() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl DelaySampler for TimerDelaySampler {
    fn enable(&self) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if task.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let total = self.total_lag_nanos.clone();
        let samples = self.samples.clone();
        let resolution = self.resolution;

        // Anchor the first deadline now so delay between spawning and the
        // task's first poll already counts as lag.
        let first_due = tokio::time::Instant::now() + resolution;
        let handle = tokio::spawn(async move {
            let mut due = first_due;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(due) => {
                        // duration_since saturates to zero for early wakeups.
                        let lag = tokio::time::Instant::now().duration_since(due);
                        total.fetch_add(lag.as_nanos() as u64, Ordering::Relaxed);
                        samples.fetch_add(1, Ordering::Relaxed);
                        due += resolution;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        *task = Some(SamplerHandle {
            handle,
            shutdown: shutdown_tx,
        });
        debug!(resolution_ms = resolution.as_millis() as u64, "delay sampler enabled");
    }

    fn disable(&self) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if let Some(slot) = task.take() {
            let _ = slot.shutdown.send(true);
            slot.handle.abort();
            debug!("delay sampler disabled");
        }
        self.reset();
    }

    fn mean_nanos(&self) -> f64 {
        let samples = self.samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0.0;
        }
        self.total_lag_nanos.load(Ordering::Relaxed) as f64 / samples as f64
    }

    fn reset(&self) {
        self.total_lag_nanos.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_probe_reads_current_process() {
        let probe = SysinfoMemoryProbe::new();
        let snapshot = probe.sample();
        assert!(snapshot.rss > 0);
        assert_eq!(snapshot.heap_used, snapshot.rss);
        assert_eq!(snapshot.external, 0);
    }

    #[tokio::test]
    async fn delay_sampler_accumulates_oversleep() {
        let sampler = TimerDelaySampler::new(Duration::from_millis(5));
        sampler.enable();

        // Block the runtime thread so pending ticks fire late, then
        // yield so the sampler task can observe the backlog.
        std::thread::sleep(Duration::from_millis(60));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(sampler.mean_nanos() > 0.0);
        sampler.disable();
    }

    #[tokio::test]
    async fn reset_clears_accumulator() {
        let sampler = TimerDelaySampler::new(Duration::from_millis(5));
        sampler.enable();

        std::thread::sleep(Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(sampler.mean_nanos() > 0.0);

        sampler.reset();
        assert_eq!(sampler.mean_nanos(), 0.0);
        sampler.disable();
    }

    #[tokio::test]
    async fn enable_is_idempotent_and_disable_releases() {
        let sampler = TimerDelaySampler::new(Duration::from_millis(5));
        sampler.enable();
        sampler.enable();
        assert!(sampler.task.lock().unwrap().is_some());

        sampler.disable();
        assert!(sampler.task.lock().unwrap().is_none());
        assert_eq!(sampler.mean_nanos(), 0.0);

        // Disabling again is a no-op.
        sampler.disable();
    }

    #[tokio::test]
    async fn idle_mean_is_near_zero() {
        let sampler = TimerDelaySampler::new(Duration::from_millis(5));
        sampler.enable();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Nothing blocked the runtime; mean oversleep stays tiny.
        assert!(sampler.mean_nanos() < 5_000_000.0, "mean was {}", sampler.mean_nanos());
        sampler.disable();
    }
}
