//! Request hook — wraps one request/response cycle.
//!
//! Serves the metrics endpoint directly, otherwise times the cycle and
//! feeds the monitor exactly once on completion, whichever completion
//! signal fires first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use perfmon_core::{PerfMetrics, PerfMonitor};

use crate::capability::{CompletionSignal, RequestHead, ResponseChannel};
use crate::route;

/// Continuation invoked when the hook does not terminate the cycle.
pub type Next = Box<dyn FnOnce()>;

/// Per-request hook bound to its owning monitor.
pub struct RequestHook {
    monitor: Arc<PerfMonitor>,
}

impl RequestHook {
    /// Build the hook, starting the monitor if it is not running yet.
    pub fn new(monitor: Arc<PerfMonitor>) -> Self {
        monitor.start();
        Self { monitor }
    }

    /// Back-reference to the owning monitor.
    pub fn monitor(&self) -> &Arc<PerfMonitor> {
        &self.monitor
    }

    pub fn start(&self) {
        self.monitor.start();
    }

    pub fn stop(&self) {
        self.monitor.stop();
    }

    /// Current snapshot, the same shape the endpoint serializes.
    pub fn metrics(&self) -> PerfMetrics {
        self.monitor.get_metrics()
    }

    /// Handle one request/response cycle.
    ///
    /// Invokes `next` unless the cycle was terminated by the metrics
    /// endpoint. Malformed requests degrade to `GET` / `/`.
    pub fn handle(
        &self,
        req: &dyn RequestHead,
        res: &mut dyn ResponseChannel,
        next: Option<Next>,
    ) {
        let config = self.monitor.config();
        let route_key = route::route_key(req.method(), req.target());
        let started = Instant::now();

        if let Some(metrics_route) = config.metrics_route.as_deref() {
            if route::is_metrics_request(req.method(), req.target(), metrics_route) {
                let body = serde_json::to_string(&self.monitor.get_metrics())
                    .unwrap_or_else(|_| String::from("{}"));
                if res.status().is_none() {
                    res.set_status(200);
                }
                res.set_header("Content-Type", "application/json");
                if res.end(&body) {
                    return;
                }
                // No body-termination capability: fall through and treat
                // this as an ordinary request.
            }
        }

        if config.enable_latency {
            let recorded = Arc::new(AtomicBool::new(false));
            let recorder = {
                let monitor = self.monitor.clone();
                let route_key = route_key.clone();
                move || {
                    // Finish and Close can both fire; only the first
                    // one records.
                    if recorded.swap(true, Ordering::SeqCst) {
                        return;
                    }
                    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
                    monitor.record_request(&route_key, duration_ms);
                }
            };
            let on_close = recorder.clone();
            if res.once(CompletionSignal::Finish, Box::new(recorder)) {
                res.once(CompletionSignal::Close, Box::new(on_close));
            }
        }

        if let Some(next) = next {
            next();
        }
    }
}
