//! perfmon-http — HTTP surface for perfmon-lite.
//!
//! Wraps the `perfmon-core` monitor for request-serving hosts:
//!
//! - [`RequestHook`] — a host-agnostic per-request hook over a minimal
//!   capability surface ([`RequestHead`] / [`ResponseChannel`]).
//! - [`track_http`] — ready-made axum middleware.
//! - [`perf_mon`] — the factory, returning the bare monitor in
//!   standalone mode or a request hook otherwise.

pub mod capability;
pub mod hook;
pub mod layer;
pub mod route;

pub use capability::{CompletionCallback, CompletionSignal, RequestHead, ResponseChannel};
pub use hook::RequestHook;
pub use layer::track_http;
pub use route::route_key;

use std::sync::Arc;

use perfmon_core::{MonitorConfig, PerfMetrics, PerfMonitor};

/// What [`perf_mon`] hands back, per the `standalone` flag.
pub enum PerfMon {
    /// Standalone mode: drive the monitor directly.
    Monitor(Arc<PerfMonitor>),
    /// A request hook bound to an already-started monitor.
    Middleware(RequestHook),
}

impl PerfMon {
    pub fn start(&self) {
        self.monitor().start();
    }

    pub fn stop(&self) {
        self.monitor().stop();
    }

    pub fn metrics(&self) -> PerfMetrics {
        self.monitor().get_metrics()
    }

    /// Back-reference to the owning monitor.
    pub fn monitor(&self) -> &Arc<PerfMonitor> {
        match self {
            PerfMon::Monitor(monitor) => monitor,
            PerfMon::Middleware(hook) => hook.monitor(),
        }
    }
}

/// Build a monitor from the configuration.
///
/// Standalone mode returns the idle monitor for manual driving; the
/// default returns a request hook bound to a started monitor.
pub fn perf_mon(config: MonitorConfig) -> PerfMon {
    let standalone = config.standalone;
    let monitor = PerfMonitor::new(config);
    if standalone {
        PerfMon::Monitor(monitor)
    } else {
        PerfMon::Middleware(RequestHook::new(monitor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> MonitorConfig {
        MonitorConfig::default()
            .with_lag_sampling(false)
            .with_memory_sampling(false)
    }

    #[test]
    fn factory_returns_middleware_by_default() {
        let mon = perf_mon(quiet_config());
        assert!(matches!(mon, PerfMon::Middleware(_)));
        // The factory starts the monitor before handing out the hook.
        assert!(mon.monitor().is_running());
        mon.stop();
        assert!(!mon.monitor().is_running());
    }

    #[test]
    fn factory_supports_standalone_mode() {
        let mon = perf_mon(quiet_config().with_standalone(true));
        assert!(matches!(mon, PerfMon::Monitor(_)));
        // Standalone monitors start on demand.
        assert!(!mon.monitor().is_running());

        mon.start();
        assert!(mon.monitor().is_running());
        assert!(mon.metrics().uptime >= 0.0);
        mon.stop();
    }
}
