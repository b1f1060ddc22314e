//! perfmon-core — in-process performance monitoring engine.
//!
//! Samples event-loop responsiveness and process memory on a timer,
//! aggregates per-request latency into running averages (global and per
//! route), and raises threshold alerts through a pluggable sink.
//!
//! # Architecture
//!
//! ```text
//! PerfMonitor
//!   ├── SamplerScheduler ── lag + memory tasks, one shared interval
//!   │     ├── TimerDelaySampler ← timer-oversleep accumulator
//!   │     └── SysinfoMemoryProbe ← process memory reading
//!   ├── LatencyAggregator ← record_request() per completed request
//!   ├── AlertEvaluator → AlertSink (silenced in production mode)
//!   └── get_metrics() → PerfMetrics snapshot
//! ```
//!
//! The HTTP surface (request hook, metrics endpoint, axum middleware)
//! lives in `perfmon-http`.

pub mod alert;
pub mod config;
pub mod latency;
pub mod monitor;
pub mod probe;
pub mod sampler;
pub mod types;

pub use alert::{ALERT_PREFIX, AlertEvaluator, AlertSink, TracingAlertSink};
pub use config::{AlertThresholds, ExecutionMode, MonitorConfig};
pub use latency::LatencyAggregator;
pub use monitor::PerfMonitor;
pub use probe::{DelaySampler, MemoryProbe, SysinfoMemoryProbe, TimerDelaySampler};
pub use sampler::SamplerScheduler;
pub use types::{LastRequest, LatencyState, MemorySnapshot, PerfMetrics, RouteStats};
