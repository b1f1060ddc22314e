//! Snapshot types for the performance monitor.
//!
//! These are the values handed out by the monitor's `get_metrics` and
//! serialized by the metrics endpoint. Serialized field names follow the
//! camelCase wire format consumed by dashboards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Process memory reading at sample time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    /// Resident set size in bytes.
    pub rss: u64,
    /// Address space reserved by the allocator, in bytes.
    pub heap_total: u64,
    /// Heap bytes currently in use. The memory alert compares against
    /// this field.
    pub heap_used: u64,
    /// Memory held outside the heap (buffers, mapped files).
    pub external: u64,
    /// Bytes held by raw array buffers.
    pub array_buffers: u64,
}

/// The most recently completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastRequest {
    /// Route key ("METHOD /path").
    pub route: String,
    /// Duration in milliseconds, rounded to 2 decimals.
    pub duration: f64,
}

/// Running latency statistics for a single route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    /// Requests observed for this route. Only increases.
    pub count: u64,
    /// Running mean duration in milliseconds.
    pub average: f64,
}

/// Aggregated request latency state.
///
/// Invariant: `total_requests` equals the sum of all `per_route` counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyState {
    /// Last recorded request, absent until the first one completes.
    pub last_request: Option<LastRequest>,
    /// Global running mean duration in milliseconds.
    pub average: f64,
    /// Requests recorded since construction.
    pub total_requests: u64,
    /// Per-route statistics keyed by "METHOD /path".
    pub per_route: HashMap<String, RouteStats>,
}

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfMetrics {
    /// Seconds since the monitor was last started.
    pub uptime: f64,
    /// Last sampled mean event-loop lag in milliseconds.
    pub event_loop_lag: f64,
    /// Last sampled memory reading.
    pub memory: MemorySnapshot,
    /// Current latency aggregation state.
    pub latency: LatencyState,
}

/// Round to 2 decimal places. Averages are rounded at every update, so
/// rounding error carries into later updates; display and stored values
/// stay identical.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
