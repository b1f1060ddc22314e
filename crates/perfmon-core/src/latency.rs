//! Running-average latency aggregation.
//!
//! Averages are maintained incrementally from the previous mean and the
//! count (`(old × (n−1) + value) / n`), rounded to 2 decimals after
//! every update. The per-step rounding compounds; stored values always
//! match what the endpoint reports.

use std::sync::Mutex;

use crate::types::{LastRequest, LatencyState, RouteStats, round2};

/// Maintains the global and per-route running latency averages.
#[derive(Default)]
pub struct LatencyAggregator {
    state: Mutex<LatencyState>,
}

impl LatencyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request.
    ///
    /// Updates the last-request marker, the global average, and the
    /// per-route entry (created on first sight). Durations are rounded
    /// to 2 decimals on entry.
    pub fn record(&self, route_key: &str, duration_ms: f64) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let duration = round2(duration_ms);

        state.last_request = Some(LastRequest {
            route: route_key.to_string(),
            duration,
        });

        state.total_requests += 1;
        let n = state.total_requests as f64;
        state.average = round2((state.average * (n - 1.0) + duration) / n);

        let entry = state
            .per_route
            .entry(route_key.to_string())
            .or_insert_with(RouteStats::default);
        entry.count += 1;
        let route_n = entry.count as f64;
        entry.average = round2((entry.average * (route_n - 1.0) + duration) / route_n);
    }

    /// Current state as an independent copy; mutating the returned value
    /// does not affect the aggregator.
    pub fn read(&self) -> LatencyState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }
}
