//! Axum middleware adapter.
//!
//! Mounts the monitor on an axum/tower host: serves the metrics
//! endpoint, otherwise times each request and feeds the monitor.
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{Router, middleware, routing::get};
//! use perfmon_core::{MonitorConfig, PerfMonitor};
//! use perfmon_http::track_http;
//!
//! let monitor = PerfMonitor::new(MonitorConfig::default());
//! let app: Router = Router::new()
//!     .route("/hello", get(|| async { "hi" }))
//!     .layer(middleware::from_fn(move |req, next| {
//!         track_http(monitor.clone(), req, next)
//!     }));
//! # let _ = app;
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use perfmon_core::PerfMonitor;

use crate::route;

/// Records one request's duration exactly once, whether the response
/// future completes or is dropped mid-flight (client disconnect,
/// timeout layer, server shutdown).
struct LatencyGuard {
    monitor: Arc<PerfMonitor>,
    route_key: String,
    started: Instant,
    recorded: bool,
}

impl LatencyGuard {
    fn new(monitor: Arc<PerfMonitor>, route_key: String) -> Self {
        Self {
            monitor,
            route_key,
            started: Instant::now(),
            recorded: false,
        }
    }

    fn record(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.monitor.record_request(&self.route_key, duration_ms);
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        self.record();
    }
}

/// Axum middleware: serve the metrics endpoint, otherwise time the
/// request. Route keys prefer the matched route pattern so dynamic
/// segments aggregate under one key, falling back to the raw path.
pub async fn track_http(
    monitor: Arc<PerfMonitor>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if let Some(metrics_route) = monitor.config().metrics_route.as_deref() {
        if route::is_metrics_request(Some(&method), Some(&target), metrics_route) {
            tracing::debug!(target: "perfmon", path = %target, "serving metrics snapshot");
            return Json(monitor.get_metrics()).into_response();
        }
    }

    if !monitor.config().enable_latency {
        return next.run(req).await;
    }

    let pattern = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string());
    let route_key = match pattern {
        Some(pattern) => route::route_key(Some(&method), Some(&pattern)),
        None => route::route_key(Some(&method), Some(&target)),
    };

    let mut guard = LatencyGuard::new(monitor, route_key);
    let response = next.run(req).await;
    guard.record();
    response
}
