//! perfmon-lite demo.
//!
//! An axum app with the monitor mounted as middleware:
//!
//! ```text
//! cargo run -p axum-demo
//! curl http://localhost:3000/fast
//! curl http://localhost:3000/slow
//! curl http://localhost:3000/metrics
//! ```
//!
//! The `/slow` route exceeds the configured latency threshold, so each
//! hit logs a `[perfmon-lite]` warning.

use std::time::Duration;

use axum::{Json, Router, middleware, routing::get};
use perfmon_core::{AlertThresholds, MonitorConfig};
use perfmon_http::{perf_mon, track_http};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "info,perfmon=debug,perfmon_core=debug,perfmon_http=debug"
                        .parse()
                        .unwrap()
                }),
        )
        .init();

    let config = MonitorConfig::default().with_alert_thresholds(AlertThresholds {
        lag_ms: Some(150.0),
        memory_bytes: Some(400 * 1024 * 1024),
        latency_ms: Some(750.0),
    });
    let mon = perf_mon(config);
    let monitor = mon.monitor().clone();

    let app = Router::new()
        .route("/fast", get(fast))
        .route("/slow", get(slow))
        .layer(middleware::from_fn(move |req, next| {
            track_http(monitor.clone(), req, next)
        }));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "perfmon-lite demo running; metrics at /metrics");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn fast() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "fast" }))
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(900)).await;
    Json(serde_json::json!({ "status": "ok", "delay": 900 }))
}
