//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kernel_requests_total` (counter): intercepted requests by handler, status
//! - `kernel_request_duration_seconds` (histogram): pipeline latency
//! - `kernel_cache_lookups_total` (counter): lookups by strategy, result
//! - `kernel_cache_purged_total` (counter): namespaces removed on activation
//! - `kernel_worker_calls_total` (counter): dispatches by worker, outcome
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Labels kept low-cardinality (no paths)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed intercepted request.
pub fn record_request(handler: &'static str, status: u16, start: Instant) {
    counter!(
        "kernel_requests_total",
        "handler" => handler,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("kernel_request_duration_seconds", "handler" => handler)
        .record(start.elapsed().as_secs_f64());
}

/// Record a cache lookup.
pub fn record_cache_lookup(strategy: &'static str, hit: bool) {
    counter!(
        "kernel_cache_lookups_total",
        "strategy" => strategy,
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// Record namespaces purged by activation.
pub fn record_cache_purged(count: usize) {
    counter!("kernel_cache_purged_total").increment(count as u64);
}

/// Record the outcome of a worker dispatch.
pub fn record_worker_call(worker: &str, outcome: &'static str) {
    counter!(
        "kernel_worker_calls_total",
        "worker" => worker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
