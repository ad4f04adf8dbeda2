//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_queue_depth` (gauge): jobs waiting for the execution slot
//! - `gateway_queue_wait_seconds` (histogram): time from enqueue to start
//! - `gateway_jobs_total` (counter): jobs by outcome
//! - `gateway_job_duration_seconds` (histogram): time from start to finish
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::queue::JobOutcome;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let method = method.to_string();
    let route = route.to_string();

    counter!(
        "gateway_requests_total",
        "method" => method.clone(),
        "status" => status.to_string(),
        "route" => route.clone()
    )
    .increment(1);

    histogram!(
        "gateway_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn set_queue_depth(depth: usize) {
    gauge!("gateway_queue_depth").set(depth as f64);
}

pub fn record_queue_wait(wait: Duration) {
    histogram!("gateway_queue_wait_seconds").record(wait.as_secs_f64());
}

pub fn record_job(outcome: JobOutcome, elapsed: Duration) {
    counter!("gateway_jobs_total", "outcome" => outcome.as_str()).increment(1);
    if outcome != JobOutcome::Skipped {
        histogram!("gateway_job_duration_seconds", "outcome" => outcome.as_str())
            .record(elapsed.as_secs_f64());
    }
}
