//! Metrics collection and exposition.
//!
//! # Metrics
//! - `command_relay_invocations_total` (counter): calls by command, outcome
//! - `command_relay_invocation_duration_seconds` (histogram): end-to-end latency
//! - `command_relay_retries_total` (counter): backoff retries by command
//! - `command_relay_cache_lookups_total` (counter): hit / miss / shared
//! - `command_relay_cache_entries` (gauge): live cache entries
//! - `command_relay_token_refresh_total` (counter): success / failure / joined
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_invocation(command: &str, outcome: &'static str, start: Instant) {
    counter!(
        "command_relay_invocations_total",
        "command" => command.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("command_relay_invocation_duration_seconds", "command" => command.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(command: &str) {
    counter!("command_relay_retries_total", "command" => command.to_string()).increment(1);
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("command_relay_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("command_relay_cache_entries").set(entries as f64);
}

pub fn record_token_refresh(result: &'static str) {
    counter!("command_relay_token_refresh_total", "result" => result).increment(1);
}
