//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (routes, matches, binding churn, table size)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_routes_total` (counter): route calls by exchange, kind
//! - `router_unroutable_total` (counter): routes that matched no queue
//! - `router_matched_queues` (histogram): queues per routed message
//! - `router_binding_changes_total` (counter): bind/unbind by op
//! - `router_exchanges`, `router_bindings` (gauge): current table size
//! - `router_config_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are exchange names, never routing keys (unbounded cardinality)
//! - Only declared exchanges are recorded; a route to an undeclared name fails
//!   before recording, so the `exchange` label set is bounded by the topology

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::ExchangeKind;

/// Install the Prometheus exporter with an HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_route(exchange: &str, kind: ExchangeKind, matched: usize) {
    counter!(
        "router_routes_total",
        "exchange" => exchange.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
    histogram!("router_matched_queues", "exchange" => exchange.to_string()).record(matched as f64);
    if matched == 0 {
        counter!("router_unroutable_total", "exchange" => exchange.to_string()).increment(1);
    }
}

pub fn record_binding_change(op: &'static str) {
    counter!("router_binding_changes_total", "op" => op).increment(1);
}

pub fn record_table_size(exchanges: usize, bindings: usize) {
    gauge!("router_exchanges").set(exchanges as f64);
    gauge!("router_bindings").set(bindings as f64);
}

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("router_config_reloads_total", "result" => result).increment(1);
}
