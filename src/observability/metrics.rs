//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_config_loads_total` (counter): loads by source (remote, cache, defaults)
//! - `site_config_stale_loads_total` (counter): load results discarded as stale
//! - `site_fragment_saves_total` (counter): fragment saves by fragment, outcome
//! - `site_realtime_events_total` (counter): change events by table, kind
//! - `site_content_ops_total` (counter): collection calls by table, op, outcome
//! - `site_notifications_total` (counter): user notifications by level
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are low-cardinality (tables, fragment kinds, fixed outcomes)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_config_load(source: &'static str) {
    metrics::counter!("site_config_loads_total", "source" => source).increment(1);
}

pub fn record_stale_load() {
    metrics::counter!("site_config_stale_loads_total").increment(1);
}

pub fn record_fragment_save(fragment: &'static str, outcome: &'static str) {
    metrics::counter!("site_fragment_saves_total", "fragment" => fragment, "outcome" => outcome)
        .increment(1);
}

pub fn record_realtime_event(table: &str, kind: &'static str) {
    metrics::counter!("site_realtime_events_total", "table" => table.to_string(), "kind" => kind)
        .increment(1);
}

pub fn record_content_op(table: &'static str, op: &'static str, outcome: &'static str) {
    metrics::counter!("site_content_ops_total", "table" => table, "op" => op, "outcome" => outcome)
        .increment(1);
}

pub fn record_notification(level: &'static str) {
    metrics::counter!("site_notifications_total", "level" => level).increment(1);
}
