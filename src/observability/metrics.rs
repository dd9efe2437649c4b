//! Metrics collection and exposition.
//!
//! # Metrics
//! - `snare_sessions_total` (counter): admitted sessions by protocol
//! - `snare_sessions_rejected_total` (counter): connections closed at capacity
//! - `snare_sessions_active` (gauge): sessions currently running
//! - `snare_session_duration_seconds` (histogram): time held, by protocol and end
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::session::{Protocol, SessionEnd};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    metrics::describe_counter!("snare_sessions_total", "Sessions admitted");
    metrics::describe_counter!(
        "snare_sessions_rejected_total",
        "Connections closed because every slot was taken"
    );
    metrics::describe_gauge!("snare_sessions_active", "Sessions currently running");
    metrics::describe_histogram!(
        "snare_session_duration_seconds",
        metrics::Unit::Seconds,
        "How long each session held its peer"
    );
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_session_started(protocol: Protocol) {
    metrics::counter!("snare_sessions_total", "protocol" => protocol.as_str()).increment(1);
}

/// Paired with `record_session_released` through `ConnectionGuard`, so the
/// gauge falls on every exit path, panics included.
pub fn record_session_tracked() {
    metrics::gauge!("snare_sessions_active").increment(1.0);
}

pub fn record_session_released() {
    metrics::gauge!("snare_sessions_active").decrement(1.0);
}

pub fn record_session_finished(protocol: Protocol, end: SessionEnd, held: Duration) {
    metrics::histogram!(
        "snare_session_duration_seconds",
        "protocol" => protocol.as_str(),
        "end" => end.as_str()
    )
    .record(held.as_secs_f64());
}

pub fn record_rejected() {
    metrics::counter!("snare_sessions_rejected_total").increment(1);
}
