//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    // Default histogram buckets (seconds) for HTTP latency metrics.
    // Common Prometheus defaults plus sub-millisecond buckets for fast endpoints.
    let buckets = vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus
/// output includes HELP/TYPE lines for all metrics from startup (not just
/// after first use).
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!(
        "syncboard_http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "syncboard_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "syncboard_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Authorization metrics
    describe_counter!(
        "syncboard_authz_denied_total",
        "Operations rejected by the authorization engine"
    );

    // Activity pipeline metrics
    describe_counter!(
        "syncboard_activities_recorded_total",
        "Durable activity rows appended, by kind"
    );
    describe_counter!(
        "syncboard_broadcasts_delivered_total",
        "Activity events delivered to websocket subscribers"
    );

    // Realtime metrics
    describe_gauge!(
        "syncboard_ws_connections",
        "Number of websocket connections currently registered"
    );

    // Counters gated behind specific code-paths need an explicit
    // zero-increment for HELP/TYPE lines to appear from startup; gauges and
    // middleware-driven metrics self-initialise quickly.
    counter!("syncboard_authz_denied_total", "reason" => "not_member").absolute(0);
    counter!("syncboard_authz_denied_total", "reason" => "forbidden").absolute(0);
    counter!("syncboard_activities_recorded_total", "kind" => "NOTIFY").absolute(0);
    counter!("syncboard_broadcasts_delivered_total", "room" => "").absolute(0);
    histogram!(
        "syncboard_http_request_duration_seconds",
        "method" => "GET",
        "path" => "/health",
        "status" => "200"
    )
    .record(0.0);
    gauge!("syncboard_http_requests_in_flight").set(0.0);
    gauge!("syncboard_ws_connections").set(0.0);
}
