//! Prometheus metrics (§10.4): HTTP, ingestion/classification, and hub
//! gauges, registered once at process start via `lazy_static!`.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    pub static ref HTTP_RESPONSE_SIZE_BYTES: HistogramVec = register_histogram_vec!(
        "http_response_size_bytes",
        "HTTP response size in bytes",
        &["method", "endpoint"],
        vec![100.0, 1000.0, 5000.0, 10000.0, 50000.0, 100000.0, 500000.0]
    )
    .unwrap();

    /// Notifications accepted by the ingestion pipeline (C6), by outcome.
    pub static ref NOTIFICATIONS_INGESTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "notifications_ingested_total",
        "Total notifications submitted through the ingestion pipeline",
        &["outcome"]
    )
    .unwrap();

    /// Classification outcomes from the auto-classifier and rule engine (C5).
    pub static ref CLASSIFICATION_TOTAL: IntCounterVec = register_int_counter_vec!(
        "classification_total",
        "Total notifications classified, by resulting category",
        &["category", "source"]
    )
    .unwrap();

    /// WebSocket sessions currently registered in the hub (C7), per instance.
    pub static ref WS_ACTIVE_SESSIONS: IntGaugeVec = register_int_gauge_vec!(
        "ws_active_sessions",
        "Number of WebSocket sessions currently registered with the hub",
        &["instance"]
    )
    .unwrap();

    /// Fan-out deliveries, by path taken (direct / bus / queued) and outcome.
    pub static ref FANOUT_DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fanout_deliveries_total",
        "Total fan-out delivery attempts, by path and outcome",
        &["path", "outcome"]
    )
    .unwrap();

    /// Sessions dropped by the hub for a full send buffer (backpressure, §5).
    pub static ref WS_SLOW_SESSIONS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ws_slow_sessions_dropped_total",
        "Total sessions dropped by the hub due to a full send buffer",
        &["reason"]
    )
    .unwrap();

    /// Expired notifications removed by the cleanup job (C9).
    pub static ref CLEANUP_DELETED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cleanup_deleted_total",
        "Total expired notifications removed by the cleanup job",
        &["table"]
    )
    .unwrap();
}

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64, response_size: usize) {
    HTTP_REQUESTS_TOTAL.with_label_values(&[method, endpoint, &status.to_string()]).inc();
    HTTP_REQUEST_DURATION_SECONDS.with_label_values(&[method, endpoint]).observe(duration_secs);
    HTTP_RESPONSE_SIZE_BYTES.with_label_values(&[method, endpoint]).observe(response_size as f64);
}

pub fn record_ingestion(outcome: &str) {
    NOTIFICATIONS_INGESTED_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_classification(category: &str, source: &str) {
    CLASSIFICATION_TOTAL.with_label_values(&[category, source]).inc();
}

pub fn set_active_sessions(instance: &str, count: i64) {
    WS_ACTIVE_SESSIONS.with_label_values(&[instance]).set(count);
}

pub fn record_fanout(path: &str, outcome: &str) {
    FANOUT_DELIVERIES_TOTAL.with_label_values(&[path, outcome]).inc();
}

pub fn record_slow_session_dropped(reason: &str) {
    WS_SLOW_SESSIONS_DROPPED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_cleanup_deleted(table: &str, count: u64) {
    if count > 0 {
        CLEANUP_DELETED_TOTAL.with_label_values(&[table]).inc_by(count);
    }
}
