//! Prometheus collectors for the document pipeline. Wiring an HTTP `/metrics` endpoint is out of
//! scope (§1), but the collectors themselves are ambient infrastructure the orchestrators and
//! scan workers update directly, the way `pageserver` updates `crate::metrics` inline from deep
//! inside its own call stacks.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};

pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "docflow_uploads_total",
        "Uploads accepted by the upload orchestrator, by outcome",
        &["outcome"]
    )
    .expect("metric registration")
});

pub static SCAN_OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "docflow_scan_outcomes_total",
        "Terminal scan-worker outcomes, by outcome",
        &["outcome"]
    )
    .expect("metric registration")
});

pub static SCAN_RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "docflow_scan_retries_total",
        "Scan task nacks, by error classification",
        &["reason"]
    )
    .expect("metric registration")
});

pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "docflow_downloads_total",
        "Retrieval orchestrator completions, by kind",
        &["kind"]
    )
    .expect("metric registration")
});

pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "docflow_scan_queue_depth",
        "Number of visible (not leased) scan tasks"
    )
    .expect("metric registration")
});

pub static SCAN_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "docflow_scan_duration_seconds",
        "Wall-clock time spent scanning a single document version",
        &["outcome"]
    )
    .expect("metric registration")
});

/// Forces registration of all collectors above. Call once at binary startup so that
/// `/metrics` is never empty even before the first upload, matching the teacher's pattern of
/// pre-registering gauges rather than lazily creating them on first use.
pub fn register_all() {
    Lazy::force(&UPLOADS_TOTAL);
    Lazy::force(&SCAN_OUTCOMES_TOTAL);
    Lazy::force(&SCAN_RETRIES_TOTAL);
    Lazy::force(&DOWNLOADS_TOTAL);
    Lazy::force(&QUEUE_DEPTH);
    Lazy::force(&SCAN_DURATION_SECONDS);
}
