/// Metrics and telemetry for the perch server
///
/// Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Feed assembly chunk queries
/// - Social operations (follow/unfollow, like/unlike, comment)
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========== Feed Metrics ==========

    /// Post queries issued by the chunked following feed
    pub static ref FEED_CHUNK_QUERIES_TOTAL: IntCounter = register_int_counter!(
        "feed_chunk_queries_total",
        "Total number of per-chunk post queries issued by the following feed"
    )
    .unwrap();

    // ========== Social Metrics ==========

    /// Social operations by type (follow, unfollow, liked, unliked, comment)
    pub static ref SOCIAL_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "social_operations_total",
        "Total number of social graph and engagement operations",
        &["operation"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Record a completed HTTP request
pub fn track_http_request(method: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(duration_secs);
}

/// Record a background job execution
pub fn track_background_job(job_type: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}

/// Encode all registered metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_includes_registered_counters() {
        HTTP_REQUESTS_TOTAL.with_label_values(&["GET", "200"]).inc();

        let output = gather_metrics();
        assert!(output.contains("http_requests_total"));
    }
}
