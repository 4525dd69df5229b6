//! Feed service metrics
//!
//! Collectors register against the default prometheus registry on first use;
//! `/metrics` encodes everything in it, cache counters included.

use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_service_http_requests_total",
        "Total HTTP requests handled by feed-service",
        &["method", "path", "status"]
    )
    .expect("failed to register feed_service_http_requests_total")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_service_http_request_duration_seconds",
        "HTTP request latency for feed-service",
        &["method", "path", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("failed to register feed_service_http_request_duration_seconds")
});

static FEED_GENERATION_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_generation_total",
        "Feed generations by result (success/empty/error)",
        &["result"]
    )
    .expect("failed to register feed_generation_total")
});

static FEED_GENERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_generation_duration_seconds",
        "Time to assemble a ranked feed page",
        &["page"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("failed to register feed_generation_duration_seconds")
});

static TIMELINE_FALLBACK_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_timeline_fallback_total",
        "Personal-pool reads that fell back from the timeline store to Postgres",
        &["reason"]
    )
    .expect("failed to register feed_timeline_fallback_total")
});

static PRECOMPUTE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_precompute_total",
        "Per-user feed precompute outcomes",
        &["status"]
    )
    .expect("failed to register feed_precompute_total")
});

static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_notifications_total",
        "Engagement notifications by delivery status",
        &["status"]
    )
    .expect("failed to register feed_notifications_total")
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

/// `page` is bucketed as "1" or "n" to keep cardinality fixed
pub fn record_feed_generation(result: &str, page: usize, elapsed: Duration) {
    let page_label = if page <= 1 { "1" } else { "n" };
    FEED_GENERATION_TOTAL.with_label_values(&[result]).inc();
    FEED_GENERATION_DURATION_SECONDS
        .with_label_values(&[page_label])
        .observe(elapsed.as_secs_f64());
}

pub fn record_timeline_fallback(reason: &str) {
    TIMELINE_FALLBACK_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_precompute(status: &str) {
    PRECOMPUTE_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_notification(status: &str) {
    NOTIFICATIONS_TOTAL.with_label_values(&[status]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
