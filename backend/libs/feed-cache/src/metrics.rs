//! Cache metrics for observability

use crate::keys::CacheKey;
use prometheus::{register_int_counter_vec, IntCounterVec};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: IntCounterVec,
    misses: IntCounterVec,
    writes: IntCounterVec,
    invalidations: IntCounterVec,
    errors: IntCounterVec,
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: register_int_counter_vec!("feed_cache_hits_total", "Total cache hits", &["entity"])
                .expect("valid metric definition"),
            misses: register_int_counter_vec!(
                "feed_cache_misses_total",
                "Total cache misses",
                &["entity"]
            )
            .expect("valid metric definition"),
            writes: register_int_counter_vec!(
                "feed_cache_writes_total",
                "Total cache writes",
                &["entity"]
            )
            .expect("valid metric definition"),
            invalidations: register_int_counter_vec!(
                "feed_cache_invalidations_total",
                "Total keys removed by pattern invalidation",
                &["entity"]
            )
            .expect("valid metric definition"),
            errors: register_int_counter_vec!(
                "feed_cache_errors_total",
                "Total cache errors",
                &["entity", "error_type"]
            )
            .expect("valid metric definition"),
        }
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

fn extract_entity(key: &str) -> &str {
    CacheKey::entity_type(key)
        .map(|entity| entity.trim_end_matches('*'))
        .unwrap_or("unknown")
}

/// Cache metrics wrapper, registered in the default prometheus registry
#[derive(Clone, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_hit(&self, key: &str) {
        get_metrics()
            .hits
            .with_label_values(&[extract_entity(key)])
            .inc();
    }

    pub fn record_miss(&self, key: &str) {
        get_metrics()
            .misses
            .with_label_values(&[extract_entity(key)])
            .inc();
    }

    pub fn record_write(&self, key: &str) {
        get_metrics()
            .writes
            .with_label_values(&[extract_entity(key)])
            .inc();
    }

    pub fn record_invalidation(&self, pattern: &str, count: usize) {
        get_metrics()
            .invalidations
            .with_label_values(&[extract_entity(pattern)])
            .inc_by(count as u64);
    }

    pub fn record_error(&self, key: &str, error_type: &str) {
        get_metrics()
            .errors
            .with_label_values(&[extract_entity(key), error_type])
            .inc();
    }
}
