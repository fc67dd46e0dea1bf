//! Metrics and observability utilities
//!
//! Prometheus counters for the recipe domain plus request latency
//! histograms, under a common `foodgram_` prefix.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Foodgram metrics
pub const METRICS_PREFIX: &str = "foodgram";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Recipe metrics
    describe_counter!(
        format!("{}_recipes_total", METRICS_PREFIX),
        Unit::Count,
        "Recipe writes by action (created, updated, deleted)"
    );

    describe_counter!(
        format!("{}_bookmarks_total", METRICS_PREFIX),
        Unit::Count,
        "Favorite and shopping cart toggles"
    );

    // Social metrics
    describe_counter!(
        format!("{}_follows_total", METRICS_PREFIX),
        Unit::Count,
        "Subscriptions created and removed"
    );

    // Shopping list metrics
    describe_counter!(
        format!("{}_shopping_list_downloads_total", METRICS_PREFIX),
        Unit::Count,
        "Shopping lists downloaded"
    );

    describe_histogram!(
        format!("{}_shopping_list_lines", METRICS_PREFIX),
        Unit::Count,
        "Aggregated lines per downloaded shopping list"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Recipe created, updated or deleted
pub fn record_recipe(action: &'static str) {
    counter!(
        format!("{}_recipes_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);
}

/// Favorite or cart entry added or removed
pub fn record_bookmark(list: &'static str, action: &'static str) {
    counter!(
        format!("{}_bookmarks_total", METRICS_PREFIX),
        "list" => list,
        "action" => action
    )
    .increment(1);
}

/// Subscription added or removed
pub fn record_follow(action: &'static str) {
    counter!(
        format!("{}_follows_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);
}

/// Shopping list served
pub fn record_shopping_list(lines: usize) {
    counter!(format!("{}_shopping_list_downloads_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_shopping_list_lines", METRICS_PREFIX)).record(lines as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops and must not panic
        register_metrics();
        record_recipe("created");
        record_bookmark("favorite", "added");
        record_follow("removed");
        record_shopping_list(3);

        let metrics = RequestMetrics::start("GET", "/api/recipes/");
        metrics.finish(200);
    }
}
