//! Prometheus metrics for listings and image resolution.

use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn};

pub const QUERY_TOTAL: &str = "events_query_total";
pub const QUERY_ERRORS_TOTAL: &str = "events_query_errors_total";
pub const QUERY_DURATION_SECONDS: &str = "events_query_duration_seconds";
pub const QUERY_PAGE_SIZE: &str = "events_query_page_size";
pub const IMAGES_ORIGINAL_TOTAL: &str = "images_resolved_original_total";
pub const IMAGES_FALLBACK_TOTAL: &str = "images_resolved_fallback_total";
pub const IMAGES_REJECTED_TOTAL: &str = "images_candidate_rejected_total";

/// Install the Prometheus exporter. Safe to call when an exporter is already running.
pub fn init_metrics(addr: SocketAddr) {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

/// Records elapsed time into a histogram when dropped.
pub struct TimingGuard {
    start: Instant,
    histogram_name: &'static str,
}

impl TimingGuard {
    pub fn new(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name,
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        ::metrics::histogram!(self.histogram_name).record(duration);
    }
}

pub struct QueryMetrics;

impl QueryMetrics {
    pub fn time_query() -> TimingGuard {
        TimingGuard::new(QUERY_DURATION_SECONDS)
    }

    pub fn record_query(page_size: usize) {
        ::metrics::counter!(QUERY_TOTAL).increment(1);
        ::metrics::histogram!(QUERY_PAGE_SIZE).record(page_size as f64);
    }

    pub fn record_error() {
        ::metrics::counter!(QUERY_ERRORS_TOTAL).increment(1);
    }
}

pub struct ImageMetrics;

impl ImageMetrics {
    pub fn record_original() {
        ::metrics::counter!(IMAGES_ORIGINAL_TOTAL).increment(1);
    }

    pub fn record_fallback() {
        ::metrics::counter!(IMAGES_FALLBACK_TOTAL).increment(1);
    }

    pub fn record_rejected(candidate_kind: &'static str) {
        ::metrics::counter!(IMAGES_REJECTED_TOTAL, "kind" => candidate_kind).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_an_installed_recorder_is_a_no_op() {
        let guard = QueryMetrics::time_query();
        QueryMetrics::record_query(3);
        ImageMetrics::record_rejected("og:image");
        drop(guard);
    }
}
