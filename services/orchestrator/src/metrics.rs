//! Prometheus metrics exposition for the orchestrator.
//!
//! Account-pool and rate-limiter crates publish their own counters directly
//! through the `metrics` facade (recorder-agnostic); this module owns the
//! series that are specific to the worker fleet: requests by endpoint,
//! items by `{type, subreddit}`, account errors by kind, and the
//! replace-more timing histogram the original system tracked for comment
//! tree expansion.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Histogram buckets (seconds) for the "replace more comments" operation.
pub const REPLACE_MORE_BUCKETS: &[f64] = &[0.1, 0.3, 0.7, 1.5, 3.0, 6.0, 12.0, 24.0, 48.0];

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("orchestrator_replace_more_seconds".to_string()),
            REPLACE_MORE_BUCKETS,
        )
        .expect("replace-more bucket set is non-empty")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub fn record_request(endpoint: &str) {
    metrics::counter!("orchestrator_requests_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_items(item_type: &str, subreddit: &str, count: u64) {
    metrics::counter!(
        "orchestrator_items_total",
        "type" => item_type.to_string(),
        "subreddit" => subreddit.to_string()
    )
    .increment(count);
}

pub fn record_account_error(kind: &str) {
    metrics::counter!("orchestrator_account_error_total", "kind" => kind.to_string()).increment(1);
}

pub fn observe_replace_more(seconds: f64) {
    metrics::histogram!("orchestrator_replace_more_seconds").record(seconds);
}

pub fn set_inflight_replace_more(count: i64) {
    metrics::gauge!("orchestrator_replace_more_inflight").set(count as f64);
}

pub fn set_worker_count(count: usize) {
    metrics::gauge!("orchestrator_worker_count").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn records_render_with_their_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("listing");
        record_items("submission", "rust", 3);
        record_account_error("rate-limit");
        observe_replace_more(1.2);
        set_inflight_replace_more(2);
        set_worker_count(6);

        let output = handle.render();
        assert!(output.contains("endpoint=\"listing\""));
        assert!(output.contains("type=\"submission\""));
        assert!(output.contains("subreddit=\"rust\""));
        assert!(output.contains("kind=\"rate-limit\""));
        assert!(output.contains("orchestrator_replace_more_seconds"));
        assert!(output.contains("orchestrator_replace_more_inflight 2"));
        assert!(output.contains("orchestrator_worker_count 6"));
    }
}
