//! Prometheus metrics exposition for the health manager.
//!
//! Publishes per-status account gauges and probe-outcome counters, mirroring
//! the original `reddit_pool_*` series from the account pool manager.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Publish one cycle's account-status snapshot as gauges.
pub fn record_health_counts(counts: &account_pool::HealthCounts) {
    metrics::gauge!("account_pool_ready").set(counts.ready as f64);
    metrics::gauge!("account_pool_leased").set(counts.leased as f64);
    metrics::gauge!("account_pool_quarantine").set(counts.quarantine as f64);
    metrics::gauge!("account_pool_cooling").set(counts.cooling as f64);
}

/// Record a single probe's classified outcome.
pub fn record_probe_outcome(outcome: &str) {
    metrics::counter!("account_pool_probe_total", "outcome" => outcome.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use account_pool::HealthCounts;

    #[test]
    fn record_health_counts_renders_all_four_gauges() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_health_counts(&HealthCounts {
            ready: 3,
            leased: 1,
            quarantine: 0,
            cooling: 2,
        });

        let output = handle.render();
        assert!(output.contains("account_pool_ready 3"));
        assert!(output.contains("account_pool_leased 1"));
        assert!(output.contains("account_pool_quarantine 0"));
        assert!(output.contains("account_pool_cooling 2"));
    }

    #[test]
    fn record_probe_outcome_labels_each_outcome_separately() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_probe_outcome("ok");
        record_probe_outcome("auth");
        record_probe_outcome("auth");

        let output = handle.render();
        assert!(output.contains("outcome=\"ok\""));
        assert!(output.contains("outcome=\"auth\""));
    }
}
