//! Prometheus recorder for the client's auth metrics
//!
//! `auth_refresh_duration_seconds` gets explicit buckets so it renders as a
//! histogram rather than a summary.

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const REFRESH_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("auth_refresh_duration_seconds".to_string()),
        REFRESH_BUCKETS,
    )
}

/// Install the global recorder and return a handle for rendering a snapshot.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}
