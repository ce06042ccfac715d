//! Client metrics
//!
//! - `auth_calls_total` (counter): label `outcome`
//! - `auth_refresh_total` (counter): label `outcome` (`success`, `rejected`, `failed`, `discarded`)
//! - `auth_refresh_duration_seconds` (histogram)
//!
//! All calls are no-ops until the embedding application installs a recorder.

/// Record a finished `call()` with its outcome label.
pub fn record_call(outcome: &'static str) {
    metrics::counter!("auth_calls_total", "outcome" => outcome).increment(1);
}

/// Record one refresh call reaching the backend.
pub fn record_refresh(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);
    metrics::histogram!("auth_refresh_duration_seconds").record(duration_secs);
}
