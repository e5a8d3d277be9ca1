//! Reservation metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `seatlock_reservations_total{strategy,outcome}` - Attempts by outcome
//!   (`claimed`, `not_found`, `already_claimed`, `conflict`, `error`)
//! - `seatlock_lock_release_failures_total` - Distributed lock releases that failed
//! - `seatlock_store_version_conflicts_total` - Version-checked writes rejected by Postgres
//! - `seatlock_store_duplicate_claims_total` - Claim inserts rejected by the unique constraint
//! - `seatlock_lock_backend_errors_total{op}` - Redis command failures
//!
//! ## Histograms
//! - `seatlock_reservation_duration_seconds{strategy}` - Attempt latency

use crate::error::ReservationError;
use crate::strategy::StrategyKind;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use seatlock_core::types::ClaimId;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register descriptions for every seatlock metric.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_reservation_metrics() {
    describe_counter!(
        "seatlock_reservations_total",
        "Total reservation attempts by strategy and outcome"
    );
    describe_histogram!(
        "seatlock_reservation_duration_seconds",
        "Time taken by a reservation attempt, including lock waits"
    );
    describe_counter!(
        "seatlock_lock_release_failures_total",
        "Distributed lock releases that failed and were left to expire"
    );
    describe_counter!(
        "seatlock_store_version_conflicts_total",
        "Version-checked seat writes rejected because the seat changed"
    );
    describe_counter!(
        "seatlock_store_duplicate_claims_total",
        "Claim inserts rejected because the seat already had a claim"
    );
    describe_counter!(
        "seatlock_lock_backend_errors_total",
        "Lock coordinator commands that failed"
    );

    tracing::info!("Reservation metrics registered");
}

/// Install a Prometheus recorder with an HTTP scrape endpoint on `port`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_prometheus_exporter(port: u16) -> Result<(), MetricsError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_reservation_metrics();
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Record the outcome and latency of one attempt.
pub fn record_reservation(
    kind: StrategyKind,
    result: &Result<ClaimId, ReservationError>,
    elapsed: Duration,
) {
    let outcome = match result {
        Ok(_) => "claimed",
        Err(error) => error.outcome_label(),
    };

    metrics::counter!(
        "seatlock_reservations_total",
        "strategy" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("seatlock_reservation_duration_seconds", "strategy" => kind.as_str())
        .record(elapsed.as_secs_f64());
}

/// Record a distributed lock release that failed.
pub fn record_lock_release_failure() {
    metrics::counter!("seatlock_lock_release_failures_total").increment(1);
}
