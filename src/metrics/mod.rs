//! Prometheus metrics for notification delivery.
//!
//! - Send metrics (attempts by destination type and outcome, latency)
//! - Quota metrics (checks allowed/denied, counter store errors)
//! - Credential resolution failures
//! - Redis counter-store health

mod helpers;

pub use helpers::{encode_metrics, CredentialMetrics, RedisMetrics, SendMetrics, ThrottleMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notifications";

lazy_static! {
    // ============================================================================
    // Send Metrics
    // ============================================================================

    /// Send attempts by destination type and outcome
    pub static ref SENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sends_total", METRIC_PREFIX),
        "Total send attempts",
        &["destination_type", "outcome"]
    ).unwrap();

    /// Responses by destination type and status class (2xx, 4xx, 5xx)
    pub static ref SEND_STATUS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_send_status_total", METRIC_PREFIX),
        "Send responses by status class",
        &["destination_type", "status_class"]
    ).unwrap();

    pub static ref SEND_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_send_latency_seconds", METRIC_PREFIX),
        "Time spent delivering one message",
        &["destination_type"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // ============================================================================
    // Quota Metrics
    // ============================================================================

    pub static ref QUOTA_CHECKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_quota_checks_total", METRIC_PREFIX),
        "Monthly quota checks by result",
        &["result"]
    ).unwrap();

    pub static ref COUNTER_STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_counter_store_errors_total", METRIC_PREFIX),
        "Counter store operation failures",
        &["backend", "operation"]
    ).unwrap();

    // ============================================================================
    // Credential Metrics
    // ============================================================================

    pub static ref CREDENTIAL_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_credential_failures_total", METRIC_PREFIX),
        "AWS credential resolution failures",
        &["region"]
    ).unwrap();

    // ============================================================================
    // Redis Metrics
    // ============================================================================

    /// 1 while the counter store holds a live Redis connection
    pub static ref REDIS_CONNECTED: IntGauge = register_int_gauge!(
        format!("{}_redis_connected", METRIC_PREFIX),
        "Whether the Redis counter store is connected"
    ).unwrap();

    pub static ref REDIS_CONNECTION_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_redis_connection_failures_total", METRIC_PREFIX),
        "Failed Redis connection attempts"
    ).unwrap();
}
