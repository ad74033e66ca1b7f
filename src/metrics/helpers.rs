//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::destination::DestinationType;

use super::{
    COUNTER_STORE_ERRORS_TOTAL, CREDENTIAL_FAILURES_TOTAL, QUOTA_CHECKS_TOTAL,
    REDIS_CONNECTED, REDIS_CONNECTION_FAILURES_TOTAL, SENDS_TOTAL, SEND_LATENCY,
    SEND_STATUS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

pub struct SendMetrics;

impl SendMetrics {
    /// Record one finished send and its duration
    pub fn record(destination_type: DestinationType, status_code: u16, elapsed: Duration) {
        let kind = destination_type.as_str();
        let outcome = if (200..300).contains(&status_code) {
            "success"
        } else {
            "failure"
        };
        SENDS_TOTAL.with_label_values(&[kind, outcome]).inc();
        SEND_STATUS_TOTAL
            .with_label_values(&[kind, status_class(status_code)])
            .inc();
        SEND_LATENCY
            .with_label_values(&[kind])
            .observe(elapsed.as_secs_f64());
    }
}

pub struct ThrottleMetrics;

impl ThrottleMetrics {
    pub fn record_quota_check(allowed: bool) {
        let result = if allowed { "allowed" } else { "denied" };
        QUOTA_CHECKS_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn record_store_error(backend: &str, operation: &str) {
        COUNTER_STORE_ERRORS_TOTAL
            .with_label_values(&[backend, operation])
            .inc();
    }
}

pub struct CredentialMetrics;

impl CredentialMetrics {
    pub fn record_failure(region: &str) {
        CREDENTIAL_FAILURES_TOTAL.with_label_values(&[region]).inc();
    }
}

pub struct RedisMetrics;

impl RedisMetrics {
    pub fn set_connected(connected: bool) {
        REDIS_CONNECTED.set(i64::from(connected));
    }

    pub fn record_connection_failure() {
        REDIS_CONNECTION_FAILURES_TOTAL.inc();
    }
}
