use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use crate::metrics::RedisMetrics;

use super::current_time_ms;

/// Connection health of the counter-store Redis pool.
#[derive(Debug, Default)]
pub struct RedisHealth {
    connected: AtomicBool,
    last_connected_ms: AtomicI64,
    failed_connects: AtomicU32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisHealthStats {
    pub connected: bool,
    pub last_connected_ms: i64,
    pub failed_connects: u32,
}

impl RedisHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self) {
        self.connected.store(true, Ordering::Release);
        self.last_connected_ms.store(current_time_ms(), Ordering::Release);
        self.failed_connects.store(0, Ordering::Release);
        RedisMetrics::set_connected(true);
    }

    pub fn set_disconnected(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            tracing::warn!("Redis counter store connection lost");
        }
        RedisMetrics::set_connected(false);
    }

    pub fn record_connect_failure(&self) {
        self.failed_connects.fetch_add(1, Ordering::AcqRel);
        self.set_disconnected();
        RedisMetrics::record_connection_failure();
    }

    pub fn is_healthy(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RedisHealthStats {
        RedisHealthStats {
            connected: self.is_healthy(),
            last_connected_ms: self.last_connected_ms.load(Ordering::Acquire),
            failed_connects: self.failed_connects.load(Ordering::Acquire),
        }
    }
}
