//! Redis plumbing for the persistent counter store
//!
//! - `RedisPool`: lazily connected multiplexed connection
//! - `CircuitBreaker`: refuses commands while Redis keeps failing
//! - `RedisHealth`: connection status, mirrored into metrics

mod circuit_breaker;
mod health;
mod pool;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use health::{RedisHealth, RedisHealthStats};
pub use pool::{PoolError, RedisPool};

pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
