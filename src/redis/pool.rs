use std::future::Future;
use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, RedisResult};
use tokio::sync::RwLock;

use crate::config::RedisConfig;
use crate::error::NotificationError;

use super::{CircuitBreaker, CircuitState, RedisHealth};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Circuit breaker is open")]
    CircuitOpen,
}

impl From<PoolError> for NotificationError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Redis(e) => NotificationError::Redis(e),
            PoolError::CircuitOpen => {
                NotificationError::CounterStore("counter store circuit is open".to_string())
            }
        }
    }
}

/// Shared multiplexed connection to the counter-store Redis.
///
/// The connection is opened lazily and dropped again when a command fails
/// with an I/O error, so the next command reconnects.
pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    circuit_breaker: Arc<CircuitBreaker>,
    health: Arc<RedisHealth>,
}

impl RedisPool {
    pub fn new(
        config: &RedisConfig,
        circuit_breaker: Arc<CircuitBreaker>,
        health: Arc<RedisHealth>,
    ) -> Result<Self, PoolError> {
        let client = Client::open(config.url.as_str())?;
        Ok(Self {
            client,
            connection: RwLock::new(None),
            circuit_breaker,
            health,
        })
    }

    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        if !self.circuit_breaker.allow_request() {
            return Err(PoolError::CircuitOpen);
        }

        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *slot = Some(conn.clone());
                self.health.set_connected();
                tracing::info!("Redis counter store connected");
                Ok(conn)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                self.health.record_connect_failure();
                tracing::error!(error = %e, "Failed to connect to Redis counter store");
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Run one command (or pipeline) against the shared connection,
    /// feeding the outcome into the circuit breaker.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;

        match f(conn).await {
            Ok(value) => {
                self.circuit_breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                if e.is_connection_dropped() || e.is_io_error() {
                    self.connection.write().await.take();
                    self.health.set_disconnected();
                }
                tracing::warn!(error = %e, "Redis counter store command failed");
                Err(PoolError::Redis(e))
            }
        }
    }

    pub async fn ping(&self) -> Result<(), PoolError> {
        let _: String = self
            .execute(|mut conn| async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(())
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy() && self.circuit_breaker.state() != CircuitState::Open
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}
