use std::sync::Arc;

use crate::config::CounterConfig;
use crate::redis::RedisPool;

use super::backend::CounterStore;
use super::memory_backend::MemoryCounterStore;
use super::redis_backend::RedisCounterStore;

/// Create the counter store named by `counter.backend`.
///
/// - `"redis"`: [`RedisCounterStore`] when a pool is available
/// - anything else: [`MemoryCounterStore`]
pub fn create_counter_store(
    settings: &CounterConfig,
    redis_pool: Option<Arc<RedisPool>>,
) -> Arc<dyn CounterStore> {
    match settings.backend.as_str() {
        "redis" => match redis_pool {
            Some(pool) => {
                tracing::info!(backend = "redis", prefix = %settings.redis_prefix, "Creating Redis counter store");
                Arc::new(RedisCounterStore::new(pool, settings.redis_prefix.clone()))
            }
            None => {
                tracing::warn!("Redis counter store requested but no pool provided, falling back to memory");
                Arc::new(MemoryCounterStore::new())
            }
        },
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory counter store");
            Arc::new(MemoryCounterStore::new())
        }
        other => {
            tracing::warn!(backend = %other, "Unknown counter store backend, using memory");
            Arc::new(MemoryCounterStore::new())
        }
    }
}
