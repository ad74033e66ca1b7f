//! Redis counter store.
//!
//! Each day bucket is a hash at `{prefix}:{yyyy-MM-dd}` with one field per
//! counter. Increments run as a MULTI/HINCRBY/EXEC pipeline, so a bucket
//! never loses an update; the monthly check that precedes it stays racy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::metrics::ThrottleMetrics;
use crate::redis::RedisPool;

use super::backend::{search_days, CounterStore, CounterStoreError};
use super::counters::{day_key, CounterBucket, Counters};

pub struct RedisCounterStore {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisCounterStore {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    fn bucket_key(&self, day: NaiveDate) -> String {
        format!("{}:{}", self.prefix, day_key(day))
    }

    fn record<T>(&self, op: &'static str, result: Result<T, CounterStoreError>) -> Result<T, CounterStoreError> {
        if let Err(e) = &result {
            ThrottleMetrics::record_store_error(self.backend_type(), op);
            tracing::warn!(backend = self.backend_type(), operation = op, error = %e, "Counter store operation failed");
        }
        result
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get_counter_bucket(&self, day: NaiveDate) -> Result<Counters, CounterStoreError> {
        let key = self.bucket_key(day);
        let result = self
            .pool
            .execute(|mut conn| async move {
                let fields: HashMap<String, i64> = redis::cmd("HGETALL").arg(&key).query_async(&mut conn).await?;
                Ok(fields)
            })
            .await
            .map(Counters::from_fields)
            .map_err(CounterStoreError::from);
        self.record("get", result)
    }

    async fn put_counter_bucket(&self, day: NaiveDate, counters: &Counters) -> Result<(), CounterStoreError> {
        let key = self.bucket_key(day);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &counters.fields())
            .ignore();

        let result = self
            .pool
            .execute(|mut conn| async move {
                let _: () = pipe.query_async(&mut conn).await?;
                Ok(())
            })
            .await
            .map_err(CounterStoreError::from);
        self.record("put", result)
    }

    async fn search_counter_buckets(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CounterBucket>, CounterStoreError> {
        let days = search_days(start, end)?;
        let mut pipe = redis::pipe();
        for day in &days {
            pipe.cmd("HGETALL").arg(self.bucket_key(*day));
        }

        let result = self
            .pool
            .execute(|mut conn| async move {
                let hashes: Vec<HashMap<String, i64>> = pipe.query_async(&mut conn).await?;
                Ok(hashes)
            })
            .await
            .map(|hashes| {
                days.into_iter()
                    .zip(hashes)
                    .filter(|(_, fields)| !fields.is_empty())
                    .map(|(counter_day, fields)| CounterBucket {
                        counter_day,
                        counters: Counters::from_fields(fields),
                    })
                    .collect()
            })
            .map_err(CounterStoreError::from);
        self.record("search", result)
    }

    async fn increment_counter_bucket(&self, day: NaiveDate, delta: &Counters) -> Result<Counters, CounterStoreError> {
        let key = self.bucket_key(day);
        let fields = delta.fields();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, value) in fields {
            pipe.hincr(&key, field, value);
        }

        let result = self
            .pool
            .execute(|mut conn| async move {
                let totals: Vec<i64> = pipe.query_async(&mut conn).await?;
                Ok(totals)
            })
            .await
            .map(|totals| Counters::from_fields(fields.iter().map(|(name, _)| *name).zip(totals)))
            .map_err(CounterStoreError::from);
        self.record("increment", result)
    }

    fn backend_type(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedisConfig;
    use crate::redis::{CircuitBreaker, CircuitBreakerConfig, RedisHealth};
    use std::time::Duration;

    fn pool(url: &str) -> Arc<RedisPool> {
        Arc::new(
            RedisPool::new(
                &RedisConfig {
                    url: url.to_string(),
                },
                Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
                    failure_threshold: 1,
                    reset_timeout: Duration::from_secs(60),
                })),
                Arc::new(RedisHealth::new()),
            )
            .unwrap(),
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_bucket_key() {
        let store = RedisCounterStore::new(pool("redis://localhost:6379"), "notifications:counter");
        assert_eq!(store.bucket_key(day(9)), "notifications:counter:2024-05-09");
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_an_error() {
        let store = RedisCounterStore::new(pool("redis://127.0.0.1:1"), "test");

        assert!(matches!(
            store.get_counter_bucket(day(1)).await,
            Err(CounterStoreError::Redis(_))
        ));
        // Breaker is open now
        assert!(matches!(
            store.increment_counter_bucket(day(1), &Counters::email_attempt(true)).await,
            Err(CounterStoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_search_range_checked_before_io() {
        let store = RedisCounterStore::new(pool("redis://127.0.0.1:1"), "test");
        assert!(matches!(
            store.search_counter_buckets(day(10), day(1)).await,
            Err(CounterStoreError::InvalidRange(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_increment_against_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let prefix = format!("test:{}", uuid::Uuid::new_v4());
        let store = RedisCounterStore::new(pool(&url), prefix);

        store.increment_counter_bucket(day(2), &Counters::email_attempt(true)).await.unwrap();
        let totals = store
            .increment_counter_bucket(day(2), &Counters::email_attempt(true))
            .await
            .unwrap();
        assert_eq!(totals.email_sent_success_count, 2);

        store.put_counter_bucket(day(3), &Counters::email_attempt(false)).await.unwrap();
        let buckets = store.search_counter_buckets(day(1), day(31)).await.unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].counters.email_sent_failure_count, 1);
    }
}
