//! Storage abstraction for day-bucketed send counters.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::error::NotificationError;
use crate::redis::PoolError;

use super::counters::{CounterBucket, Counters};

/// Largest day range a single search may cover.
pub const MAX_SEARCH_BUCKETS: i64 = 31;

#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Backend temporarily unusable (circuit open, timeout)
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid counter range: {0}")]
    InvalidRange(String),
}

impl From<PoolError> for CounterStoreError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Redis(e) => CounterStoreError::Redis(e),
            PoolError::CircuitOpen => CounterStoreError::Unavailable("circuit breaker is open".to_string()),
        }
    }
}

impl From<CounterStoreError> for NotificationError {
    fn from(err: CounterStoreError) -> Self {
        match err {
            CounterStoreError::Redis(e) => NotificationError::Redis(e),
            other => NotificationError::CounterStore(other.to_string()),
        }
    }
}

/// Persistent store of day buckets.
///
/// Buckets are created lazily on first write and never deleted here.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Counters of one day; zero when the bucket does not exist.
    async fn get_counter_bucket(&self, day: NaiveDate) -> Result<Counters, CounterStoreError>;

    /// Overwrite one day bucket.
    async fn put_counter_bucket(&self, day: NaiveDate, counters: &Counters) -> Result<(), CounterStoreError>;

    /// Existing buckets with `start <= counter_day <= end`, ordered by day.
    async fn search_counter_buckets(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CounterBucket>, CounterStoreError>;

    /// Add `delta` to one day bucket, creating it if needed.
    ///
    /// The default is a read-modify-write; backends with an atomic
    /// increment override it.
    async fn increment_counter_bucket(&self, day: NaiveDate, delta: &Counters) -> Result<Counters, CounterStoreError> {
        let mut current = self.get_counter_bucket(day).await?;
        current.increment_by(delta);
        self.put_counter_bucket(day, &current).await?;
        Ok(current)
    }

    /// Backend name for logs and metrics.
    fn backend_type(&self) -> &'static str;
}

/// Days from `start` to `end` inclusive, bounded by [`MAX_SEARCH_BUCKETS`].
pub(crate) fn search_days(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, CounterStoreError> {
    if end < start {
        return Err(CounterStoreError::InvalidRange(format!("{} is after {}", start, end)));
    }
    let span = (end - start).num_days() + 1;
    if span > MAX_SEARCH_BUCKETS {
        return Err(CounterStoreError::InvalidRange(format!(
            "{} days requested, at most {} allowed",
            span, MAX_SEARCH_BUCKETS
        )));
    }
    Ok(start.iter_days().take(span as usize).collect())
}

/// Store used before accounting is configured: reports no usage and
/// drops every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyCounterStore;

#[async_trait]
impl CounterStore for EmptyCounterStore {
    async fn get_counter_bucket(&self, _day: NaiveDate) -> Result<Counters, CounterStoreError> {
        Ok(Counters::default())
    }

    async fn put_counter_bucket(&self, _day: NaiveDate, _counters: &Counters) -> Result<(), CounterStoreError> {
        Ok(())
    }

    async fn search_counter_buckets(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CounterBucket>, CounterStoreError> {
        search_days(start, end)?;
        Ok(Vec::new())
    }

    async fn increment_counter_bucket(&self, _day: NaiveDate, _delta: &Counters) -> Result<Counters, CounterStoreError> {
        Ok(Counters::default())
    }

    fn backend_type(&self) -> &'static str {
        "empty"
    }
}
