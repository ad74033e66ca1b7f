//! In-process counter store for tests and single-node deployments.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use super::backend::{search_days, CounterStore, CounterStoreError};
use super::counters::{CounterBucket, Counters};

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    buckets: DashMap<NaiveDate, Counters>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get_counter_bucket(&self, day: NaiveDate) -> Result<Counters, CounterStoreError> {
        Ok(self.buckets.get(&day).map(|c| *c).unwrap_or_default())
    }

    async fn put_counter_bucket(&self, day: NaiveDate, counters: &Counters) -> Result<(), CounterStoreError> {
        self.buckets.insert(day, *counters);
        Ok(())
    }

    async fn search_counter_buckets(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CounterBucket>, CounterStoreError> {
        let buckets = search_days(start, end)?
            .into_iter()
            .filter_map(|day| {
                self.buckets.get(&day).map(|counters| CounterBucket {
                    counter_day: day,
                    counters: *counters,
                })
            })
            .collect();
        Ok(buckets)
    }

    async fn increment_counter_bucket(&self, day: NaiveDate, delta: &Counters) -> Result<Counters, CounterStoreError> {
        // The entry guard holds the shard lock for the whole update
        let mut entry = self.buckets.entry(day).or_default();
        entry.increment_by(delta);
        Ok(*entry)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
