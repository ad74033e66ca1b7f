//! Monthly email quota accounting
//!
//! Day-bucketed [`Counters`] live in a pluggable [`CounterStore`]
//! (memory or Redis). The [`Accountant`] aggregates them per month and
//! gates email sends against the configured limit.

mod accountant;
mod backend;
mod counters;
mod factory;
mod memory_backend;
mod redis_backend;

pub use accountant::Accountant;
pub use backend::{CounterStore, CounterStoreError, EmptyCounterStore, MAX_SEARCH_BUCKETS};
pub use counters::{day_key, start_of_month, CounterBucket, Counters, COUNTER_DAY_FORMAT};
pub use factory::create_counter_store;
pub use memory_backend::MemoryCounterStore;
pub use redis_backend::RedisCounterStore;
