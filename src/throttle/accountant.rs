use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::metrics::ThrottleMetrics;

use super::backend::{CounterStore, CounterStoreError, EmptyCounterStore};
use super::counters::{start_of_month, Counters};

/// Monthly email quota bookkeeping.
///
/// The Accountant is the only writer of counters. Callers run a two-step
/// protocol around each send: [`is_message_quota_available`] before,
/// [`increment_counters`] after. The pair is not atomic, so concurrent
/// senders can overshoot the limit slightly.
///
/// [`is_message_quota_available`]: Accountant::is_message_quota_available
/// [`increment_counters`]: Accountant::increment_counters
pub struct Accountant {
    store: RwLock<Arc<dyn CounterStore>>,
    monthly_limit: u64,
    timeout: Duration,
}

impl Accountant {
    /// Accountant backed by [`EmptyCounterStore`] until [`initialize`] is called.
    ///
    /// [`initialize`]: Accountant::initialize
    pub fn new(monthly_limit: u64, timeout: Duration) -> Self {
        Self {
            store: RwLock::new(Arc::new(EmptyCounterStore)),
            monthly_limit,
            timeout,
        }
    }

    pub async fn initialize(&self, store: Arc<dyn CounterStore>) {
        tracing::info!(backend = store.backend_type(), monthly_limit = self.monthly_limit, "Accountant initialized");
        *self.store.write().await = store;
    }

    pub async fn backend_type(&self) -> &'static str {
        self.store.read().await.backend_type()
    }

    pub fn monthly_limit(&self) -> u64 {
        self.monthly_limit
    }

    async fn store(&self) -> Arc<dyn CounterStore> {
        self.store.read().await.clone()
    }

    async fn with_deadline<T, F>(&self, fut: F) -> std::result::Result<T, CounterStoreError>
    where
        F: Future<Output = std::result::Result<T, CounterStoreError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CounterStoreError::Unavailable(format!("timed out after {:?}", self.timeout)))?
    }

    /// Whether sending `delta` keeps this month's successful emails within the limit.
    pub async fn is_message_quota_available(&self, delta: &Counters) -> Result<bool> {
        self.is_message_quota_available_on(Utc::now().date_naive(), delta)
            .await
    }

    #[tracing::instrument(name = "accountant.quota_check", skip(self, delta))]
    pub async fn is_message_quota_available_on(&self, today: NaiveDate, delta: &Counters) -> Result<bool> {
        let mut projected = self.monthly_counters(today).await?;
        projected.increment_by(delta);

        let limit = i64::try_from(self.monthly_limit).unwrap_or(i64::MAX);
        let allowed = projected.email_sent_success_count <= limit;
        ThrottleMetrics::record_quota_check(allowed);
        if !allowed {
            tracing::warn!(
                projected = projected.email_sent_success_count,
                limit = self.monthly_limit,
                "Monthly email quota exhausted"
            );
        }
        Ok(allowed)
    }

    /// Month-to-date aggregate: every bucket from the first of `today`'s month through `today`.
    pub async fn monthly_counters(&self, today: NaiveDate) -> Result<Counters> {
        let store = self.store().await;
        let buckets = self
            .with_deadline(store.search_counter_buckets(start_of_month(today), today))
            .await?;

        let mut total = Counters::default();
        for bucket in &buckets {
            total.increment_by(&bucket.counters);
        }
        tracing::debug!(buckets = buckets.len(), email_success = total.email_sent_success_count, "Monthly counters loaded");
        Ok(total)
    }

    /// Add `delta` to today's bucket.
    pub async fn increment_counters(&self, delta: &Counters) -> Result<()> {
        self.increment_counters_on(Utc::now().date_naive(), delta).await
    }

    #[tracing::instrument(name = "accountant.increment", skip(self, delta))]
    pub async fn increment_counters_on(&self, day: NaiveDate, delta: &Counters) -> Result<()> {
        if delta.is_zero() {
            return Ok(());
        }
        let store = self.store().await;
        let totals = self
            .with_deadline(store.increment_counter_bucket(day, delta))
            .await?;
        tracing::debug!(
            backend = store.backend_type(),
            email_success = totals.email_sent_success_count,
            "Counters incremented"
        );
        Ok(())
    }
}
