use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const COUNTER_DAY_FORMAT: &str = "%Y-%m-%d";

/// Tally of send activity. Used both as a stored bucket value and as the
/// delta a caller proposes or applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counters {
    pub request_count: i64,
    pub messages_sent_success_count: i64,
    pub messages_sent_failure_count: i64,
    pub email_sent_success_count: i64,
    pub email_sent_failure_count: i64,
}

impl Counters {
    /// Delta for one email send attempt.
    pub fn email_attempt(success: bool) -> Self {
        Self {
            request_count: 1,
            messages_sent_success_count: i64::from(success),
            messages_sent_failure_count: i64::from(!success),
            email_sent_success_count: i64::from(success),
            email_sent_failure_count: i64::from(!success),
        }
    }

    /// Delta for one non-email send attempt.
    pub fn message_attempt(success: bool) -> Self {
        Self {
            request_count: 1,
            messages_sent_success_count: i64::from(success),
            messages_sent_failure_count: i64::from(!success),
            ..Self::default()
        }
    }

    pub fn increment_by(&mut self, other: &Counters) {
        self.request_count += other.request_count;
        self.messages_sent_success_count += other.messages_sent_success_count;
        self.messages_sent_failure_count += other.messages_sent_failure_count;
        self.email_sent_success_count += other.email_sent_success_count;
        self.email_sent_failure_count += other.email_sent_failure_count;
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Field name / value pairs, in storage order.
    pub(crate) fn fields(&self) -> [(&'static str, i64); 5] {
        [
            ("request_count", self.request_count),
            ("messages_sent_success_count", self.messages_sent_success_count),
            ("messages_sent_failure_count", self.messages_sent_failure_count),
            ("email_sent_success_count", self.email_sent_success_count),
            ("email_sent_failure_count", self.email_sent_failure_count),
        ]
    }

    /// Rebuild from stored field pairs. Unknown fields are ignored.
    pub(crate) fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let mut counters = Self::default();
        for (name, value) in fields {
            match name.as_ref() {
                "request_count" => counters.request_count = value,
                "messages_sent_success_count" => counters.messages_sent_success_count = value,
                "messages_sent_failure_count" => counters.messages_sent_failure_count = value,
                "email_sent_success_count" => counters.email_sent_success_count = value,
                "email_sent_failure_count" => counters.email_sent_failure_count = value,
                _ => {}
            }
        }
        counters
    }
}

/// One persisted day of counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterBucket {
    pub counter_day: NaiveDate,
    #[serde(flatten)]
    pub counters: Counters,
}

/// Storage key of a day bucket, `yyyy-MM-dd`.
pub fn day_key(day: NaiveDate) -> String {
    day.format(COUNTER_DAY_FORMAT).to_string()
}

pub fn start_of_month(day: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month
    day.with_day(1).unwrap_or(day)
}
