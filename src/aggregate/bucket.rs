//! Calendar buckets for review timestamps.

use std::fmt;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Deserialize;

use crate::source::Value;

/// Calendar granularity used to group review timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    /// ISO weeks, starting on Monday.
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl Granularity {
    /// Returns the canonical string representation for config and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    /// Maps a timestamp to the bucket containing it.
    pub fn bucket(self, ts: DateTime<Utc>) -> Option<TimeBucket> {
        let date = ts.date_naive();
        let start = match self {
            Self::Day => Some(date),
            Self::Week => {
                date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
            }
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            Self::Quarter => {
                let first_month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), first_month, 1)
            }
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        };
        start.map(TimeBucket)
    }

    /// Maps a timestamp field value to its bucket; non-timestamps map to `None`.
    pub fn bucket_value(self, value: &Value) -> Option<TimeBucket> {
        value.as_timestamp().and_then(|ts| self.bucket(ts))
    }
}

/// Start date of a calendar bucket. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBucket(pub NaiveDate);

impl TimeBucket {
    pub fn start(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
