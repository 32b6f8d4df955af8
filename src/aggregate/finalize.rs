//! Turns running totals into ordered result rows.

use std::cmp::Ordering;
use std::hash::Hash;

use serde::Deserialize;

use super::RunningAggregate;

/// Ordering applied to finalized rows. Ties always fall back to key order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    CountDesc,
    CountAsc,
    AverageDesc,
    KeyAsc,
}

/// One finalized group: total record count and derived average.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow<K> {
    pub key: K,
    pub total_count: u64,
    pub average: f64,
}

/// Finalized result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized<K> {
    pub rows: Vec<ResultRow<K>>,
    /// Entries left out because they had no records to average.
    pub omitted_zero_count: usize,
}

impl<K> Finalized<K> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Converts running totals into ordered rows with `average = sum / count`.
///
/// Entries with a zero count never produce a row.
pub fn finalize<K>(aggregate: RunningAggregate<K>, order: SortOrder) -> Finalized<K>
where
    K: Eq + Hash + Ord,
{
    let mut omitted_zero_count = 0;
    let mut rows: Vec<ResultRow<K>> = aggregate
        .into_entries()
        .into_iter()
        .filter_map(|(key, entry)| match entry.average() {
            Some(average) => Some(ResultRow {
                key,
                total_count: entry.count,
                average,
            }),
            None => {
                omitted_zero_count += 1;
                None
            }
        })
        .collect();

    rows.sort_by(|a, b| compare(a, b, order));

    Finalized {
        rows,
        omitted_zero_count,
    }
}

fn compare<K: Ord>(a: &ResultRow<K>, b: &ResultRow<K>, order: SortOrder) -> Ordering {
    let primary = match order {
        SortOrder::CountDesc => b.total_count.cmp(&a.total_count),
        SortOrder::CountAsc => a.total_count.cmp(&b.total_count),
        SortOrder::AverageDesc => b.average.total_cmp(&a.average),
        SortOrder::KeyAsc => Ordering::Equal,
    };
    primary.then_with(|| a.key.cmp(&b.key))
}
