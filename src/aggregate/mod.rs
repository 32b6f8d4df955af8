//! Incremental per-key aggregation across windows.
//!
//! A [`RunningAggregate`] is owned by one analysis run and threaded through
//! every window via [`RunningAggregate::fold`]. Entries are created on first
//! sight of a key and only ever grow additively.

pub mod bucket;
pub mod finalize;
pub mod histogram;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::source::{SourceError, Value, Window};

/// Running count and sum for a single group key.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateEntry {
    pub count: u64,
    pub sum: f64,
}

impl AggregateEntry {
    pub fn new(count: u64, sum: f64) -> Self {
        Self { count, sum }
    }

    /// Records one measure.
    pub fn add(&mut self, measure: f64) {
        self.count += 1;
        self.sum += measure;
    }

    /// Adds another entry's totals into this one.
    pub fn merge(&mut self, other: &AggregateEntry) {
        self.count += other.count;
        self.sum += other.sum;
    }

    /// Mean of the recorded measures, `None` when nothing was recorded.
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

/// Derives a group key from a field value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// Outcome of folding one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    /// Records added to the table.
    pub folded: u64,
    /// Records without a usable key or numeric measure.
    pub skipped: u64,
}

impl FoldStats {
    pub fn merge(&mut self, other: FoldStats) {
        self.folded += other.folded;
        self.skipped += other.skipped;
    }
}

/// Per-key running totals, keyed by an arbitrary grouping key.
#[derive(Debug, Clone)]
pub struct RunningAggregate<K> {
    entries: HashMap<K, AggregateEntry>,
}

impl<K: Eq + Hash> Default for RunningAggregate<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> RunningAggregate<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Folds every record of `window` whose key field converts to `K`.
    pub fn fold(
        &mut self,
        window: &Window,
        group_field: &str,
        measure_field: &str,
    ) -> Result<FoldStats, SourceError>
    where
        K: FromValue,
    {
        self.fold_with(window, group_field, measure_field, K::from_value)
    }

    /// Folds `window` using an explicit key extractor for the group field.
    pub fn fold_with<F>(
        &mut self,
        window: &Window,
        group_field: &str,
        measure_field: &str,
        mut key_fn: F,
    ) -> Result<FoldStats, SourceError>
    where
        F: FnMut(&Value) -> Option<K>,
    {
        let key_idx = column(window, group_field)?;
        let measure_idx = column(window, measure_field)?;

        let mut stats = FoldStats::default();
        for record in window.records() {
            let measure = record.get(measure_idx).and_then(Value::as_f64);
            let key = record.get(key_idx).and_then(&mut key_fn);

            match (key, measure) {
                (Some(key), Some(measure)) => {
                    self.entries.entry(key).or_default().add(measure);
                    stats.folded += 1;
                }
                _ => stats.skipped += 1,
            }
        }

        Ok(stats)
    }

    /// Adds a partial entry for `key` into the running totals.
    pub fn absorb(&mut self, key: K, entry: AggregateEntry) {
        self.entries.entry(key).or_default().merge(&entry);
    }

    /// Adds every entry of `other` into `self`.
    pub fn merge(&mut self, other: RunningAggregate<K>) {
        for (key, entry) in other.entries {
            self.absorb(key, entry);
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&AggregateEntry>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &AggregateEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> HashMap<K, AggregateEntry> {
        self.entries
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of folded records across all keys.
    pub fn total_count(&self) -> u64 {
        self.entries.values().map(|e| e.count).sum()
    }
}

fn column(window: &Window, name: &str) -> Result<usize, SourceError> {
    window
        .column_index(name)
        .ok_or_else(|| SourceError::MissingColumn {
            column: name.to_string(),
        })
}
