//! Two-stage combination: per-key running totals joined with a side table and
//! rolled up into count-weighted group averages.

pub mod side_table;

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::aggregate::{AggregateEntry, RunningAggregate};

pub use self::side_table::{Category, SideTable, SideTableStats};

/// Group filtering and ranking options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineOptions {
    /// Groups with fewer joined keys are dropped.
    pub min_members: u64,
    /// Keep only this many of the largest groups. `None` keeps all.
    pub top_groups: Option<usize>,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            min_members: 50,
            top_groups: Some(25),
        }
    }
}

/// One group of the combined result.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub group: String,
    /// Number of joined keys in the group.
    pub member_count: u64,
    pub total_count: u64,
    pub total_sum: f64,
    /// `total_sum / total_count`.
    pub weighted_average: f64,
}

/// Diagnostics describing what the join discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinReport {
    /// Aggregate keys joined to a usable category.
    pub matched: u64,
    /// Aggregate keys with no side-table entry.
    pub unmatched_aggregate: u64,
    /// Side-table keys with no aggregate entry.
    pub unmatched_side: u64,
    /// Aggregate keys whose side-table category was unusable.
    pub uncategorized: u64,
    /// Groups dropped by the member threshold.
    pub below_min_members: u64,
    /// Groups dropped by the top-groups cut.
    pub beyond_top_groups: u64,
}

/// Ranked groups plus join diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub groups: Vec<GroupRow>,
    pub report: JoinReport,
}

#[derive(Default)]
struct GroupAcc {
    members: u64,
    totals: AggregateEntry,
}

/// Joins `aggregate` with `side` on key and computes per-group weighted
/// averages from the raw count/sum pairs.
///
/// Keys present on only one side are dropped and counted, never an error.
pub fn combine(
    aggregate: &RunningAggregate<String>,
    side: &SideTable,
    options: &CombineOptions,
) -> Combined {
    let mut report = JoinReport::default();
    let mut groups: HashMap<&str, GroupAcc> = HashMap::new();
    let mut side_hits = 0u64;

    for (key, entry) in aggregate.iter() {
        let Some(category) = side.get(key) else {
            report.unmatched_aggregate += 1;
            continue;
        };
        side_hits += 1;

        match category.name() {
            Some(name) => {
                let acc = groups.entry(name).or_default();
                acc.members += 1;
                acc.totals.merge(entry);
                report.matched += 1;
            }
            None => report.uncategorized += 1,
        }
    }
    report.unmatched_side = (side.len() as u64).saturating_sub(side_hits);

    let mut rows: Vec<GroupRow> = Vec::with_capacity(groups.len());
    for (name, acc) in groups {
        if acc.members < options.min_members {
            report.below_min_members += 1;
            continue;
        }
        // A group built only from zero-count entries has no average.
        let Some(weighted_average) = acc.totals.average() else {
            continue;
        };
        rows.push(GroupRow {
            group: name.to_string(),
            member_count: acc.members,
            total_count: acc.totals.count,
            total_sum: acc.totals.sum,
            weighted_average,
        });
    }

    if let Some(limit) = options.top_groups {
        rows.sort_by(|a, b| {
            b.member_count
                .cmp(&a.member_count)
                .then_with(|| a.group.cmp(&b.group))
        });
        if rows.len() > limit {
            report.beyond_top_groups = (rows.len() - limit) as u64;
            rows.truncate(limit);
        }
    }

    rows.sort_by(rank);

    Combined {
        groups: rows,
        report,
    }
}

fn rank(a: &GroupRow, b: &GroupRow) -> Ordering {
    b.weighted_average
        .total_cmp(&a.weighted_average)
        .then_with(|| b.member_count.cmp(&a.member_count))
        .then_with(|| a.group.cmp(&b.group))
}
