//! Review volume and average score per calendar bucket.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{open_source, scan, sink, ScanStats};
use crate::aggregate::bucket::TimeBucket;
use crate::aggregate::finalize::{finalize, SortOrder};
use crate::aggregate::RunningAggregate;
use crate::config::Config;
use crate::source::FieldSpec;

pub const TIMELINE_HEADER: [&str; 3] = ["time_bucket", "total_count", "average"];

/// Outcome of a timeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineReport {
    pub scan: ScanStats,
    pub rows_written: usize,
    pub first_bucket: Option<TimeBucket>,
    pub last_bucket: Option<TimeBucket>,
}

/// Review volume and average score per calendar bucket, oldest first.
pub fn run_timeline(cfg: &Config, input: &Path, output: &Path) -> Result<TimelineReport> {
    let time = cfg.columns.time.as_str();
    let score = cfg.columns.score.as_str();
    let granularity = cfg.timeline.granularity;
    let projection = [FieldSpec::epoch_seconds(time), FieldSpec::float(score)];

    let mut source = open_source(cfg, input, &projection, cfg.timeline.chunk_size)?;
    let mut aggregate = RunningAggregate::<TimeBucket>::new();
    let scan = scan(&mut source, &[time, score], |w| {
        aggregate.fold_with(w, time, score, |v| granularity.bucket_value(v))
    })?;

    let finalized = finalize(aggregate, SortOrder::KeyAsc);
    let first_bucket = finalized.rows.first().map(|r| r.key);
    let last_bucket = finalized.rows.last().map(|r| r.key);

    match (first_bucket, last_bucket) {
        (Some(first), Some(last)) => info!(
            granularity = granularity.as_str(),
            buckets = finalized.rows.len(),
            first = %first,
            last = %last,
            "timeline range",
        ),
        _ => warn!(input = %input.display(), "no timestamped reviews with scores"),
    }

    let rows_written = sink(cfg)?
        .write_table(
            output,
            &TIMELINE_HEADER,
            finalized
                .rows
                .iter()
                .map(|r| (r.key.to_string(), r.total_count, r.average)),
        )
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(TimelineReport {
        scan,
        rows_written,
        first_bucket,
        last_bucket,
    })
}
