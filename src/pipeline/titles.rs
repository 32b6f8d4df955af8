//! Per-title review counts and averages, with an optional histogram.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{open_source, scan, sink, ScanStats};
use crate::aggregate::finalize::finalize;
use crate::aggregate::histogram::Histogram;
use crate::aggregate::RunningAggregate;
use crate::config::Config;
use crate::sink::commit_all;
use crate::source::FieldSpec;

pub const TITLES_HEADER: [&str; 3] = ["key", "total_count", "average"];
pub const HISTOGRAM_HEADER: [&str; 3] = ["bucket_start", "bucket_end", "titles"];

/// Rows logged as a preview of the result.
const PREVIEW_ROWS: usize = 10;

/// Outcome of a titles run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitlesReport {
    pub scan: ScanStats,
    /// Rows written to the titles table.
    pub rows_written: usize,
    pub omitted_zero_count: usize,
    /// Titles counted by the histogram, when one was written.
    pub histogram_titles: Option<u64>,
}

/// Per-title review count and average score.
///
/// When `histogram` is given, the distribution of per-title averages is
/// written there as well.
pub fn run_titles(
    cfg: &Config,
    input: &Path,
    output: &Path,
    histogram: Option<&Path>,
) -> Result<TitlesReport> {
    let title = cfg.columns.title.as_str();
    let score = cfg.columns.score.as_str();
    let projection = [FieldSpec::text(title), FieldSpec::float(score)];

    let mut source = open_source(cfg, input, &projection, cfg.titles.chunk_size)?;
    let mut aggregate = RunningAggregate::<String>::new();
    let scan = scan(&mut source, &[title, score], |w| aggregate.fold(w, title, score))?;

    let finalized = finalize(aggregate, cfg.titles.order);
    if finalized.is_empty() {
        warn!(input = %input.display(), "no titles with scored reviews");
    }

    for (rank, row) in finalized.rows.iter().take(PREVIEW_ROWS).enumerate() {
        info!(
            rank = rank + 1,
            title = %row.key,
            reviews = row.total_count,
            average = %format!("{:.2}", row.average),
            "title",
        );
    }

    let histogram = match histogram {
        Some(path) => {
            let t = &cfg.titles;
            let mut hist = Histogram::new(t.histogram_min, t.histogram_max, t.histogram_bins)
                .context("invalid histogram range")?;
            for row in &finalized.rows {
                hist.record(row.average);
            }
            Some((path, hist))
        }
        None => None,
    };

    let sink = sink(cfg)?;
    let mut staged = vec![sink
        .stage_table(
            output,
            &TITLES_HEADER,
            finalized
                .rows
                .iter()
                .map(|r| (r.key.as_str(), r.total_count, r.average)),
        )
        .with_context(|| format!("writing {}", output.display()))?];

    if let Some((path, hist)) = &histogram {
        staged.push(
            sink.stage_table(
                path,
                &HISTOGRAM_HEADER,
                hist.snapshot().iter().map(|b| (b.start, b.end, b.count)),
            )
            .with_context(|| format!("writing {}", path.display()))?,
        );
    }

    let rows_written = staged[0].rows();
    commit_all(staged).context("moving titles output into place")?;
    let histogram_titles = histogram.map(|(_, hist)| hist.total());

    Ok(TitlesReport {
        scan,
        rows_written,
        omitted_zero_count: finalized.omitted_zero_count,
        histogram_titles,
    })
}
