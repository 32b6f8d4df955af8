//! Count-weighted average score per primary genre.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::titles::TITLES_HEADER;
use super::{open_source, scan, sink, ScanStats};
use crate::aggregate::{AggregateEntry, FoldStats, RunningAggregate};
use crate::combine::{combine, JoinReport, SideTable, SideTableStats};
use crate::config::Config;
use crate::source::{FieldKind, FieldSpec, Value};

pub const GENRES_HEADER: [&str; 4] = ["genre", "member_count", "total_count", "weighted_average"];

/// Where per-title totals come from.
#[derive(Debug, Clone, Copy)]
pub enum GenresInput<'a> {
    /// Raw reviews, aggregated by title while streaming.
    Reviews(&'a Path),
    /// A table previously written by the titles analysis.
    Titles(&'a Path),
}

/// Outcome of a genres run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenresReport {
    pub scan: ScanStats,
    /// Distinct titles with totals.
    pub titles: usize,
    pub side_table: SideTableStats,
    pub join: JoinReport,
    pub rows_written: usize,
}

/// Count-weighted average score per primary genre.
pub fn run_genres(
    cfg: &Config,
    input: GenresInput<'_>,
    metadata: &Path,
    output: &Path,
) -> Result<GenresReport> {
    let (aggregate, scan) = match input {
        GenresInput::Reviews(path) => aggregate_reviews(cfg, path)?,
        GenresInput::Titles(path) => load_titles(cfg, path)?,
    };

    let cols = &cfg.columns;
    let side = SideTable::load(
        metadata,
        &cols.side_key,
        &cols.category,
        cfg.genres.chunk_size,
        &cfg.csv.options()?,
    )
    .with_context(|| format!("loading metadata {}", metadata.display()))?;

    let combined = combine(&aggregate, &side, &cfg.genres.combine_options());
    let join = combined.report;
    info!(
        matched = join.matched,
        unmatched_reviews = join.unmatched_aggregate,
        unmatched_metadata = join.unmatched_side,
        uncategorized = join.uncategorized,
        below_min_members = join.below_min_members,
        beyond_top_groups = join.beyond_top_groups,
        "joined titles with metadata",
    );
    if combined.groups.is_empty() {
        warn!(
            min_members = cfg.genres.min_members,
            "no genre reached the member threshold"
        );
    }

    let rows_written = sink(cfg)?
        .write_table(
            output,
            &GENRES_HEADER,
            combined.groups.iter().map(|g| {
                (
                    g.group.as_str(),
                    g.member_count,
                    g.total_count,
                    g.weighted_average,
                )
            }),
        )
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(GenresReport {
        scan,
        titles: aggregate.len(),
        side_table: side.stats(),
        join,
        rows_written,
    })
}

fn aggregate_reviews(cfg: &Config, path: &Path) -> Result<(RunningAggregate<String>, ScanStats)> {
    let title = cfg.columns.title.as_str();
    let score = cfg.columns.score.as_str();
    let projection = [FieldSpec::text(title), FieldSpec::float(score)];

    let mut source = open_source(cfg, path, &projection, cfg.genres.chunk_size)?;
    let mut aggregate = RunningAggregate::new();
    let scan = scan(&mut source, &[title, score], |w| aggregate.fold(w, title, score))?;
    Ok((aggregate, scan))
}

/// Rebuilds running totals from a titles table: `sum = average * count`.
/// Rows with a zero count carry no reviews and are skipped.
fn load_titles(cfg: &Config, path: &Path) -> Result<(RunningAggregate<String>, ScanStats)> {
    let [key, count, average] = TITLES_HEADER;
    let projection = [
        FieldSpec::text(key),
        FieldSpec::new(count, FieldKind::Int),
        FieldSpec::float(average),
    ];

    let mut source = open_source(cfg, path, &projection, cfg.genres.chunk_size)?;
    let mut aggregate = RunningAggregate::new();
    let scan = scan(&mut source, &TITLES_HEADER, |w| {
        let mut stats = FoldStats::default();
        for record in w.records() {
            let entry = match (record.get(0), record.get(1), record.get(2)) {
                (Some(Value::Text(key)), Some(&Value::Int(count)), Some(&Value::Float(avg))) => {
                    u64::try_from(count)
                        .ok()
                        .filter(|&c| c > 0)
                        .map(|c| (key, AggregateEntry::new(c, avg * c as f64)))
                }
                _ => None,
            };
            match entry {
                Some((key, entry)) => {
                    aggregate.absorb(key.clone(), entry);
                    stats.folded += 1;
                }
                None => stats.skipped += 1,
            }
        }
        Ok(stats)
    })?;
    Ok((aggregate, scan))
}
