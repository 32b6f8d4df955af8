//! End-to-end analyses: stream the dataset, aggregate, finalize, write.
//!
//! Each analysis either completes and persists its output tables or fails
//! without touching them.

pub mod genres;
pub mod sentiment;
pub mod timeline;
pub mod titles;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::aggregate::FoldStats;
use crate::config::Config;
use crate::sink::CsvSink;
use crate::source::{clean_window, FieldSpec, RecordSource, SourceError, SourceStats, Window};

pub use self::genres::{run_genres, GenresInput, GenresReport};
pub use self::sentiment::{run_sentiment, SentimentReport};
pub use self::timeline::{run_timeline, TimelineReport};
pub use self::titles::{run_titles, TitlesReport};

/// Counters for one streaming pass over a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub windows: u64,
    /// Rows read, including malformed ones.
    pub records: u64,
    /// Rows with the wrong number of fields.
    pub malformed: u64,
    /// Rows dropped for a missing required field (malformed rows included).
    pub dropped: u64,
    /// Rows folded into the aggregate.
    pub folded: u64,
    /// Clean rows whose key could not be derived.
    pub skipped: u64,
}

impl ScanStats {
    fn absorb_source(&mut self, stats: SourceStats) {
        self.windows = stats.windows;
        self.records = stats.records;
        self.malformed = stats.malformed;
    }
}

/// Opens `path` with the configured delimited format.
pub(crate) fn open_source(
    cfg: &Config,
    path: &Path,
    projection: &[FieldSpec],
    window_size: usize,
) -> Result<RecordSource> {
    let options = cfg.csv.options()?;
    RecordSource::open(path, projection, window_size, &options)
        .with_context(|| format!("opening {}", path.display()))
}

/// Reads every window of `source`, cleans it against `required` and hands
/// the clean window to `fold`.
pub(crate) fn scan<F>(source: &mut RecordSource, required: &[&str], mut fold: F) -> Result<ScanStats>
where
    F: FnMut(&Window) -> Result<FoldStats, SourceError>,
{
    let mut stats = ScanStats::default();
    let mut folded = FoldStats::default();

    for window in source.by_ref() {
        let cleaned = clean_window(window?, required)?;
        stats.dropped += cleaned.dropped as u64;

        let window_stats = fold(&cleaned.window)?;
        folded.merge(window_stats);

        debug!(
            records = cleaned.window.len(),
            dropped = cleaned.dropped,
            folded = window_stats.folded,
            "processed window",
        );
    }

    stats.absorb_source(source.stats());
    stats.folded = folded.folded;
    stats.skipped = folded.skipped;

    if stats.malformed > 0 {
        warn!(malformed = stats.malformed, "skipped malformed rows");
    }

    Ok(stats)
}

pub(crate) fn sink(cfg: &Config) -> Result<CsvSink> {
    let options = cfg.csv.options()?;
    Ok(CsvSink::new(options.delimiter))
}
