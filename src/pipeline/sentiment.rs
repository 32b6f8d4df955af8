//! Sentiment of sampled reviews and per-polarity word frequencies.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{open_source, sink};
use crate::config::Config;
use crate::sample::Sampler;
use crate::sentiment::{
    score_or_neutral, LexiconScorer, Polarity, PolarityCounts, SentimentScorer, Stopwords,
    WordCounts,
};
use crate::sink::{commit_all, StagedTable};
use crate::source::{FieldSpec, Value};

pub const WORDS_HEADER: [&str; 2] = ["word", "count"];
pub const SUMMARY_HEADER: [&str; 2] = ["sentiment", "count"];

pub const POSITIVE_WORDS_FILE: &str = "positive_words.csv";
pub const NEGATIVE_WORDS_FILE: &str = "negative_words.csv";
pub const SUMMARY_FILE: &str = "sentiment_summary.csv";

/// Outcome of a sentiment run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentimentReport {
    /// Reviews in the sample.
    pub sampled: usize,
    /// Clean reviews the sampler considered.
    pub seen: u64,
    pub windows_consumed: u64,
    pub polarity: PolarityCounts,
    /// Reviews scored as neutral because they could not be scored.
    pub fallbacks: u64,
    pub positive_words: usize,
    pub negative_words: usize,
}

/// Samples review texts, scores them and writes per-polarity word
/// frequencies plus a polarity summary into `out_dir`.
pub fn run_sentiment(cfg: &Config, input: &Path, out_dir: &Path) -> Result<SentimentReport> {
    let sc = &cfg.sentiment;
    let scorer = match &sc.lexicon {
        Some(path) => LexiconScorer::load(path)
            .with_context(|| format!("loading lexicon {}", path.display()))?,
        None => LexiconScorer::builtin(),
    };
    analyze(cfg, input, out_dir, &scorer)
}

/// Same as [`run_sentiment`] with a caller-supplied scorer.
pub fn analyze<S>(cfg: &Config, input: &Path, out_dir: &Path, scorer: &S) -> Result<SentimentReport>
where
    S: SentimentScorer + ?Sized,
{
    let sc = &cfg.sentiment;
    let text = cfg.columns.text.as_str();

    let mut source = open_source(cfg, input, &[FieldSpec::text(text)], sc.chunk_size)?;
    let sample = Sampler::new(sc.sample_size, sc.seed, sc.policy)
        .sample(source.by_ref(), &[text])
        .with_context(|| format!("sampling {}", input.display()))?;

    info!(
        policy = sc.policy.as_str(),
        sampled = sample.len(),
        seen = sample.seen,
        windows = sample.windows_consumed,
        "sampled reviews",
    );
    if source.stats().malformed > 0 {
        warn!(malformed = source.stats().malformed, "skipped malformed rows");
    }

    let thresholds = sc.thresholds();
    let stopwords = Stopwords::builtin().with_extra(&sc.extra_stopwords);
    let mut polarity = PolarityCounts::default();
    let mut fallbacks = 0;
    let mut positive = WordCounts::new();
    let mut negative = WordCounts::new();

    let text_idx = sample.column_index(text);
    for record in &sample.records {
        let Some(review) = text_idx
            .and_then(|i| record.get(i))
            .and_then(Value::as_str)
        else {
            continue;
        };

        let score = score_or_neutral(scorer, review, &mut fallbacks);
        let class = thresholds.classify(score);
        polarity.record(class);
        match class {
            Polarity::Positive => positive.add_text(review, &stopwords),
            Polarity::Negative => negative.add_text(review, &stopwords),
            Polarity::Neutral => {}
        }
    }

    info!(
        positive = polarity.positive,
        negative = polarity.negative,
        neutral = polarity.neutral,
        fallbacks,
        "scored reviews",
    );
    if positive.is_empty() {
        warn!("no positive reviews in sample");
    }
    if negative.is_empty() {
        warn!("no negative reviews in sample");
    }

    let sink = sink(cfg)?;
    let stage = |file: &str, rows: Vec<(&str, u64)>| -> Result<StagedTable> {
        let path = out_dir.join(file);
        let header = if file == SUMMARY_FILE { &SUMMARY_HEADER } else { &WORDS_HEADER };
        sink.stage_table(&path, header, rows)
            .with_context(|| format!("writing {}", path.display()))
    };

    let positive_top = positive.top(sc.top_words);
    let negative_top = negative.top(sc.top_words);
    let staged = vec![
        stage(POSITIVE_WORDS_FILE, word_rows(&positive_top))?,
        stage(NEGATIVE_WORDS_FILE, word_rows(&negative_top))?,
        stage(
            SUMMARY_FILE,
            [Polarity::Positive, Polarity::Negative, Polarity::Neutral]
                .into_iter()
                .map(|p| (p.as_str(), polarity.get(p)))
                .collect(),
        )?,
    ];
    let written = commit_all(staged)
        .with_context(|| format!("moving sentiment tables into {}", out_dir.display()))?;
    let (positive_words, negative_words) = (written[0], written[1]);

    Ok(SentimentReport {
        sampled: sample.len(),
        seen: sample.seen,
        windows_consumed: sample.windows_consumed,
        polarity,
        fallbacks,
        positive_words,
        negative_words,
    })
}

fn word_rows(top: &[(String, u64)]) -> Vec<(&str, u64)> {
    top.iter().map(|(w, c)| (w.as_str(), *c)).collect()
}
