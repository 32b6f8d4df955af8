use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::aggregate::bucket::Granularity;
use crate::aggregate::finalize::SortOrder;
use crate::combine::CombineOptions;
use crate::sample::SamplingPolicy;
use crate::sentiment::{Thresholds, DEFAULT_EXTRA_STOPWORDS};
use crate::source::CsvOptions;

/// Top-level configuration for review-insight.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Delimited input/output format.
    #[serde(default)]
    pub csv: CsvConfig,

    /// Dataset column names.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Per-title statistics.
    #[serde(default)]
    pub titles: TitlesConfig,

    /// Review volume and score over time.
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Count-weighted scores per genre.
    #[serde(default)]
    pub genres: GenresConfig,

    /// Sampled sentiment and word frequencies.
    #[serde(default)]
    pub sentiment: SentimentConfig,
}

/// Delimited format configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvConfig {
    /// Field delimiter. Default: ','.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Quote character. Default: '"'.
    #[serde(default = "default_quote")]
    pub quote: char,

    /// Field text treated as missing. Default: "".
    #[serde(default)]
    pub null_string: String,
}

/// Dataset column names. Defaults match the Amazon Books reviews dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnsConfig {
    /// Review title column. Default: "Title".
    #[serde(default = "default_title_column")]
    pub title: String,

    /// Review score column. Default: "review/score".
    #[serde(default = "default_score_column")]
    pub score: String,

    /// Review time column, epoch seconds. Default: "review/time".
    #[serde(default = "default_time_column")]
    pub time: String,

    /// Review text column. Default: "review/text".
    #[serde(default = "default_text_column")]
    pub text: String,

    /// Metadata category column. Default: "categories".
    #[serde(default = "default_category_column")]
    pub category: String,

    /// Metadata join key column. Default: "Title".
    #[serde(default = "default_title_column")]
    pub side_key: String,
}

/// Per-title analysis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TitlesConfig {
    /// Records per window. Default: 100000.
    #[serde(default = "default_titles_chunk_size")]
    pub chunk_size: usize,

    /// Output row order. Default: count_desc.
    #[serde(default)]
    pub order: SortOrder,

    /// Number of bins of the average-score histogram. Default: 30.
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    /// Lower bound of the histogram range. Default: 1.0.
    #[serde(default = "default_histogram_min")]
    pub histogram_min: f64,

    /// Upper bound of the histogram range. Default: 5.0.
    #[serde(default = "default_histogram_max")]
    pub histogram_max: f64,
}

/// Timeline analysis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// Records per window. Default: 500000.
    #[serde(default = "default_timeline_chunk_size")]
    pub chunk_size: usize,

    /// Calendar bucket size. Default: month.
    #[serde(default)]
    pub granularity: Granularity,
}

/// Genre analysis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GenresConfig {
    /// Records per window, for both the reviews and the metadata. Default: 100000.
    #[serde(default = "default_genres_chunk_size")]
    pub chunk_size: usize,

    /// Minimum titles per genre. Default: 50.
    #[serde(default = "default_min_members")]
    pub min_members: u64,

    /// Keep only the largest genres by title count. Default: 25, null keeps all.
    #[serde(default = "default_top_groups")]
    pub top_groups: Option<usize>,
}

/// Sentiment analysis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    /// Records per window. Default: 200000.
    #[serde(default = "default_sentiment_chunk_size")]
    pub chunk_size: usize,

    /// Maximum number of sampled reviews. Default: 50000.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Sampler seed. Default: 42.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Sampling policy. Default: bounded_fill.
    #[serde(default)]
    pub policy: SamplingPolicy,

    /// Scores above this are positive. Default: 0.15.
    #[serde(default = "default_positive_threshold")]
    pub positive_threshold: f64,

    /// Scores below this are negative. Default: -0.15.
    #[serde(default = "default_negative_threshold")]
    pub negative_threshold: f64,

    /// Words kept per polarity table. Default: 200.
    #[serde(default = "default_top_words")]
    pub top_words: usize,

    /// Stopwords added to the built-in list.
    #[serde(default = "default_extra_stopwords")]
    pub extra_stopwords: Vec<String>,

    /// Optional `word,polarity` CSV extending the built-in lexicon.
    #[serde(default)]
    pub lexicon: Option<PathBuf>,
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_quote() -> char {
    '"'
}

fn default_title_column() -> String {
    "Title".to_string()
}

fn default_score_column() -> String {
    "review/score".to_string()
}

fn default_time_column() -> String {
    "review/time".to_string()
}

fn default_text_column() -> String {
    "review/text".to_string()
}

fn default_category_column() -> String {
    "categories".to_string()
}

fn default_titles_chunk_size() -> usize {
    100_000
}

fn default_histogram_bins() -> usize {
    30
}

fn default_histogram_min() -> f64 {
    1.0
}

fn default_histogram_max() -> f64 {
    5.0
}

fn default_timeline_chunk_size() -> usize {
    500_000
}

fn default_genres_chunk_size() -> usize {
    100_000
}

fn default_min_members() -> u64 {
    50
}

fn default_top_groups() -> Option<usize> {
    Some(25)
}

fn default_sentiment_chunk_size() -> usize {
    200_000
}

fn default_sample_size() -> usize {
    50_000
}

fn default_seed() -> u64 {
    42
}

fn default_positive_threshold() -> f64 {
    0.15
}

fn default_negative_threshold() -> f64 {
    -0.15
}

fn default_top_words() -> usize {
    200
}

fn default_extra_stopwords() -> Vec<String> {
    DEFAULT_EXTRA_STOPWORDS.iter().map(|w| w.to_string()).collect()
}

// --- Default trait impls ---

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            csv: CsvConfig::default(),
            columns: ColumnsConfig::default(),
            titles: TitlesConfig::default(),
            timeline: TimelineConfig::default(),
            genres: GenresConfig::default(),
            sentiment: SentimentConfig::default(),
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            quote: default_quote(),
            null_string: String::new(),
        }
    }
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            title: default_title_column(),
            score: default_score_column(),
            time: default_time_column(),
            text: default_text_column(),
            category: default_category_column(),
            side_key: default_title_column(),
        }
    }
}

impl Default for TitlesConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_titles_chunk_size(),
            order: SortOrder::default(),
            histogram_bins: default_histogram_bins(),
            histogram_min: default_histogram_min(),
            histogram_max: default_histogram_max(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_timeline_chunk_size(),
            granularity: Granularity::default(),
        }
    }
}

impl Default for GenresConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_genres_chunk_size(),
            min_members: default_min_members(),
            top_groups: default_top_groups(),
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_sentiment_chunk_size(),
            sample_size: default_sample_size(),
            seed: default_seed(),
            policy: SamplingPolicy::default(),
            positive_threshold: default_positive_threshold(),
            negative_threshold: default_negative_threshold(),
            top_words: default_top_words(),
            extra_stopwords: default_extra_stopwords(),
            lexicon: None,
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        self.csv.options()?;

        let columns = [
            ("columns.title", &self.columns.title),
            ("columns.score", &self.columns.score),
            ("columns.time", &self.columns.time),
            ("columns.text", &self.columns.text),
            ("columns.category", &self.columns.category),
            ("columns.side_key", &self.columns.side_key),
        ];
        for (name, value) in columns {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }

        let chunk_sizes = [
            ("titles.chunk_size", self.titles.chunk_size),
            ("timeline.chunk_size", self.timeline.chunk_size),
            ("genres.chunk_size", self.genres.chunk_size),
            ("sentiment.chunk_size", self.sentiment.chunk_size),
        ];
        for (name, value) in chunk_sizes {
            if value == 0 {
                bail!("{name} must be positive");
            }
        }

        let titles = &self.titles;
        if titles.histogram_bins == 0 {
            bail!("titles.histogram_bins must be positive");
        }
        if !(titles.histogram_min.is_finite()
            && titles.histogram_max.is_finite()
            && titles.histogram_min < titles.histogram_max)
        {
            bail!(
                "titles.histogram_min ({}) must be less than titles.histogram_max ({})",
                titles.histogram_min,
                titles.histogram_max
            );
        }

        let sentiment = &self.sentiment;
        for (name, value) in [
            ("sentiment.positive_threshold", sentiment.positive_threshold),
            ("sentiment.negative_threshold", sentiment.negative_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                bail!("{name} must be within [-1, 1], got {value}");
            }
        }
        if sentiment.negative_threshold >= sentiment.positive_threshold {
            bail!(
                "sentiment.negative_threshold ({}) must be less than sentiment.positive_threshold ({})",
                sentiment.negative_threshold,
                sentiment.positive_threshold
            );
        }

        Ok(())
    }
}

impl CsvConfig {
    /// Converts to reader options; delimiter and quote must be single-byte.
    pub fn options(&self) -> Result<CsvOptions> {
        let delimiter = single_byte("csv.delimiter", self.delimiter)?;
        let quote = single_byte("csv.quote", self.quote)?;
        if delimiter == quote {
            bail!("csv.delimiter and csv.quote must differ");
        }

        Ok(CsvOptions {
            delimiter,
            quote,
            null_string: self.null_string.clone(),
        })
    }
}

fn single_byte(name: &str, c: char) -> Result<u8> {
    match u8::try_from(c) {
        Ok(b) if b.is_ascii() => Ok(b),
        _ => bail!("{name} must be a single ASCII character, got {c:?}"),
    }
}

impl GenresConfig {
    pub fn combine_options(&self) -> CombineOptions {
        CombineOptions {
            min_members: self.min_members,
            top_groups: self.top_groups,
        }
    }
}

impl SentimentConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            positive: self.positive_threshold,
            negative: self.negative_threshold,
        }
    }
}
