//! Lexicon-based sentiment scoring and polarity classification.

pub mod words;

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub use self::words::{tokenize, Stopwords, WordCounts, DEFAULT_EXTRA_STOPWORDS};

/// Score assigned when a text cannot be scored.
pub const NEUTRAL: f64 = 0.0;

/// Multiplier applied to an opinion word preceded by a negation.
const NEGATION_FACTOR: f64 = -0.5;

/// Number of non-opinion tokens a negation survives.
const NEGATION_REACH: u8 = 3;

const NEGATIONS: &[&str] = &["not", "no", "never", "nor", "neither", "without", "hardly"];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("absolutely", 1.4),
    ("totally", 1.3),
    ("highly", 1.3),
    ("truly", 1.2),
    ("so", 1.2),
    ("too", 1.2),
    ("quite", 1.1),
    ("super", 1.3),
];

const BUILTIN_LEXICON: &[(&str, f64)] = &[
    // positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("beautifully", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("captivating", 0.7),
    ("charming", 0.6),
    ("clever", 0.5),
    ("compelling", 0.6),
    ("delightful", 0.8),
    ("effective", 0.6),
    ("engaging", 0.6),
    ("enjoy", 0.5),
    ("enjoyable", 0.6),
    ("enjoyed", 0.5),
    ("entertaining", 0.5),
    ("excellent", 1.0),
    ("exceptional", 0.7),
    ("fantastic", 0.4),
    ("fascinating", 0.6),
    ("favorite", 0.5),
    ("fine", 0.4),
    ("fun", 0.3),
    ("funny", 0.25),
    ("gem", 0.6),
    ("good", 0.7),
    ("gorgeous", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("hilarious", 0.5),
    ("impressive", 0.8),
    ("informative", 0.5),
    ("insightful", 0.6),
    ("inspiring", 0.6),
    ("interesting", 0.5),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("masterpiece", 0.9),
    ("memorable", 0.6),
    ("moving", 0.5),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleasant", 0.7),
    ("powerful", 0.3),
    ("recommend", 0.5),
    ("recommended", 0.5),
    ("remarkable", 0.75),
    ("rich", 0.4),
    ("satisfying", 0.5),
    ("superb", 1.0),
    ("terrific", 1.0),
    ("thoughtful", 0.5),
    ("thrilling", 0.6),
    ("touching", 0.5),
    ("useful", 0.3),
    ("well", 0.3),
    ("wonderful", 1.0),
    ("wonderfully", 1.0),
    // negative
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("confusing", -0.4),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("dreadful", -1.0),
    ("dull", -0.5),
    ("hate", -0.8),
    ("hated", -0.9),
    ("horrible", -1.0),
    ("implausible", -0.5),
    ("lame", -0.5),
    ("mediocre", -0.5),
    ("mess", -0.6),
    ("messy", -0.5),
    ("misleading", -0.5),
    ("pathetic", -1.0),
    ("pointless", -0.6),
    ("poor", -0.4),
    ("poorly", -0.6),
    ("predictable", -0.4),
    ("ridiculous", -0.35),
    ("sad", -0.5),
    ("shallow", -0.4),
    ("silly", -0.5),
    ("slow", -0.3),
    ("stupid", -0.8),
    ("tedious", -0.7),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("ugly", -0.7),
    ("unbelievable", -0.5),
    ("uninteresting", -0.6),
    ("unreadable", -0.7),
    ("useless", -0.5),
    ("waste", -0.6),
    ("weak", -0.4),
    ("worse", -0.5),
    ("worst", -1.0),
    ("wrong", -0.5),
];

/// Reasons a text could not be scored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringError {
    #[error("text contains no words")]
    EmptyText,

    #[error("text contains no opinion words")]
    NoOpinionWords,
}

/// Errors raised while loading a user lexicon.
#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("opening lexicon {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading lexicon: {0}")]
    Csv(#[from] csv::Error),

    #[error("polarity {polarity} for {word:?} is outside [-1, 1]")]
    OutOfRange { word: String, polarity: f64 },
}

/// Maps a text to a polarity in `[-1, 1]`.
pub trait SentimentScorer {
    fn score(&self, text: &str) -> Result<f64, ScoringError>;
}

/// Scores `text`, substituting [`NEUTRAL`] on failure and counting the
/// substitution in `fallbacks`.
pub fn score_or_neutral<S>(scorer: &S, text: &str, fallbacks: &mut u64) -> f64
where
    S: SentimentScorer + ?Sized,
{
    match scorer.score(text) {
        Ok(score) => score,
        Err(e) => {
            *fallbacks += 1;
            debug!(error = %e, "scored as neutral");
            NEUTRAL
        }
    }
}

#[derive(Debug, Deserialize)]
struct LexiconRow {
    word: String,
    polarity: f64,
}

/// Averages word polarities from a lexicon, with negation and intensifiers
/// applied to the following opinion word.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    polarity: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LexiconScorer {
    pub fn builtin() -> Self {
        Self {
            polarity: BUILTIN_LEXICON
                .iter()
                .map(|&(w, p)| (w.to_string(), p))
                .collect(),
        }
    }

    /// Adds or overrides entries.
    pub fn with_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        for (word, polarity) in entries {
            self.polarity
                .insert(word.as_ref().trim().to_lowercase(), polarity.clamp(-1.0, 1.0));
        }
        self
    }

    /// Built-in lexicon extended with a `word,polarity` CSV file.
    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        let file = File::open(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
        let mut entries = Vec::new();
        for row in rdr.deserialize() {
            let row: LexiconRow = row?;
            if !(-1.0..=1.0).contains(&row.polarity) {
                return Err(LexiconError::OutOfRange {
                    word: row.word,
                    polarity: row.polarity,
                });
            }
            entries.push((row.word, row.polarity));
        }

        debug!(path = %path.display(), entries = entries.len(), "loaded lexicon");
        Ok(Self::builtin().with_entries(entries))
    }

    pub fn polarity(&self, word: &str) -> Option<f64> {
        self.polarity.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.polarity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polarity.is_empty()
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Result<f64, ScoringError> {
        let mut words = 0usize;
        let mut opinions = 0usize;
        let mut total = 0.0;
        let mut negation = 0u8;
        let mut boost = 1.0;

        for token in tokenize(text) {
            words += 1;

            if is_negation(&token) {
                negation = NEGATION_REACH;
                continue;
            }
            if let Some(m) = intensifier(&token) {
                boost *= m;
                continue;
            }

            match self.polarity(&token) {
                Some(p) => {
                    let mut s = (p * boost).clamp(-1.0, 1.0);
                    if negation > 0 {
                        s *= NEGATION_FACTOR;
                    }
                    total += s;
                    opinions += 1;
                    negation = 0;
                }
                None => negation = negation.saturating_sub(1),
            }
            boost = 1.0;
        }

        if words == 0 {
            return Err(ScoringError::EmptyText);
        }
        if opinions == 0 {
            return Err(ScoringError::NoOpinionWords);
        }
        Ok((total / opinions as f64).clamp(-1.0, 1.0))
    }
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}

fn intensifier(token: &str) -> Option<f64> {
    INTENSIFIERS
        .iter()
        .find(|(w, _)| *w == token)
        .map(|&(_, m)| m)
}

/// Polarity class of a scored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Strict cut-offs separating the polarity classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub positive: f64,
    pub negative: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            positive: 0.15,
            negative: -0.15,
        }
    }
}

impl Thresholds {
    /// Positive above `positive`, negative below `negative`, else neutral.
    pub fn classify(&self, score: f64) -> Polarity {
        if score > self.positive {
            Polarity::Positive
        } else if score < self.negative {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

/// Number of texts per polarity class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolarityCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl PolarityCounts {
    pub fn record(&mut self, polarity: Polarity) {
        match polarity {
            Polarity::Positive => self.positive += 1,
            Polarity::Negative => self.negative += 1,
            Polarity::Neutral => self.neutral += 1,
        }
    }

    pub fn get(&self, polarity: Polarity) -> u64 {
        match polarity {
            Polarity::Positive => self.positive,
            Polarity::Negative => self.negative,
            Polarity::Neutral => self.neutral,
        }
    }

    pub fn total(&self) -> u64 {
        self.positive + self.negative + self.neutral
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_single_opinion_word() {
        let s = LexiconScorer::builtin();
        assert!(approx(s.score("A great novel").expect("score"), 0.8));
        assert!(approx(s.score("Terrible.").expect("score"), -1.0));
    }

    #[test]
    fn test_average_of_opinion_words() {
        let s = LexiconScorer::builtin();
        let score = s.score("good plot but boring ending").expect("score");
        assert!(approx(score, (0.7 - 1.0) / 2.0));
    }

    #[test]
    fn test_negation_flips_and_dampens() {
        let s = LexiconScorer::builtin();
        assert!(approx(s.score("not good").expect("score"), -0.35));
        assert!(approx(s.score("it wasn't a bad read").expect("score"), 0.35));
        // Too far from the negation to be affected.
        assert!(approx(
            s.score("not what I expected from the author, good").expect("score"),
            0.7
        ));
    }

    #[test]
    fn test_intensifier_scales_and_clamps() {
        let s = LexiconScorer::builtin();
        assert!(approx(s.score("very good").expect("score"), 0.91));
        assert!(approx(s.score("extremely excellent").expect("score"), 1.0));
        // Only applies to the word right after it.
        assert!(approx(s.score("very long but good").expect("score"), 0.7));
    }

    #[test]
    fn test_scoring_errors() {
        let s = LexiconScorer::builtin();
        assert_eq!(s.score("   "), Err(ScoringError::EmptyText));
        assert_eq!(s.score("1999!"), Err(ScoringError::EmptyText));
        assert_eq!(s.score("the chair"), Err(ScoringError::NoOpinionWords));
    }

    #[test]
    fn test_score_or_neutral_counts_fallbacks() {
        let s = LexiconScorer::builtin();
        let mut fallbacks = 0;
        assert_eq!(score_or_neutral(&s, "", &mut fallbacks), NEUTRAL);
        assert_eq!(score_or_neutral(&s, "the chair", &mut fallbacks), NEUTRAL);
        assert!(approx(score_or_neutral(&s, "great", &mut fallbacks), 0.8));
        assert_eq!(fallbacks, 2);
    }

    #[test]
    fn test_classify_is_strict() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.15), Polarity::Neutral);
        assert_eq!(t.classify(0.151), Polarity::Positive);
        assert_eq!(t.classify(-0.15), Polarity::Neutral);
        assert_eq!(t.classify(-0.2), Polarity::Negative);
        assert_eq!(t.classify(NEUTRAL), Polarity::Neutral);
    }

    #[test]
    fn test_polarity_counts() {
        let mut c = PolarityCounts::default();
        c.record(Polarity::Positive);
        c.record(Polarity::Positive);
        c.record(Polarity::Neutral);
        assert_eq!(c.get(Polarity::Positive), 2);
        assert_eq!(c.get(Polarity::Negative), 0);
        assert_eq!(c.total(), 3);
    }

    #[test]
    fn test_with_entries_overrides() {
        let s = LexiconScorer::builtin().with_entries([("Gripping", 0.9), ("good", 2.0)]);
        assert_eq!(s.polarity("gripping"), Some(0.9));
        assert_eq!(s.polarity("good"), Some(1.0));
    }

    #[test]
    fn test_load_user_lexicon() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "word,polarity\npage-turner,0.8\n gripping , 0.7\ngood,0.2").expect("write");

        let s = LexiconScorer::load(file.path()).expect("load");
        assert_eq!(s.polarity("gripping"), Some(0.7));
        assert_eq!(s.polarity("good"), Some(0.2));
        assert_eq!(s.polarity("terrible"), Some(-1.0));
    }

    #[test]
    fn test_load_rejects_out_of_range() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "word,polarity\nsublime,3.5").expect("write");

        let err = LexiconScorer::load(file.path()).unwrap_err();
        assert!(matches!(err, LexiconError::OutOfRange { ref word, .. } if word == "sublime"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LexiconScorer::load(Path::new("/nonexistent/lexicon.csv")).unwrap_err();
        assert!(matches!(err, LexiconError::Io { .. }));
    }
}
