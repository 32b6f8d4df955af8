//! Bounded, seeded sampling over a stream of windows.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::debug;

use crate::source::{clean_window, Record, SourceError, Window};

/// How records are chosen once the stream is longer than the capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Draw uniformly without replacement from each window in turn until the
    /// sample is full, then stop reading. Later windows are never seen.
    #[default]
    BoundedFill,
    /// Algorithm R over every record of the stream. Uniform over the whole
    /// source, at the cost of reading it to the end.
    Reservoir,
}

impl SamplingPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BoundedFill => "bounded_fill",
            Self::Reservoir => "reservoir",
        }
    }
}

/// Records selected by a [`Sampler`] run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub records: Vec<Record>,
    /// Column layout of `records`; `None` if no window was read.
    pub columns: Option<Arc<[String]>>,
    /// Clean records considered for selection.
    pub seen: u64,
    /// Records dropped by cleaning.
    pub dropped: u64,
    pub windows_consumed: u64,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.as_ref()?.iter().position(|c| c == name)
    }
}

/// Draws at most `capacity` clean records from a window stream.
///
/// A run is deterministic for a given seed, capacity, policy and window
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    capacity: usize,
    seed: u64,
    policy: SamplingPolicy,
}

impl Sampler {
    pub fn new(capacity: usize, seed: u64, policy: SamplingPolicy) -> Self {
        Self {
            capacity,
            seed,
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples records whose `required` fields are all present.
    pub fn sample<I>(&self, windows: I, required: &[&str]) -> Result<Sample, SourceError>
    where
        I: IntoIterator<Item = Result<Window, SourceError>>,
    {
        let mut sample = Sample::default();
        if self.capacity == 0 {
            return Ok(sample);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut windows = windows.into_iter();

        loop {
            if self.policy == SamplingPolicy::BoundedFill && sample.records.len() >= self.capacity
            {
                break;
            }
            let Some(window) = windows.next() else {
                break;
            };

            let cleaned = clean_window(window?, required)?;
            sample.windows_consumed += 1;
            sample.dropped += cleaned.dropped as u64;
            if sample.columns.is_none() {
                sample.columns = Some(Arc::clone(cleaned.window.columns()));
            }

            match self.policy {
                SamplingPolicy::BoundedFill => self.fill(&mut rng, cleaned.window, &mut sample),
                SamplingPolicy::Reservoir => self.reservoir(&mut rng, cleaned.window, &mut sample),
            }

            debug!(
                windows = sample.windows_consumed,
                seen = sample.seen,
                sampled = sample.records.len(),
                "sampled window",
            );
        }

        Ok(sample)
    }

    fn fill(&self, rng: &mut StdRng, window: Window, sample: &mut Sample) {
        let len = window.len();
        sample.seen += len as u64;

        let take = (self.capacity - sample.records.len()).min(len);
        if take == 0 {
            return;
        }

        let mut picks = index::sample(rng, len, take).into_vec();
        picks.sort_unstable();

        let mut picks = picks.into_iter().peekable();
        for (i, record) in window.into_records().into_iter().enumerate() {
            if picks.peek() == Some(&i) {
                picks.next();
                sample.records.push(record);
            }
        }
    }

    fn reservoir(&self, rng: &mut StdRng, window: Window, sample: &mut Sample) {
        for record in window.into_records() {
            let n = sample.seen;
            sample.seen += 1;

            if sample.records.len() < self.capacity {
                sample.records.push(record);
                continue;
            }
            let slot = rng.gen_range(0..=n);
            if slot < self.capacity as u64 {
                sample.records[slot as usize] = record;
            }
        }
    }
}
