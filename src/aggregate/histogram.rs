/// Linear histogram over a closed value range.
///
/// Used for the distribution of per-title average scores. Values below the
/// range land in the first bucket and values above it in the last; non-finite
/// values are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    min: f64,
    max: f64,
    buckets: Vec<u64>,
}

/// One bucket of a histogram snapshot: `[start, end)`, last bucket closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBucket {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

impl Histogram {
    /// Creates a histogram with `bins` equal-width buckets over `[min, max]`.
    ///
    /// Returns `None` when `bins` is zero or the range is empty or non-finite.
    pub fn new(min: f64, max: f64, bins: usize) -> Option<Self> {
        if bins == 0 || !min.is_finite() || !max.is_finite() || min >= max {
            return None;
        }
        Some(Self {
            min,
            max,
            buckets: vec![0; bins],
        })
    }

    /// Records a value in the appropriate bucket.
    pub fn record(&mut self, value: f64) {
        if let Some(idx) = self.bucket_index(value) {
            self.buckets[idx] += 1;
        }
    }

    /// Total number of recorded values.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Returns every bucket with its bounds.
    pub fn snapshot(&self) -> Vec<HistogramBucket> {
        let width = self.width();
        self.buckets
            .iter()
            .enumerate()
            .map(|(i, &count)| HistogramBucket {
                start: self.min + width * i as f64,
                end: if i + 1 == self.buckets.len() {
                    self.max
                } else {
                    self.min + width * (i + 1) as f64
                },
                count,
            })
            .collect()
    }

    fn width(&self) -> f64 {
        (self.max - self.min) / self.buckets.len() as f64
    }

    fn bucket_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let last = self.buckets.len() - 1;
        if value <= self.min {
            return Some(0);
        }
        if value >= self.max {
            return Some(last);
        }
        let idx = ((value - self.min) / self.width()) as usize;
        Some(idx.min(last))
    }
}
