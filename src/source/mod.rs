//! Record source: reads a delimited file as a lazy sequence of bounded windows.
//!
//! Only the projected columns are materialised, and each is coerced to its
//! declared [`FieldKind`] as rows are read. A window never holds more than the
//! configured number of records, so peak memory is bounded by the window size
//! regardless of how large the backing file is.

pub mod clean;
pub mod record;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use self::clean::{clean_window, CleanedWindow};
pub use self::record::{FieldKind, FieldSpec, Record, Value, Window};

/// Errors raised while opening or reading a record source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("dataset not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("opening {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("column {column:?} not present in dataset")]
    MissingColumn { column: String },

    #[error("window size must be positive")]
    InvalidWindowSize,

    #[error("reading delimited data: {0}")]
    Csv(#[from] csv::Error),
}

/// Delimited-format options shared by every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter byte. Default: `b','`.
    pub delimiter: u8,
    /// Quote byte. Default: `b'"'`.
    pub quote: u8,
    /// Field text treated as missing. Default: empty string.
    pub null_string: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            null_string: String::new(),
        }
    }
}

/// Counters accumulated while a source is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Windows yielded so far.
    pub windows: u64,
    /// Data rows read, including malformed ones.
    pub records: u64,
    /// Rows whose field count did not match the header.
    pub malformed: u64,
}

/// Forward-only reader yielding [`Window`]s of at most `window_size` records.
pub struct RecordSource<R: Read = File> {
    reader: csv::Reader<R>,
    columns: Arc<[String]>,
    /// (column index in file, declared kind) per projected field.
    projection: Vec<(usize, FieldKind)>,
    header_len: usize,
    window_size: usize,
    null_string: String,
    scratch: csv::ByteRecord,
    stats: SourceStats,
    finished: bool,
}

impl RecordSource<File> {
    /// Opens `path` and resolves the projection against its header row.
    pub fn open(
        path: &Path,
        projection: &[FieldSpec],
        window_size: usize,
        options: &CsvOptions,
    ) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound {
                path: path.to_path_buf(),
            },
            _ => SourceError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        Self::from_reader(file, projection, window_size, options)
    }
}

impl<R: Read> RecordSource<R> {
    /// Wraps any reader producing delimited text with a header row.
    pub fn from_reader(
        rdr: R,
        projection: &[FieldSpec],
        window_size: usize,
        options: &CsvOptions,
    ) -> Result<Self, SourceError> {
        if window_size == 0 {
            return Err(SourceError::InvalidWindowSize);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(true)
            .flexible(true)
            .from_reader(rdr);

        let header: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();

        let mut resolved = Vec::with_capacity(projection.len());
        for spec in projection {
            let idx = header
                .iter()
                .position(|h| *h == spec.name)
                .ok_or_else(|| SourceError::MissingColumn {
                    column: spec.name.clone(),
                })?;
            resolved.push((idx, spec.kind));
        }

        Ok(Self {
            reader,
            columns: projection.iter().map(|s| s.name.clone()).collect(),
            projection: resolved,
            header_len: header.len(),
            window_size,
            null_string: options.null_string.clone(),
            scratch: csv::ByteRecord::new(),
            stats: SourceStats::default(),
            finished: false,
        })
    }

    /// Projected column names, in projection order.
    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    pub fn stats(&self) -> SourceStats {
        self.stats
    }

    fn read_window(&mut self) -> Result<Option<Window>, SourceError> {
        let mut records = Vec::with_capacity(self.window_size.min(65_536));

        while records.len() < self.window_size {
            if !self.reader.read_byte_record(&mut self.scratch)? {
                break;
            }
            self.stats.records += 1;
            records.push(self.project_current());
        }

        if records.is_empty() {
            return Ok(None);
        }

        self.stats.windows += 1;
        Ok(Some(Window::new(Arc::clone(&self.columns), records)))
    }

    fn project_current(&mut self) -> Record {
        if self.scratch.len() != self.header_len {
            self.stats.malformed += 1;
            return Record::malformed(self.projection.len());
        }

        let values = self
            .projection
            .iter()
            .map(|&(idx, kind)| {
                let raw = match std::str::from_utf8(&self.scratch[idx]) {
                    Ok(s) => s,
                    Err(_) => return Value::Null,
                };
                if raw.trim() == self.null_string {
                    return Value::Null;
                }
                Value::coerce(raw, kind)
            })
            .collect();

        Record::new(values)
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<Window, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_window() {
            Ok(Some(window)) => Some(Ok(window)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
