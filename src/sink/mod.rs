//! Tabular CSV output.
//!
//! Every table is written to a temporary file in the destination directory and
//! renamed over the target once complete, so a failed run never leaves a
//! partial file behind. Runs producing several tables stage all of them
//! first and move them into place together with [`commit_all`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while writing an output table.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("creating output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("creating temporary file in {}: {source}", path.display())]
    TempFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("flushing {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("moving output into place at {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes serializable rows as delimited tables with a fixed header.
#[derive(Debug, Clone, Copy)]
pub struct CsvSink {
    delimiter: u8,
}

impl Default for CsvSink {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvSink {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Returns the sink's name for logging.
    pub fn name(&self) -> &'static str {
        "csv"
    }

    /// Writes `header` followed by one line per row, replacing `path`.
    ///
    /// An empty `rows` produces a header-only file. Returns the number of
    /// rows written.
    pub fn write_table<R, I>(&self, path: &Path, header: &[&str], rows: I) -> Result<usize, SinkError>
    where
        R: Serialize,
        I: IntoIterator<Item = R>,
    {
        self.stage_table(path, header, rows)?.commit()
    }

    /// Writes a table next to `path` without replacing it yet.
    ///
    /// The target is untouched until the returned table is committed.
    /// Dropping it removes the temporary file.
    pub fn stage_table<R, I>(&self, path: &Path, header: &[&str], rows: I) -> Result<StagedTable, SinkError>
    where
        R: Serialize,
        I: IntoIterator<Item = R>,
    {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| SinkError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|source| SinkError::TempFile {
            path: dir.clone(),
            source,
        })?;

        let rows = {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .has_headers(false)
                .from_writer(tmp.as_file_mut());

            wtr.write_record(header)?;
            let mut written = 0;
            for row in rows {
                wtr.serialize(row)?;
                written += 1;
            }
            wtr.flush().map_err(|source| SinkError::Flush {
                path: path.to_path_buf(),
                source,
            })?;
            written
        };

        tmp.as_file_mut()
            .flush()
            .map_err(|source| SinkError::Flush {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(StagedTable {
            tmp,
            path: path.to_path_buf(),
            rows,
            sink: self.name(),
        })
    }
}

/// A fully written table waiting to be moved over its target.
#[derive(Debug)]
pub struct StagedTable {
    tmp: NamedTempFile,
    path: PathBuf,
    rows: usize,
    sink: &'static str,
}

impl StagedTable {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows in the table, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Replaces the target with the staged table.
    pub fn commit(self) -> Result<usize, SinkError> {
        let Self { tmp, path, rows, sink } = self;
        tmp.persist(&path).map_err(|e| SinkError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        debug!(sink, path = %path.display(), rows, "wrote table");
        Ok(rows)
    }
}

/// Commits every staged table, in order.
///
/// If a commit fails, the tables already moved into place by this call are
/// removed again and the error is returned.
pub fn commit_all(tables: Vec<StagedTable>) -> Result<Vec<usize>, SinkError> {
    let mut committed: Vec<PathBuf> = Vec::with_capacity(tables.len());
    let mut rows = Vec::with_capacity(tables.len());

    for table in tables {
        let path = table.path.clone();
        match table.commit() {
            Ok(n) => {
                committed.push(path);
                rows.push(n);
            }
            Err(e) => {
                for done in &committed {
                    if let Err(err) = fs::remove_file(done) {
                        warn!(path = %done.display(), error = %err, "removing committed table");
                    }
                }
                return Err(e);
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row<'a> {
        key: &'a str,
        total_count: u64,
        average: f64,
    }

    #[test]
    fn test_write_table_with_rows() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("titles.csv");

        let rows = vec![
            Row { key: "A", total_count: 2, average: 4.0 },
            Row { key: "War, and Peace", total_count: 1, average: 3.5 },
        ];
        let n = CsvSink::default()
            .write_table(&path, &["key", "total_count", "average"], rows)
            .expect("write");

        assert_eq!(n, 2);
        let text = fs::read_to_string(&path).expect("read");
        assert_eq!(
            text,
            "key,total_count,average\nA,2,4.0\n\"War, and Peace\",1,3.5\n"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.csv");

        let n = CsvSink::default()
            .write_table(&path, &["word", "count"], Vec::<(String, u64)>::new())
            .expect("write");

        assert_eq!(n, 0);
        assert_eq!(fs::read_to_string(&path).expect("read"), "word,count\n");
    }

    #[test]
    fn test_creates_parent_dirs_and_overwrites() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/out/words.csv");

        let sink = CsvSink::new(b';');
        sink.write_table(&path, &["word", "count"], [("old", 9u64)])
            .expect("first write");
        sink.write_table(&path, &["word", "count"], [("new", 1u64)])
            .expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "word;count\nnew;1\n");
        let leftovers = fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_staged_table_leaves_target_until_commit() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("words.csv");

        let staged = CsvSink::default()
            .stage_table(&path, &["word", "count"], [("fine", 3u64)])
            .expect("stage");
        assert_eq!(staged.rows(), 1);
        assert!(!path.exists());

        assert_eq!(staged.commit().expect("commit"), 1);
        assert_eq!(fs::read_to_string(&path).expect("read"), "word,count\nfine,3\n");
    }

    #[test]
    fn test_dropped_staged_table_writes_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("words.csv");

        let staged = CsvSink::default()
            .stage_table(&path, &["word", "count"], [("fine", 3u64)])
            .expect("stage");
        drop(staged);

        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn test_commit_all() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = CsvSink::default();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");

        let staged = vec![
            sink.stage_table(&a, &["word", "count"], [("x", 1u64)]).expect("stage a"),
            sink.stage_table(&b, &["word", "count"], Vec::<(&str, u64)>::new())
                .expect("stage b"),
        ];
        assert_eq!(commit_all(staged).expect("commit"), vec![1, 0]);
        assert_eq!(fs::read_to_string(&a).expect("read"), "word,count\nx,1\n");
        assert_eq!(fs::read_to_string(&b).expect("read"), "word,count\n");
    }

    #[test]
    fn test_commit_all_rolls_back_on_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = CsvSink::default();
        let a = dir.path().join("a.csv");
        let blocked = dir.path().join("blocked");
        let b = blocked.join("b.csv");

        let staged_a = sink.stage_table(&a, &["word"], [("x",)]).expect("stage a");
        let staged_b = sink.stage_table(&b, &["word"], [("y",)]).expect("stage b");
        // A directory at the target path makes the rename fail.
        fs::create_dir(&b).expect("block target");

        let err = commit_all(vec![staged_a, staged_b]).unwrap_err();
        assert!(matches!(err, SinkError::Persist { .. }));
        assert!(!a.exists());
    }
}
