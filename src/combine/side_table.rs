use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::source::{clean_window, CsvOptions, FieldSpec, RecordSource, SourceError, Value};

/// Primary category of a side-table entry, after parsing the raw field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// First element of a serialized list such as `['Fiction', 'Drama']`.
    List(String),
    /// A plain value such as `Fiction`; for `Fiction, Drama` only the text
    /// before the first comma.
    Bare(String),
    /// The field was empty or not in a recognised shape.
    Uncategorized,
}

impl Category {
    /// Parses a raw category field.
    ///
    /// List elements may be single- or double-quoted; a quoted element may
    /// contain commas. An unbalanced bracket or quote yields `Uncategorized`.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Self::Uncategorized;
        }

        if let Some(rest) = s.strip_prefix('[') {
            let Some(inner) = rest.strip_suffix(']') else {
                return Self::Uncategorized;
            };
            return match first_list_element(inner.trim()) {
                Some(first) if !first.is_empty() => Self::List(first.to_string()),
                _ => Self::Uncategorized,
            };
        }

        if s.contains(['[', ']']) {
            return Self::Uncategorized;
        }
        match s.split(',').next().map(str::trim) {
            Some(first) if !first.is_empty() => Self::Bare(first.to_string()),
            _ => Self::Uncategorized,
        }
    }

    /// Group name, `None` for uncategorized entries.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::List(name) | Self::Bare(name) => Some(name.as_str()),
            Self::Uncategorized => None,
        }
    }
}

fn first_list_element(inner: &str) -> Option<&str> {
    if inner.is_empty() {
        return None;
    }

    let first = inner.chars().next()?;
    if first == '\'' || first == '"' {
        let body = &inner[1..];
        let close = body.find(first)?;
        let after = body[close + 1..].trim_start();
        if !(after.is_empty() || after.starts_with(',')) {
            return None;
        }
        return Some(body[..close].trim());
    }

    let end = inner.find(',').unwrap_or(inner.len());
    Some(inner[..end].trim())
}

/// Counters describing how a side table was loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideTableStats {
    /// Data rows read from the source.
    pub rows: u64,
    /// Rows with a missing key or category.
    pub incomplete: u64,
    /// Rows whose key was already present.
    pub duplicates: u64,
    /// Entries whose category could not be parsed.
    pub uncategorized: u64,
}

/// Immutable key -> category lookup, deduplicated by key.
#[derive(Debug, Clone, Default)]
pub struct SideTable {
    entries: HashMap<String, Category>,
    stats: SideTableStats,
}

impl SideTable {
    /// Builds a table from raw `(key, category)` pairs. The first occurrence
    /// of a key wins.
    pub fn from_pairs<I, K, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: AsRef<str>,
    {
        let mut table = Self::default();
        for (key, raw) in pairs {
            table.stats.rows += 1;
            table.insert(key.into(), raw.as_ref());
        }
        table
    }

    /// Streams the side table from a delimited file, reading only the key and
    /// category columns.
    pub fn load(
        path: &Path,
        key_column: &str,
        category_column: &str,
        window_size: usize,
        options: &CsvOptions,
    ) -> Result<Self, SourceError> {
        let projection = [FieldSpec::text(key_column), FieldSpec::text(category_column)];
        let source = RecordSource::open(path, &projection, window_size, options)?;

        let mut table = Self::default();
        for window in source {
            let window = window?;
            table.stats.rows += window.len() as u64;

            let cleaned = clean_window(window, &[key_column, category_column])?;
            table.stats.incomplete += cleaned.dropped as u64;

            for record in cleaned.window.into_records() {
                if let (Some(Value::Text(key)), Some(Value::Text(raw))) =
                    (record.get(0), record.get(1))
                {
                    table.insert(key.clone(), raw);
                }
            }
        }

        debug!(
            path = %path.display(),
            entries = table.len(),
            duplicates = table.stats.duplicates,
            uncategorized = table.stats.uncategorized,
            "loaded side table",
        );

        Ok(table)
    }

    fn insert(&mut self, key: String, raw: &str) {
        if self.entries.contains_key(&key) {
            self.stats.duplicates += 1;
            return;
        }
        let category = Category::parse(raw);
        if category == Category::Uncategorized {
            self.stats.uncategorized += 1;
        }
        self.entries.insert(key, category);
    }

    pub fn get(&self, key: &str) -> Option<&Category> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> SideTableStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_quoted_list() {
        assert_eq!(Category::parse("['Fiction']"), Category::List("Fiction".into()));
        assert_eq!(
            Category::parse("['Biography & Autobiography', 'History']"),
            Category::List("Biography & Autobiography".into())
        );
    }

    #[test]
    fn test_parse_double_quoted_list_with_apostrophe() {
        assert_eq!(
            Category::parse("[\"Children's stories\"]"),
            Category::List("Children's stories".into())
        );
    }

    #[test]
    fn test_parse_quoted_element_keeps_commas() {
        assert_eq!(
            Category::parse("['Juvenile Fiction, Animals', 'Nature']"),
            Category::List("Juvenile Fiction, Animals".into())
        );
    }

    #[test]
    fn test_parse_unquoted_list() {
        assert_eq!(
            Category::parse("[Fiction, Drama]"),
            Category::List("Fiction".into())
        );
    }

    #[test]
    fn test_parse_bare_value() {
        assert_eq!(Category::parse("  Poetry "), Category::Bare("Poetry".into()));
        assert_eq!(Category::parse("Fiction, Drama"), Category::Bare("Fiction".into()));
        assert_eq!(Category::parse(", Drama"), Category::Uncategorized);
        assert_eq!(Category::parse("Poetry").name(), Some("Poetry"));
    }

    #[test]
    fn test_parse_fallbacks() {
        for raw in ["", "   ", "[]", "['']", "['Fiction'", "['Fiction]", "Fic]tion", "['A' x]"] {
            assert_eq!(Category::parse(raw), Category::Uncategorized, "{raw:?}");
        }
        assert_eq!(Category::Uncategorized.name(), None);
    }

    #[test]
    fn test_from_pairs_first_occurrence_wins() {
        let table = SideTable::from_pairs([
            ("Dune", "['Fiction']"),
            ("Dune", "['Science']"),
            ("Emma", "[]"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Dune"), Some(&Category::List("Fiction".into())));
        assert_eq!(table.get("Emma"), Some(&Category::Uncategorized));

        let stats = table.stats();
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.uncategorized, 1);
    }
}
