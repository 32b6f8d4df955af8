use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Declared kind of a projected column. Raw text is coerced to this kind
/// while reading; a coercion failure yields [`Value::Null`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Keep the raw text.
    Text,
    /// Parse as f64.
    Float,
    /// Parse as i64.
    Int,
    /// Parse as integer seconds since the Unix epoch.
    EpochSeconds,
}

/// A projected column: the header name to read and the kind to coerce to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn epoch_seconds(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::EpochSeconds)
    }
}

/// A single scalar field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Float(f64),
    Int(i64),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    /// Coerces raw field text to the declared kind.
    ///
    /// Leading/trailing whitespace is ignored for numeric kinds. Non-finite
    /// floats and out-of-range timestamps coerce to `Null`.
    pub fn coerce(raw: &str, kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => Self::Text(raw.to_string()),
            FieldKind::Float => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Self::Float(v),
                _ => Self::Null,
            },
            FieldKind::Int => raw.trim().parse::<i64>().map_or(Self::Null, Self::Int),
            FieldKind::EpochSeconds => raw
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map_or(Self::Null, Self::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as a measure, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.timestamp()),
            Self::Null => Ok(()),
        }
    }
}

/// Projected values of one data row, positionally aligned with the
/// owning window's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// A structurally malformed row: every projected field is null.
    pub fn malformed(width: usize) -> Self {
        Self {
            values: vec![Value::Null; width],
        }
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// An ordered batch of records sharing one column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    columns: Arc<[String]>,
    records: Vec<Record>,
}

impl Window {
    pub fn new(columns: Arc<[String]>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Builds a window from literal rows. Convenient for tests and benches.
    pub fn from_rows<I, S>(columns: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<Value>>,
    {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        let records = rows.into_iter().map(|r| Record::new(r.into())).collect();
        Self { columns, records }
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    /// Resolves a column name to its position in every record.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_float() {
        assert_eq!(Value::coerce("4.5", FieldKind::Float), Value::Float(4.5));
        assert_eq!(Value::coerce(" 3 ", FieldKind::Float), Value::Float(3.0));
        assert_eq!(Value::coerce("abc", FieldKind::Float), Value::Null);
        assert_eq!(Value::coerce("NaN", FieldKind::Float), Value::Null);
        assert_eq!(Value::coerce("inf", FieldKind::Float), Value::Null);
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(Value::coerce("42", FieldKind::Int), Value::Int(42));
        assert_eq!(Value::coerce("4.2", FieldKind::Int), Value::Null);
    }

    #[test]
    fn test_coerce_epoch_seconds() {
        let v = Value::coerce("940636800", FieldKind::EpochSeconds);
        let ts = v.as_timestamp().expect("timestamp");
        assert_eq!(ts.to_rfc3339(), "1999-10-23T00:00:00+00:00");

        assert_eq!(Value::coerce("yesterday", FieldKind::EpochSeconds), Value::Null);
        assert_eq!(
            Value::coerce(&i64::MAX.to_string(), FieldKind::EpochSeconds),
            Value::Null
        );
    }

    #[test]
    fn test_coerce_text_keeps_whitespace() {
        assert_eq!(
            Value::coerce(" Dune ", FieldKind::Text),
            Value::Text(" Dune ".to_string())
        );
    }

    #[test]
    fn test_as_f64_accepts_int_and_float() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Text("3".into()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_window_column_index() {
        let w = Window::from_rows(&["Title", "review/score"], Vec::<Vec<Value>>::new());
        assert_eq!(w.column_index("review/score"), Some(1));
        assert_eq!(w.column_index("missing"), None);
        assert!(w.is_empty());
    }

    #[test]
    fn test_malformed_record_is_all_null() {
        let r = Record::malformed(3);
        assert_eq!(r.values().len(), 3);
        assert!(r.values().iter().all(Value::is_null));
    }
}
