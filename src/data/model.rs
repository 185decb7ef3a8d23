use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{CleanError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a listings table carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Calendar date without a time component.
    Date(NaiveDate),
    /// Timestamp for sources that carry a time of day.
    DateTime(NaiveDateTime),
    Null,
}

impl Value {
    /// Infer the type of a raw text cell.
    ///
    /// Integers are only recognised in their canonical spelling so that
    /// identifiers such as `007` or `+12` keep their original text.
    pub fn infer(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            if i.to_string() == s {
                return Value::Integer(i);
            }
            return Value::String(s.to_string());
        }
        if looks_numeric(s) {
            if let Ok(f) = s.parse::<f64>() {
                return Value::Float(f);
            }
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }

    /// Interpret the value as an `f64` for range comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

/// Rejects spellings `f64::from_str` accepts but a table cell should not
/// be read as a number (`inf`, `NaN`, `infinity`).
fn looks_numeric(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

/// Formats the value the way it is written back to a delimited-text file.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) if v.is_nan() => Ok(()),
            Value::Float(v) if v.fract() == 0.0 && v.abs() < 1e16 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Null => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one record of the table
// ---------------------------------------------------------------------------

/// One record; `cells[i]` belongs to `Dataset::columns[i]`.
///
/// `raw[i]` holds the cell's source text when the row came from text, and is
/// what gets written back unless the cell was re-typed.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Value>,
    pub raw: Vec<Option<String>>,
    /// Position of the row among the data rows of the source file.
    pub source_row: usize,
}

impl Row {
    pub fn new(cells: Vec<Value>) -> Self {
        let raw = vec![None; cells.len()];
        Row {
            cells,
            raw,
            source_row: 0,
        }
    }

    /// Row parsed from text fields, keeping each field verbatim.
    pub fn from_text<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        let (cells, raw) = fields
            .into_iter()
            .map(|f| (Value::infer(f), Some(f.to_string())))
            .unzip();
        Row {
            cells,
            raw,
            source_row: 0,
        }
    }

    pub fn get(&self, idx: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.cells.get(idx).unwrap_or(&NULL)
    }

    /// Replace a cell with a converted value; the source text no longer
    /// describes it.
    pub fn set(&mut self, idx: usize, value: Value) {
        self.cells[idx] = value;
        self.raw[idx] = None;
    }

    /// Text written for cell `idx`: the source text if kept, else the value.
    pub fn output_text(&self, idx: usize) -> String {
        match self.raw.get(idx) {
            Some(Some(text)) => text.clone(),
            _ => self.get(idx).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An ordered table: column names in file order and rows in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset from rows in source order, padding short rows with
    /// nulls so every row has one cell per column.
    pub fn new(columns: Vec<String>, mut rows: Vec<Row>) -> Self {
        let width = columns.len();
        for (source_row, row) in rows.iter_mut().enumerate() {
            row.cells.resize(width, Value::Null);
            row.raw.resize(width, None);
            row.source_row = source_row;
        }
        Dataset { columns, rows }
    }

    /// Position of `name` in the header.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CleanError::MissingColumn(name.to_string()))
    }

    /// Fails on the first name absent from the header.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        names.iter().try_for_each(|n| self.column_index(n).map(|_| ()))
    }

    /// Values of one column, in row order.
    pub fn column<'a>(&'a self, name: &str) -> Result<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |r| r.get(idx)))
    }

    /// New dataset holding the rows at `indices`, in the order given.  Rows
    /// keep their `source_row`.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
