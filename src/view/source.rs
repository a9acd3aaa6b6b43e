use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a tabular source
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl CellValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

/// How a column is compared when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

// ---------------------------------------------------------------------------
// TableSource – anything that can be shown as rows and columns
// ---------------------------------------------------------------------------

/// Read access to a table of cells addressed by `(row, column)`.
pub trait TableSource {
    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    fn column_name(&self, column: usize) -> &str;

    fn column_kind(&self, column: usize) -> ColumnKind;

    /// Value at the given position; out-of-range positions yield
    /// [`CellValue::Null`].
    fn value_at(&self, row: usize, column: usize) -> CellValue;

    /// Column index by header name.
    fn column_index(&self, name: &str) -> Option<usize> {
        (0..self.column_count()).find(|&c| self.column_name(c) == name)
    }
}

/// How the row set of a source changed since a view was last synchronised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeChange {
    /// Nothing changed.
    Unchanged,
    /// One row appended at the end.
    Inserted,
    /// The source row with this index was removed; later rows shifted down.
    Deleted(usize),
    /// Anything else.
    Reset,
}
