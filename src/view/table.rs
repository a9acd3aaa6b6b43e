use log::debug;

use super::source::{CellValue, ColumnKind, ShapeChange, TableSource};
use crate::data::model::{TokenCollection, TokenRecord};
use crate::error::{Result, TokenFileError};

pub const TOKEN_COLUMN: usize = 0;
pub const GOOD_COLUMN: usize = 1;
pub const GOOD_PERCENT_COLUMN: usize = 2;
pub const BAD_COLUMN: usize = 3;
pub const BAD_PERCENT_COLUMN: usize = 4;

const COLUMN_NAMES: [&str; 5] = ["Token", "Good", "Good %", "Bad", "Bad %"];

// ---------------------------------------------------------------------------
// TokenTable – a TokenCollection seen as rows and columns
// ---------------------------------------------------------------------------

/// Row/column adapter over an owned [`TokenCollection`].
///
/// Rows are a snapshot of token keys. Tokens added through the table are
/// appended at the end rather than placed in key order, so row numbers handed
/// out earlier stay valid. The snapshot remembers the collection revision it
/// matches; after the collection is changed behind the table's back
/// (`collection_mut`), [`TokenTable::refresh`] rebuilds it.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    collection: TokenCollection,
    rows: Vec<String>,
    rows_revision: u64,
}

impl TokenTable {
    pub fn new(collection: TokenCollection) -> Self {
        let mut table = Self {
            collection,
            rows: Vec::new(),
            rows_revision: 0,
        };
        table.rebuild();
        table
    }

    pub fn collection(&self) -> &TokenCollection {
        &self.collection
    }

    /// Mutable access for bulk operations (filter, merge). Call
    /// [`refresh`](Self::refresh) afterwards.
    pub fn collection_mut(&mut self) -> &mut TokenCollection {
        &mut self.collection
    }

    pub fn into_collection(self) -> TokenCollection {
        self.collection
    }

    /// Swap in a different collection; rows are rebuilt in key order.
    pub fn replace_collection(&mut self, collection: TokenCollection) -> ShapeChange {
        self.collection = collection;
        self.rebuild();
        ShapeChange::Reset
    }

    /// Whether the row snapshot lags behind the collection.
    pub fn is_stale(&self) -> bool {
        self.rows_revision != self.collection.revision()
    }

    /// Rebuild the row snapshot if the collection changed shape.
    pub fn refresh(&mut self) -> ShapeChange {
        if !self.is_stale() {
            return ShapeChange::Unchanged;
        }
        self.rebuild();
        ShapeChange::Reset
    }

    fn rebuild(&mut self) {
        self.rows = self.collection.records().map(|r| r.token().to_string()).collect();
        self.rows_revision = self.collection.revision();
        debug!("token table rebuilt with {} rows", self.rows.len());
    }

    pub fn token_at(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(String::as_str)
    }

    pub fn record_at(&self, row: usize) -> Option<&TokenRecord> {
        self.token_at(row).and_then(|token| self.collection.get(token))
    }

    /// Row holding `token`, if present.
    pub fn row_of(&self, token: &str) -> Option<usize> {
        self.rows.iter().position(|t| t == token)
    }

    pub fn is_editable(&self, column: usize) -> bool {
        column == GOOD_COLUMN || column == BAD_COLUMN
    }

    /// Add a new token with zero counts as the last row.
    pub fn add_row(&mut self, token: &str) -> Result<ShapeChange> {
        if token.is_empty() {
            return Err(TokenFileError::IllegalArgument("token text cannot be empty".into()));
        }
        if self.collection.contains(token) {
            return Err(TokenFileError::IllegalArgument(format!(
                "the token {token:?} already exists in this set of tokens"
            )));
        }
        let change = match self.refresh() {
            ShapeChange::Unchanged => ShapeChange::Inserted,
            _ => ShapeChange::Reset,
        };
        self.collection.insert(TokenRecord::new(token, 0, 0));
        self.rows.push(token.to_string());
        self.rows_revision = self.collection.revision();
        Ok(change)
    }

    /// Remove the tokens at the given rows. Returns the shape change and the
    /// number of distinct rows removed.
    ///
    /// Row numbers refer to the current snapshot. When the collection changed
    /// since that snapshot was taken, the tokens are still removed by the
    /// rows the caller saw, then the snapshot is rebuilt and `Reset` reported.
    pub fn remove_rows(&mut self, rows: &[usize]) -> Result<(ShapeChange, usize)> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.rows.len()) {
            return Err(TokenFileError::IllegalArgument(format!(
                "row {bad} out of range, table has {} rows",
                self.rows.len()
            )));
        }
        let mut doomed = rows.to_vec();
        doomed.sort_unstable();
        doomed.dedup();
        if doomed.is_empty() {
            return Ok((ShapeChange::Unchanged, 0));
        }

        if self.is_stale() {
            for &row in &doomed {
                self.collection.remove(&self.rows[row]);
            }
            self.rebuild();
            return Ok((ShapeChange::Reset, doomed.len()));
        }

        for &row in doomed.iter().rev() {
            let token = self.rows.remove(row);
            self.collection.remove(&token);
        }
        self.rows_revision = self.collection.revision();

        let change = match doomed.as_slice() {
            [single] => ShapeChange::Deleted(*single),
            _ => ShapeChange::Reset,
        };
        Ok((change, doomed.len()))
    }

    /// Edit the good or bad count at `row`. Negative values are stored as 0.
    pub fn set_count(&mut self, row: usize, column: usize, value: i64) -> Result<()> {
        if !self.is_editable(column) {
            return Err(TokenFileError::IllegalArgument(format!(
                "column {:?} is not editable",
                COLUMN_NAMES.get(column).copied().unwrap_or("?")
            )));
        }
        let token = self
            .token_at(row)
            .ok_or_else(|| TokenFileError::IllegalArgument(format!("row {row} out of range")))?
            .to_string();
        let count = u32::try_from(value.max(0)).unwrap_or(u32::MAX);
        let updated = if column == GOOD_COLUMN {
            self.collection.set_good_count(&token, count)
        } else {
            self.collection.set_bad_count(&token, count)
        };
        if !updated {
            return Err(TokenFileError::IllegalArgument(format!(
                "token {token:?} is no longer in the collection"
            )));
        }
        Ok(())
    }
}

/// Share of `messages` that `count` represents, in percent with five decimals
/// rounded up. Zero when no messages were counted.
pub fn percent_of(count: u32, messages: u32) -> f64 {
    if messages == 0 {
        return 0.0;
    }
    let fraction = f64::from(count) / f64::from(messages);
    (fraction * 10_000_000.0).ceil() / 100_000.0
}

impl TableSource for TokenTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        COLUMN_NAMES.len()
    }

    fn column_name(&self, column: usize) -> &str {
        COLUMN_NAMES.get(column).copied().unwrap_or("")
    }

    fn column_kind(&self, column: usize) -> ColumnKind {
        if column == TOKEN_COLUMN {
            ColumnKind::Text
        } else {
            ColumnKind::Numeric
        }
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        let Some(record) = self.record_at(row) else {
            return CellValue::Null;
        };
        match column {
            TOKEN_COLUMN => CellValue::Text(record.token().to_string()),
            GOOD_COLUMN => CellValue::Integer(i64::from(record.good_count)),
            GOOD_PERCENT_COLUMN => CellValue::Float(percent_of(
                record.good_count,
                self.collection.good_message_count(),
            )),
            BAD_COLUMN => CellValue::Integer(i64::from(record.bad_count)),
            BAD_PERCENT_COLUMN => CellValue::Float(percent_of(
                record.bad_count,
                self.collection.bad_message_count(),
            )),
            _ => CellValue::Null,
        }
    }
}
