use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::data::filter::remove_tokens;
use crate::data::loader::load_token_file;
use crate::data::model::TokenCollection;
use crate::data::writer::{write_token_file, OutputFormat};
use crate::error::{Result, TokenFileError};
use crate::view::source::{CellValue, ShapeChange, TableSource};
use crate::view::sorter::StableIndexSorter;
use crate::view::table::TokenTable;

// ---------------------------------------------------------------------------
// Editing session
// ---------------------------------------------------------------------------

/// Everything an editor front end needs, independent of rendering.
///
/// Row numbers taken by the `*_displayed_*` operations are positions in the
/// sorted view; they are translated to table rows through the sorter.
#[derive(Debug, Default)]
pub struct Session {
    /// Loaded tokens (None until a file is opened).
    pub table: Option<TokenTable>,

    /// Sorted permutation over `table`.
    pub sorter: StableIndexSorter,

    /// File the current tokens came from.
    pub source_path: Option<PathBuf>,

    /// Where `save` writes when not told otherwise.
    pub output_path: Option<PathBuf>,

    /// Last status or error message.
    pub status_message: Option<String>,
}

/// Counters describing the loaded tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub path: Option<String>,
    pub good_messages: u32,
    pub bad_messages: u32,
    pub tokens: usize,
    pub good_tokens: usize,
    pub bad_tokens: usize,
}

impl Summary {
    pub fn of(collection: &TokenCollection, path: Option<&Path>) -> Self {
        Self {
            path: path.map(|p| p.display().to_string()),
            good_messages: collection.good_message_count(),
            bad_messages: collection.bad_message_count(),
            tokens: collection.len(),
            good_tokens: collection.num_good_tokens(),
            bad_tokens: collection.num_bad_tokens(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is loaded with the tokens in `path`.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let collection = self.record(load_token_file(path))?;
        self.set_collection(collection);
        self.source_path = Some(path.to_path_buf());
        self.output_path = None;
        self.status_message = Some(format!("opened {}", path.display()));
        Ok(())
    }

    /// Merge the tokens in `path` into the loaded ones. Without anything
    /// loaded this behaves like [`open`](Self::open).
    pub fn import(&mut self, path: &Path) -> Result<()> {
        if self.table.is_none() {
            return self.open(path);
        }
        let other = self.record(load_token_file(path))?;
        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };
        let before = table.collection().len();
        table.collection_mut().absorb(other);
        let after = table.collection().len();
        self.sync_view();
        self.status_message = Some(format!(
            "imported {}: {} new tokens",
            path.display(),
            after.saturating_sub(before)
        ));
        info!("imported {} into the session", path.display());
        Ok(())
    }

    pub fn set_collection(&mut self, collection: TokenCollection) {
        let table = TokenTable::new(collection);
        self.sorter.reset(table.row_count());
        self.table = Some(table);
        self.resort();
    }

    /// Drop tokens below both thresholds. Returns how many were removed.
    pub fn remove_tokens(&mut self, good_threshold: i64, bad_threshold: i64) -> Result<usize> {
        let result = self
            .table_mut()
            .map(|table| remove_tokens(table.collection_mut(), good_threshold, bad_threshold));
        let removed = self.record(result)?;
        self.sync_view();
        self.status_message = Some(format!("removed {removed} tokens"));
        Ok(removed)
    }

    /// Add a token with zero counts; it shows up as the last displayed row.
    pub fn add_token(&mut self, token: &str) -> Result<()> {
        let result = self.table_mut().and_then(|table| table.add_row(token));
        let change = self.record(result)?;
        self.apply_change(change);
        Ok(())
    }

    /// Remove the tokens shown at the given displayed rows.
    pub fn delete_displayed_rows(&mut self, displayed: &[usize]) -> Result<usize> {
        let rows = self.sorter.displayed_to_source_rows(displayed);
        let result = self.table_mut().and_then(|table| table.remove_rows(&rows));
        let (change, removed) = self.record(result)?;
        self.apply_change(change);
        self.status_message = Some(format!("deleted {removed} tokens"));
        Ok(removed)
    }

    /// Edit the good or bad count of the token at a displayed row.
    pub fn set_displayed_count(
        &mut self,
        displayed: usize,
        column: usize,
        value: i64,
    ) -> Result<()> {
        let row = self.sorter.displayed_to_source(displayed).ok_or_else(|| {
            TokenFileError::IllegalArgument(format!("displayed row {displayed} out of range"))
        });
        let result = row.and_then(|row| {
            self.table_mut()
                .and_then(|table| table.set_count(row, column, value))
        });
        self.record(result)
    }

    /// Sort on `column`, flipping direction when it is already the key.
    pub fn click_header(&mut self, column: usize) -> Result<()> {
        let result = match self.table.as_ref() {
            Some(table) => self.sorter.toggle_sort(table, column),
            None => Err(no_tokens()),
        };
        self.record(result)
    }

    /// Cell shown at a displayed position.
    pub fn displayed_value(&self, displayed: usize, column: usize) -> CellValue {
        match self.table.as_ref() {
            Some(table) => self.sorter.value_at(table, displayed, column),
            None => CellValue::Null,
        }
    }

    /// Write the loaded tokens. The format's extension is appended when
    /// `path` lacks it; the final path is returned and remembered.
    pub fn save(&mut self, path: &Path, format: OutputFormat) -> Result<PathBuf> {
        let target = format.ensure_extension(path);
        let result = match self.table.as_ref() {
            Some(table) => write_token_file(table.collection(), &target, format),
            None => Err(no_tokens()),
        };
        self.record(result)?;
        self.status_message = Some(format!("saved {}", target.display()));
        self.output_path = Some(target.clone());
        Ok(target)
    }

    pub fn summary(&self) -> Option<Summary> {
        self.table
            .as_ref()
            .map(|table| Summary::of(table.collection(), self.source_path.as_deref()))
    }

    fn table_mut(&mut self) -> Result<&mut TokenTable> {
        self.table.as_mut().ok_or_else(no_tokens)
    }

    /// Log a failure and keep its text for the status line.
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!("{err}");
            self.status_message = Some(err.to_string());
        }
        result
    }

    /// Rebuild the table snapshot after a bulk change and reset the view.
    fn sync_view(&mut self) {
        let change = match self.table.as_mut() {
            Some(table) => table.refresh(),
            None => return,
        };
        self.apply_change(change);
    }

    fn apply_change(&mut self, change: ShapeChange) {
        let Some(table) = self.table.as_ref() else {
            return;
        };
        self.sorter.reallocate(table.row_count(), change);
        if change == ShapeChange::Reset {
            self.resort();
        }
    }

    fn resort(&mut self) {
        if let Some(table) = self.table.as_ref() {
            if let Err(err) = self.sorter.resort(table) {
                warn!("could not reapply sort order: {err}");
                self.sorter.reset(table.row_count());
            }
        }
    }
}

fn no_tokens() -> TokenFileError {
    TokenFileError::IllegalArgument("no token file is loaded".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::binary;
    use crate::data::model::TokenRecord;
    use crate::view::table::{BAD_COLUMN, GOOD_COLUMN, TOKEN_COLUMN};
    use tempfile::TempDir;

    fn write_sample(dir: &TempDir, name: &str, records: Vec<TokenRecord>) -> PathBuf {
        let path = dir.path().join(name);
        let collection = TokenCollection::from_records(20, 10, records);
        std::fs::write(&path, binary::encode(&collection)).unwrap();
        path
    }

    fn opened() -> (TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(
            &dir,
            "training.dat",
            vec![
                TokenRecord::new("alpha", 5, 0),
                TokenRecord::new("beta", 1, 9),
                TokenRecord::new("gamma", 3, 3),
            ],
        );
        let mut session = Session::new();
        session.open(&path).unwrap();
        (dir, session)
    }

    fn shown_tokens(session: &Session) -> Vec<String> {
        (0..session.sorter.len())
            .map(|r| session.displayed_value(r, TOKEN_COLUMN).to_string())
            .collect()
    }

    #[test]
    fn open_fills_table_and_summary() {
        let (_dir, session) = opened();
        let summary = session.summary().unwrap();
        assert_eq!(summary.good_messages, 20);
        assert_eq!(summary.tokens, 3);
        assert_eq!(summary.bad_tokens, 2);
        assert_eq!(shown_tokens(&session), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn failures_land_in_status_message() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.txt");
        std::fs::write(&bogus, "hello").unwrap();
        let mut session = Session::new();
        assert!(session.open(&bogus).is_err());
        assert!(session.table.is_none());
        assert!(session.status_message.is_some());
        assert!(session.add_token("x").is_err());
    }

    #[test]
    fn edits_go_through_the_sorted_view() {
        let (_dir, mut session) = opened();
        session.click_header(GOOD_COLUMN).unwrap();
        session.click_header(GOOD_COLUMN).unwrap();
        assert_eq!(shown_tokens(&session), vec!["alpha", "gamma", "beta"]);

        session.set_displayed_count(2, BAD_COLUMN, 0).unwrap();
        let table = session.table.as_ref().unwrap();
        assert_eq!(table.collection().get("beta"), Some(&TokenRecord::new("beta", 1, 0)));

        assert_eq!(session.delete_displayed_rows(&[0, 0]).unwrap(), 1);
        assert_eq!(session.status_message.as_deref(), Some("deleted 1 tokens"));
        assert_eq!(shown_tokens(&session), vec!["gamma", "beta"]);

        session.add_token("delta").unwrap();
        assert_eq!(shown_tokens(&session), vec!["gamma", "beta", "delta"]);
    }

    #[test]
    fn filtering_and_import_reset_the_view() {
        let (dir, mut session) = opened();
        assert_eq!(session.remove_tokens(4, -1).unwrap(), 2);
        assert_eq!(shown_tokens(&session), vec!["alpha"]);

        let extra = write_sample(
            &dir,
            "extra.dat",
            vec![TokenRecord::new("alpha", 1, 0), TokenRecord::new("omega", 0, 2)],
        );
        session.import(&extra).unwrap();
        let table = session.table.as_ref().unwrap();
        assert_eq!(table.collection().get("alpha"), Some(&TokenRecord::new("alpha", 6, 0)));
        assert_eq!(table.collection().good_message_count(), 40);
        assert_eq!(shown_tokens(&session), vec!["alpha", "omega"]);
    }

    #[test]
    fn save_appends_extension_and_remembers_path() {
        let (dir, mut session) = opened();
        let saved = session.save(&dir.path().join("export"), OutputFormat::Xml).unwrap();
        assert_eq!(saved, dir.path().join("export.xml"));
        assert_eq!(session.output_path.as_deref(), Some(saved.as_path()));

        let mut reopened = Session::new();
        reopened.open(&saved).unwrap();
        assert_eq!(reopened.summary().unwrap().tokens, 3);
    }
}
