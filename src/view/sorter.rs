use std::cmp::Ordering;

use super::source::{CellValue, ColumnKind, ShapeChange, TableSource};
use crate::error::{Result, TokenFileError};

// ---------------------------------------------------------------------------
// StableIndexSorter – a sorted view that never touches the source
// ---------------------------------------------------------------------------

/// Presents any [`TableSource`] in sorted order without copying or reordering
/// its rows.
///
/// The sorter keeps one index per displayed row (`indexes[displayed] =
/// source row`) and nothing else; the source is passed in whenever values are
/// needed. Sorting is stable, so rows that compare equal on the active column
/// keep their relative order across any number of re-sorts.
#[derive(Debug, Clone, Default)]
pub struct StableIndexSorter {
    indexes: Vec<usize>,
    sort_column: Option<usize>,
    ascending: bool,
}

impl StableIndexSorter {
    /// Identity view over `row_count` rows.
    pub fn new(row_count: usize) -> Self {
        Self {
            indexes: (0..row_count).collect(),
            sort_column: None,
            ascending: true,
        }
    }

    pub fn for_source<S: TableSource + ?Sized>(source: &S) -> Self {
        Self::new(source.row_count())
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Active sort column and direction, if any.
    pub fn sort_key(&self) -> Option<(usize, bool)> {
        self.sort_column.map(|c| (c, self.ascending))
    }

    /// The current permutation, displayed row → source row.
    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    /// Source row shown at `row`, if `row` is on screen.
    pub fn displayed_to_source(&self, row: usize) -> Option<usize> {
        self.indexes.get(row).copied()
    }

    /// Batch form of [`displayed_to_source`](Self::displayed_to_source);
    /// rows outside the view are skipped.
    pub fn displayed_to_source_rows(&self, rows: &[usize]) -> Vec<usize> {
        rows.iter()
            .filter_map(|&row| self.displayed_to_source(row))
            .collect()
    }

    /// Value shown at a displayed position.
    pub fn value_at<S: TableSource + ?Sized>(
        &self,
        source: &S,
        row: usize,
        column: usize,
    ) -> CellValue {
        match self.displayed_to_source(row) {
            Some(source_row) => source.value_at(source_row, column),
            None => CellValue::Null,
        }
    }

    /// Bring the permutation in line with a source that now has `row_count`
    /// rows.
    ///
    /// A single appended row gets an identity entry at the end; a single
    /// deleted row is dropped and every larger source index shifts down by
    /// one. Any other change resets the view to identity order.
    pub fn reallocate(&mut self, row_count: usize, change: ShapeChange) {
        let current = self.indexes.len();
        match change {
            ShapeChange::Inserted if row_count == current + 1 => {
                self.indexes.push(current);
            }
            ShapeChange::Deleted(removed) if current > 0 && row_count == current - 1 => {
                self.indexes.retain(|&i| i != removed);
                if self.indexes.len() != row_count {
                    self.reset(row_count);
                    return;
                }
                for index in &mut self.indexes {
                    if *index > removed {
                        *index -= 1;
                    }
                }
            }
            _ if row_count == current && change != ShapeChange::Reset => {}
            _ => self.reset(row_count),
        }
    }

    /// Identity order over `row_count` rows. The sort key is kept so
    /// [`resort`](Self::resort) can reapply it.
    pub fn reset(&mut self, row_count: usize) {
        self.indexes = (0..row_count).collect();
    }

    /// Make sure the view and its source agree on the number of rows.
    pub fn check_source<S: TableSource + ?Sized>(&self, source: &S) -> Result<()> {
        if self.indexes.len() != source.row_count() {
            return Err(TokenFileError::StaleView {
                view_rows: self.indexes.len(),
                source_rows: source.row_count(),
            });
        }
        Ok(())
    }

    /// Sort by a single column. The new key replaces any previous one.
    pub fn sort_by_column<S: TableSource + ?Sized>(
        &mut self,
        source: &S,
        column: usize,
        ascending: bool,
    ) -> Result<()> {
        if column >= source.column_count() {
            return Err(TokenFileError::IllegalArgument(format!(
                "column {column} out of range, table has {} columns",
                source.column_count()
            )));
        }
        self.check_source(source)?;
        self.sort_column = Some(column);
        self.ascending = ascending;
        self.sort(source);
        Ok(())
    }

    /// Header-click behaviour: clicking the active column flips the
    /// direction, any other column sorts ascending.
    pub fn toggle_sort<S: TableSource + ?Sized>(
        &mut self,
        source: &S,
        column: usize,
    ) -> Result<()> {
        let ascending = match self.sort_column {
            Some(active) if active == column => !self.ascending,
            _ => true,
        };
        self.sort_by_column(source, column, ascending)
    }

    /// Reapply the active sort key, e.g. after a reset.
    pub fn resort<S: TableSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        match self.sort_column {
            Some(column) => self.sort_by_column(source, column, self.ascending),
            None => self.check_source(source),
        }
    }

    fn sort<S: TableSource + ?Sized>(&mut self, source: &S) {
        let Some(column) = self.sort_column else {
            return;
        };
        let kind = source.column_kind(column);
        let ascending = self.ascending;
        let mut compare = |a: usize, b: usize| {
            let ordering =
                compare_cells(kind, &source.value_at(a, column), &source.value_at(b, column));
            if ascending { ordering } else { ordering.reverse() }
        };
        let mut from = self.indexes.clone();
        let high = self.indexes.len();
        shuttle_sort(&mut from, &mut self.indexes, 0, high, &mut compare);
    }
}

/// Compare two cells of a column. Null sorts before everything; numeric
/// columns compare by value, everything else by its text.
pub fn compare_cells(kind: ColumnKind, a: &CellValue, b: &CellValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    if kind == ColumnKind::Numeric {
        if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }
    }
    a.to_string().cmp(&b.to_string())
}

/// Stable merge sort over an index array that alternates between two buffers.
///
/// On entry `from` and `to` hold the same values in `low..high`; on return
/// `to[low..high]` is sorted. Each level sorts its halves into `from` (by
/// recursing with the buffers swapped) and merges them back into `to`.
fn shuttle_sort<F>(from: &mut [usize], to: &mut [usize], low: usize, high: usize, compare: &mut F)
where
    F: FnMut(usize, usize) -> Ordering,
{
    if high - low < 2 {
        return;
    }
    let middle = (low + high) / 2;
    shuttle_sort(to, from, low, middle, compare);
    shuttle_sort(to, from, middle, high, compare);

    // Already ordered halves only need copying. Below four elements the
    // regular merge does the same single comparison.
    if high - low >= 4 && compare(from[middle - 1], from[middle]) != Ordering::Greater {
        to[low..high].copy_from_slice(&from[low..high]);
        return;
    }

    let mut p = low;
    let mut q = middle;
    for slot in &mut to[low..high] {
        if q >= high || (p < middle && compare(from[p], from[q]) != Ordering::Greater) {
            *slot = from[p];
            p += 1;
        } else {
            *slot = from[q];
            q += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two columns: a numeric key and a text label.
    struct Grid {
        rows: Vec<(Option<i64>, &'static str)>,
    }

    impl TableSource for Grid {
        fn row_count(&self) -> usize {
            self.rows.len()
        }

        fn column_count(&self) -> usize {
            2
        }

        fn column_name(&self, column: usize) -> &str {
            ["key", "label"][column]
        }

        fn column_kind(&self, column: usize) -> ColumnKind {
            if column == 0 { ColumnKind::Numeric } else { ColumnKind::Text }
        }

        fn value_at(&self, row: usize, column: usize) -> CellValue {
            match (self.rows.get(row), column) {
                (Some((Some(k), _)), 0) => CellValue::Integer(*k),
                (Some((None, _)), 0) => CellValue::Null,
                (Some((_, label)), 1) => CellValue::Text(label.to_string()),
                _ => CellValue::Null,
            }
        }
    }

    fn grid() -> Grid {
        Grid {
            rows: vec![
                (Some(3), "c"),
                (Some(1), "a1"),
                (Some(10), "b"),
                (Some(1), "a2"),
                (None, "null"),
                (Some(3), "c2"),
                (Some(2), "d"),
            ],
        }
    }

    fn labels(sorter: &StableIndexSorter, source: &Grid) -> Vec<String> {
        (0..sorter.len())
            .map(|r| sorter.value_at(source, r, 1).to_string())
            .collect()
    }

    fn is_permutation(indexes: &[usize], n: usize) -> bool {
        let mut seen = vec![false; n];
        indexes.len() == n
            && indexes.iter().all(|&i| i < n && !std::mem::replace(&mut seen[i], true))
    }

    #[test]
    fn numeric_sort_is_stable_with_null_first() {
        let source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, true).unwrap();
        assert_eq!(labels(&sorter, &source), vec!["null", "a1", "a2", "d", "c", "c2", "b"]);
    }

    #[test]
    fn descending_keeps_ties_in_original_order() {
        let source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, false).unwrap();
        assert_eq!(labels(&sorter, &source), vec!["b", "c", "c2", "d", "a1", "a2", "null"]);
    }

    #[test]
    fn numeric_columns_do_not_sort_lexically() {
        let source = Grid {
            rows: vec![(Some(10), "ten"), (Some(9), "nine"), (Some(100), "hundred")],
        };
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, true).unwrap();
        assert_eq!(sorter.indexes(), &[1, 0, 2]);
    }

    #[test]
    fn text_sort_and_repeat_is_idempotent() {
        let source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 1, true).unwrap();
        let first = sorter.indexes().to_vec();
        sorter.sort_by_column(&source, 1, true).unwrap();
        assert_eq!(sorter.indexes(), first.as_slice());
        assert_eq!(labels(&sorter, &source), vec!["a1", "a2", "b", "c", "c2", "d", "null"]);
    }

    #[test]
    fn re_sorting_by_another_column_preserves_previous_order_for_ties() {
        let source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 1, false).unwrap();
        sorter.sort_by_column(&source, 0, true).unwrap();
        // ties on the key keep the descending label order from the first sort
        assert_eq!(labels(&sorter, &source), vec!["null", "a2", "a1", "d", "c2", "c", "b"]);
    }

    #[test]
    fn larger_inputs_stay_permutations_and_sorted() {
        let rows: Vec<(Option<i64>, &'static str)> = (0..257)
            .map(|i| (Some((i * 7919 % 31) as i64), "x"))
            .collect();
        let source = Grid { rows };
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, true).unwrap();
        let idx = sorter.indexes();
        assert!(is_permutation(idx, 257));
        for pair in idx.windows(2) {
            let (a, b) = (source.rows[pair[0]].0, source.rows[pair[1]].0);
            assert!(a < b || (a == b && pair[0] < pair[1]));
        }
    }

    #[test]
    fn toggle_flips_direction_on_same_column() {
        let source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.toggle_sort(&source, 0).unwrap();
        assert_eq!(sorter.sort_key(), Some((0, true)));
        sorter.toggle_sort(&source, 0).unwrap();
        assert_eq!(sorter.sort_key(), Some((0, false)));
        sorter.toggle_sort(&source, 1).unwrap();
        assert_eq!(sorter.sort_key(), Some((1, true)));
    }

    #[test]
    fn insert_appends_identity_entry() {
        let mut source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, true).unwrap();
        source.rows.push((Some(0), "new"));
        sorter.reallocate(source.row_count(), ShapeChange::Inserted);
        assert_eq!(sorter.displayed_to_source(7), Some(7));
        assert!(is_permutation(sorter.indexes(), 8));
    }

    #[test]
    fn delete_shifts_larger_indices() {
        let mut source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, true).unwrap();
        // view: [4, 1, 3, 6, 0, 5, 2]
        source.rows.remove(3);
        sorter.reallocate(source.row_count(), ShapeChange::Deleted(3));
        assert_eq!(sorter.indexes(), &[3, 1, 5, 0, 4, 2]);
        assert!(is_permutation(sorter.indexes(), 6));
        assert_eq!(labels(&sorter, &source), vec!["null", "a1", "d", "c", "c2", "b"]);
    }

    #[test]
    fn other_changes_reset_to_identity() {
        let mut sorter = StableIndexSorter::new(5);
        let source = grid();
        sorter.reallocate(source.row_count(), ShapeChange::Inserted);
        assert_eq!(sorter.indexes(), &[0, 1, 2, 3, 4, 5, 6]);
        sorter.reallocate(3, ShapeChange::Deleted(0));
        assert_eq!(sorter.indexes(), &[0, 1, 2]);
    }

    #[test]
    fn stale_view_refuses_to_sort() {
        let source = grid();
        let mut sorter = StableIndexSorter::new(3);
        let err = sorter.sort_by_column(&source, 0, true).unwrap_err();
        assert!(matches!(err, TokenFileError::StaleView { view_rows: 3, source_rows: 7 }));
        assert_eq!(sorter.indexes(), &[0, 1, 2]);
        assert!(matches!(
            StableIndexSorter::for_source(&source).sort_by_column(&source, 5, true),
            Err(TokenFileError::IllegalArgument(_))
        ));
    }

    #[test]
    fn batch_lookup_skips_rows_outside_the_view() {
        let source = grid();
        let mut sorter = StableIndexSorter::for_source(&source);
        sorter.sort_by_column(&source, 0, true).unwrap();
        assert_eq!(sorter.displayed_to_source_rows(&[0, 1, 99]), vec![4, 1]);
        assert_eq!(sorter.displayed_to_source(99), None);
    }

    #[test]
    fn null_ordering_rules() {
        let kind = ColumnKind::Text;
        assert_eq!(compare_cells(kind, &CellValue::Null, &CellValue::Null), Ordering::Equal);
        let empty = CellValue::Text(String::new());
        assert_eq!(compare_cells(kind, &CellValue::Null, &empty), Ordering::Less);
        assert_eq!(
            compare_cells(kind, &CellValue::Integer(0), &CellValue::Null),
            Ordering::Greater
        );
    }
}
