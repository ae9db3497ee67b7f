use log::debug;
use std::collections::HashSet;

use crate::config::*;

/// A table of respondents held fully in memory.
///
/// Invariant: every row has exactly one cell per column.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Dataset {
        Dataset {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a dataset, checking that every row matches the header.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Dataset, CleaningErrors> {
        let mut ds = Dataset::new(columns);
        for row in rows {
            ds.push_row(row)?;
        }
        Ok(ds)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), CleaningErrors> {
        if row.len() != self.columns.len() {
            return Err(CleaningErrors::RowWidthMismatch {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Same as `column_index`, for names that the configuration requires.
    pub fn require_column(&self, name: &str) -> Result<usize, CleaningErrors> {
        self.column_index(name)
            .ok_or_else(|| CleaningErrors::MissingColumn(name.to_string()))
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Renames the column at the given position.
    pub fn rename_column(&mut self, col: usize, name: String) {
        if let Some(c) = self.columns.get_mut(col) {
            *c = name;
        }
    }

    /// Applies a function to every column name.
    pub fn rename_columns<F: Fn(&str) -> String>(&mut self, f: F) {
        for c in self.columns.iter_mut() {
            *c = f(c);
        }
    }

    /// Removes a column by name. Returns false if it was not there.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in self.rows.iter_mut() {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Appends a column. Missing values are added if `values` is shorter
    /// than the number of rows.
    pub fn add_column(&mut self, name: String, values: Vec<Cell>) {
        self.columns.push(name);
        let mut values = values.into_iter();
        for row in self.rows.iter_mut() {
            row.push(values.next().unwrap_or(Cell::Missing));
        }
    }

    /// Removes a row, returning it.
    pub fn remove_row(&mut self, idx: usize) -> Option<Vec<Cell>> {
        if idx < self.rows.len() {
            Some(self.rows.remove(idx))
        } else {
            None
        }
    }

    /// The positions of the columns holding at least one non-missing cell.
    pub fn non_empty_columns(&self) -> HashSet<usize> {
        (0..self.width())
            .filter(|col| self.rows.iter().any(|r| !r[*col].is_missing()))
            .collect()
    }

    /// Keeps the rows at the given positions, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|idx| self.rows.get(*idx).cloned())
                .collect(),
        }
    }

    /// Projects the dataset on the given columns, in the given order.
    pub fn select_columns(&self, cols: &[usize]) -> Dataset {
        debug!("select_columns: {:?}", cols);
        Dataset {
            columns: cols.iter().map(|c| self.columns[*c].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| cols.iter().map(|c| r[*c].clone()).collect())
                .collect(),
        }
    }

    /// Applies a function to each cell of the given column.
    pub fn map_column<F: Fn(&Cell) -> Cell>(&mut self, col: usize, f: F) {
        for row in self.rows.iter_mut() {
            if let Some(cell) = row.get_mut(col) {
                *cell = f(cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![
                vec![Cell::parse("1"), Cell::Missing, Cell::parse("x")],
                vec![Cell::parse("2"), Cell::Missing, Cell::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn parse_cells() {
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("  "), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse("98658412"), Cell::Number(98658412.0));
        assert_eq!(Cell::parse("inf"), Cell::Text("inf".to_string()));
        assert_eq!(
            Cell::parse("Agree a little"),
            Cell::Text("Agree a little".to_string())
        );
    }

    #[test]
    fn integral_numbers_render_without_decimals() {
        assert_eq!(Cell::Number(98658412.0).to_string(), "98658412");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::Missing.to_string(), "");
        assert_eq!(Cell::Number(6.0).key(), Some("6".to_string()));
        assert_eq!(Cell::Missing.key(), None);
    }

    #[test]
    fn rejects_rows_of_the_wrong_width() {
        let mut ds = sample();
        let res = ds.push_row(vec![Cell::Missing]);
        assert_eq!(
            res,
            Err(CleaningErrors::RowWidthMismatch {
                row: 2,
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn drop_and_add_columns() {
        let mut ds = sample();
        assert!(ds.drop_column("b"));
        assert!(!ds.drop_column("b"));
        assert_eq!(ds.columns(), &["a".to_string(), "c".to_string()]);
        ds.add_column("d".to_string(), vec![Cell::Number(1.0)]);
        assert_eq!(ds.cell(0, 2), Some(&Cell::Number(1.0)));
        assert_eq!(ds.cell(1, 2), Some(&Cell::Missing));
    }

    #[test]
    fn non_empty_columns_ignore_blank_ones() {
        let ds = sample();
        let cols = ds.non_empty_columns();
        assert!(cols.contains(&0));
        assert!(!cols.contains(&1));
        assert!(cols.contains(&2));
    }

    #[test]
    fn select_and_take() {
        let ds = sample();
        let sel = ds.select_columns(&[2, 0]);
        assert_eq!(sel.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(sel.cell(0, 1), Some(&Cell::Number(1.0)));
        let taken = ds.take_rows(&[1]);
        assert_eq!(taken.len(), 1);
        assert_eq!(taken.cell(0, 0), Some(&Cell::Number(2.0)));
    }
}
