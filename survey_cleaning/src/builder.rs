pub use crate::config::*;
use crate::dataset::Dataset;

/// A builder for assembling a dataset row by row.
///
/// This is what the file readers use: raw fields go in, cells come out.
///
/// ```
/// pub use survey_cleaning::builder::Builder;
/// # use survey_cleaning::CleaningErrors;
///
/// let mut builder = Builder::new(&["Respondent ID".to_string(), "Q1".to_string()]);
///
/// builder.add_record(&["1001", "Agree a little"])?;
/// builder.add_record(&["1002"])?;
///
/// let dataset = builder.build();
/// assert_eq!(dataset.len(), 2);
///
/// # Ok::<(), CleaningErrors>(())
/// ```
pub struct Builder {
    pub(crate) _dataset: Dataset,
}

impl Builder {
    pub fn new(columns: &[String]) -> Builder {
        Builder {
            _dataset: Dataset::new(columns.to_vec()),
        }
    }

    /// Adds a row of raw fields.
    ///
    /// Rows shorter than the header are completed with missing cells, which
    /// is how exports drop trailing unanswered questions. Longer rows are
    /// rejected.
    pub fn add_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), CleaningErrors> {
        let cells: Vec<Cell> = fields.iter().map(|s| Cell::parse(s.as_ref())).collect();
        self.add_cells(cells)
    }

    /// Adds a row of already interpreted cells, with the same padding rule
    /// as `add_record`.
    pub fn add_cells(&mut self, mut cells: Vec<Cell>) -> Result<(), CleaningErrors> {
        let width = self._dataset.width();
        if cells.len() < width {
            cells.resize(width, Cell::Missing);
        }
        self._dataset.push_row(cells)
    }

    pub fn build(self) -> Dataset {
        self._dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_records() {
        let mut b = Builder::new(&["a".to_string(), "b".to_string()]);
        b.add_record(&["1"]).unwrap();
        let ds = b.build();
        assert_eq!(ds.cell(0, 1), Some(&Cell::Missing));
    }

    #[test]
    fn rejects_long_records() {
        let mut b = Builder::new(&["a".to_string()]);
        let res = b.add_record(&["1", "2"]);
        assert!(matches!(
            res,
            Err(CleaningErrors::RowWidthMismatch { found: 2, .. })
        ));
    }
}
