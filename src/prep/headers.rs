// Turning the two header rows of a survey export into one.

use crate::prep::{config_reader::InputSettings, *};

/// Keeps letters, digits, underscores and whitespace.
pub fn strip_punctuation(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// Applies the header promotions, then strips punctuation from the names.
///
/// Survey tools put the question on the header row and the sub-question
/// (the statement of a matrix question, the "Other" field, ...) on the
/// first data row. A promotion renames a span of columns after the labels
/// of that first row, with an optional suffix. Once any promotion ran, the
/// first row is removed.
pub fn normalize_headers(mut ds: Dataset, settings: &InputSettings) -> PrepResult<Dataset> {
    let promotions = settings.header_promotions.clone().unwrap_or_default();
    if !promotions.is_empty() {
        let labels: Vec<Cell> = match ds.rows().first() {
            Some(row) => row.clone(),
            None => whatever!("header promotions are configured but the export has no rows"),
        };
        for promotion in promotions.iter() {
            let first = promotion.first_column_index()?;
            let last = promotion.last_column_index()?;
            if last < first || last >= ds.width() {
                return Err(PrepError::HeaderPromotionOutOfRange {
                    first: first + 1,
                    last: last + 1,
                    width: ds.width(),
                });
            }
            let suffix = promotion.suffix.clone().unwrap_or_default();
            for (col, label) in labels.iter().enumerate().take(last + 1).skip(first) {
                match label {
                    Cell::Missing => debug!(
                        "normalize_headers: no label for column {:?}, keeping it",
                        ds.columns()[col]
                    ),
                    l => ds.rename_column(col, format!("{}{}", l, suffix)),
                }
            }
        }
        ds.remove_row(0);
    }
    if settings.strip_punctuation.unwrap_or(true) {
        ds.rename_columns(strip_punctuation);
    }
    debug!("normalize_headers: {:?}", ds.columns());
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export() -> Dataset {
        let cols: Vec<String> = ["Respondent ID", "How much?", "", "Other (please specify)"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Dataset::from_rows(
            cols,
            vec![
                vec![Cell::Missing, Cell::parse("I'm happy"), Cell::parse("I'm sad"), Cell::parse("Response")],
                vec![Cell::parse("1"), Cell::parse("Yes"), Cell::parse("No"), Cell::Missing],
            ],
        )
        .unwrap()
    }

    fn settings(js: serde_json::Value) -> InputSettings {
        serde_json::from_value(js).unwrap()
    }

    #[test]
    fn promotes_and_strips() {
        let s = settings(json!({
            "provider": "csv",
            "filePath": "x.csv",
            "headerPromotions": [
                {"firstColumnIndex": "B", "lastColumnIndex": 3},
                {"firstColumnIndex": 4, "suffix": "_other"}
            ]
        }));
        let ds = normalize_headers(export(), &s).unwrap();
        assert_eq!(
            ds.columns(),
            &["Respondent ID", "Im happy", "Im sad", "Response_other"]
        );
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.cell(0, 0), Some(&Cell::Number(1.0)));
    }

    #[test]
    fn no_promotion_keeps_every_row() {
        let s = settings(json!({
            "provider": "csv",
            "filePath": "x.csv",
            "stripPunctuation": false
        }));
        let ds = normalize_headers(export(), &s).unwrap();
        assert_eq!(ds, export());
    }

    #[test]
    fn promotions_must_fit() {
        let s = settings(json!({
            "provider": "csv",
            "filePath": "x.csv",
            "headerPromotions": [{"firstColumnIndex": 3, "lastColumnIndex": "E"}]
        }));
        assert!(matches!(
            normalize_headers(export(), &s),
            Err(PrepError::HeaderPromotionOutOfRange {
                first: 3,
                last: 5,
                width: 4
            })
        ));
    }

    #[test]
    fn punctuation() {
        assert_eq!(strip_punctuation("Q1. How (much)?"), "Q1 How much");
        assert_eq!(strip_punctuation("Response_web"), "Response_web");
    }
}
