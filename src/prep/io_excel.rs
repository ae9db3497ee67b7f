use calamine::{open_workbook, DataType, Reader, Xlsx};

use survey_cleaning::builder::Builder;

use crate::prep::{config_reader::InputSettings, io_common::simplify_file_name, *};

fn read_cell(v: &DataType) -> Cell {
    match v {
        DataType::Empty => Cell::Missing,
        DataType::String(s) => Cell::parse(s),
        DataType::Float(f) | DataType::DateTime(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        // Formula errors (#N/A, #DIV/0!, ...) carry no answer.
        _ => Cell::Missing,
    }
}

fn header_name(v: &DataType) -> String {
    match read_cell(v) {
        Cell::Missing => String::new(),
        c => c.to_string(),
    }
}

fn get_range(path: &str, settings: &InputSettings) -> BPrepResult<calamine::Range<DataType>> {
    let worksheet_name_o = settings.excel_worksheet_name.clone();
    debug!(
        "read_excel_export: path: {:?} worksheet: {:?}",
        path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: worksheet_name.clone(),
            })?
            .context(OpeningExcelSnafu { path })?;
        return Ok(wrange);
    }
    let mut all_worksheets = workbook.worksheets();
    match all_worksheets.len() {
        0 => Err(Box::new(PrepError::EmptyInput {
            path: path.to_string(),
        })),
        1 => {
            let (worksheet_name, wrange) = all_worksheets.remove(0);
            debug!("read_excel_export: using the only worksheet {:?}", worksheet_name);
            Ok(wrange)
        }
        _ => Err(Box::new(PrepError::AmbiguousWorksheet {
            path: path.to_string(),
            names: all_worksheets.into_iter().map(|(n, _)| n).collect(),
        })),
    }
}

/// Reads a survey export from an Excel workbook. The first row of the
/// worksheet is the header.
pub fn read_excel_export(path: &str, settings: &InputSettings) -> BPrepResult<Dataset> {
    let wrange = get_range(path, settings)?;
    let mut rows = wrange.rows();
    let header = rows.next().context(EmptyInputSnafu { path })?;
    let columns: Vec<String> = header.iter().map(header_name).collect();
    debug!("read_excel_export: header: {:?}", columns);

    let mut builder = Builder::new(&columns);
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        builder
            .add_cells(row.iter().map(read_cell).collect())
            .context(RowShapeSnafu { path, lineno })?;
    }
    let ds = builder.build();
    info!(
        "read_excel_export: {} rows, {} columns from {}",
        ds.len(),
        ds.width(),
        simplify_file_name(std::path::Path::new(path))
    );
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_from_the_workbook() {
        assert_eq!(read_cell(&DataType::Empty), Cell::Missing);
        assert_eq!(read_cell(&DataType::String(" N/A ".to_string())), Cell::Missing);
        assert_eq!(read_cell(&DataType::String("98658412".to_string())), Cell::Number(98658412.0));
        assert_eq!(read_cell(&DataType::Int(4)), Cell::Number(4.0));
        assert_eq!(read_cell(&DataType::Float(2.5)), Cell::Number(2.5));
        assert_eq!(read_cell(&DataType::Bool(true)), Cell::Text("true".to_string()));
        assert_eq!(
            read_cell(&DataType::String("Agree a little".to_string())),
            Cell::Text("Agree a little".to_string())
        );
    }

    #[test]
    fn header_cells_are_names() {
        assert_eq!(header_name(&DataType::Empty), "");
        assert_eq!(header_name(&DataType::Float(2021.0)), "2021");
        assert_eq!(header_name(&DataType::String("Q1".to_string())), "Q1");
    }

    #[test]
    fn missing_workbook_is_named() {
        let settings = InputSettings {
            provider: "xlsx".to_string(),
            file_path: "nope.xlsx".to_string(),
            excel_worksheet_name: None,
            header_promotions: None,
            strip_punctuation: None,
        };
        let err = read_excel_export("nope.xlsx", &settings).unwrap_err();
        assert!(err.to_string().contains("nope.xlsx"));
    }
}
