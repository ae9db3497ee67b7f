use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use survey_cleaning::*;

use std::fs;
use std::path::{Path, PathBuf};

use text_diff::print_diff;

use crate::prep::config_reader::*;
use crate::prep::headers::normalize_headers;
use crate::prep::io_csv::{read_column_order, read_csv_export, render_csv, OutputBatch};
use crate::prep::io_excel::read_excel_export;

mod config_reader;
mod headers;
mod io_common;
mod io_csv;
mod io_excel;

#[derive(Debug, Snafu)]
pub enum PrepError {
    #[snafu(display("Error opening {path}: expected a comma-separated file in UTF-8 encoding"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display(
        "Error reading line {lineno} of {path}: expected comma-separated values in UTF-8 encoding"
    ))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error reading line {lineno} of {path}: {source}"))]
    RowShape {
        source: CleaningErrors,
        path: String,
        lineno: usize,
    },
    #[snafu(display("File {path} is empty, expected a header row"))]
    EmptyInput { path: String },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet named {worksheet}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display(
        "Excel file {path} has several worksheets {names:?}, choose one with excelWorksheetName"
    ))]
    AmbiguousWorksheet { path: String, names: Vec<String> },
    #[snafu(display("Unknown input provider {provider}, expected csv or xlsx"))]
    UnknownProvider { provider: String },
    #[snafu(display("Error reading configuration file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Expected a column number or letter, got {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Unknown scale {name}"))]
    UnknownScale { name: String },
    #[snafu(display(
        "Header promotion over columns {first}..{last} does not fit the {width} columns of the export"
    ))]
    HeaderPromotionOutOfRange {
        first: usize,
        last: usize,
        width: usize,
    },
    #[snafu(display("Error reading column order file {path}: expected a UTF-8 text file"))]
    ColumnOrderOpen {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Column order file {path} is not valid UTF-8 text"))]
    ColumnOrderEncoding {
        source: std::string::FromUtf8Error,
        path: String,
    },
    #[snafu(display("Error parsing column order file {path}"))]
    ColumnOrderParse { source: csv::Error, path: String },
    #[snafu(display("Error reading reference file {path}"))]
    ReadingReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Cleaning { source: CleaningErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PrepResult<T> = Result<T, PrepError>;

pub type BPrepResult<T> = Result<T, Box<PrepError>>;

/// Command line values that take precedence over the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunOverrides {
    pub input: Option<String>,
    pub output_directory: Option<String>,
    pub reference: Option<String>,
}

/// What a successful run produced.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PrepSummary {
    pub winner: Winner,
    pub eligible: usize,
    pub duplicate_emails: Vec<String>,
    pub written: Vec<PathBuf>,
}

fn validate_rules(config: &PrepConfig) -> PrepResult<RaffleSetup> {
    let respondents = &config.respondents;
    let res = RaffleSetup {
        collectors: Collectors {
            column: respondents
                .collector_column
                .clone()
                .unwrap_or_else(|| "Collector ID".to_string()),
            primary: respondents.primary_collector_id()?,
            secondary: respondents.secondary_collector_id()?,
        },
        identity: IdentityFields {
            id_column: respondents.id_column.clone(),
            email_column: respondents.email_column.clone(),
            email_domain_suffixes: respondents.email_domain_suffixes.clone().unwrap_or_default(),
        },
        privacy_columns: respondents
            .privacy_columns
            .clone()
            .unwrap_or_else(|| vec!["IP Address".to_string()]),
        rules: EligibilityRules {
            completeness_fraction: config
                .rules
                .completeness_threshold
                .unwrap_or(EligibilityRules::DEFAULT_RULES.completeness_fraction),
            comparison: config.rules.threshold_comparison()?,
            duplicate_policy: config.rules.duplicate_policy()?,
        },
    };
    res.rules.validate().context(CleaningSnafu {})?;
    Ok(res)
}

fn build_recode_plan(config: &PrepConfig) -> PrepResult<RecodePlan> {
    let assign = |settings: &Vec<RecodingSettings>| -> PrepResult<Vec<ScaleAssignment>> {
        settings
            .iter()
            .map(|r| -> PrepResult<ScaleAssignment> {
                Ok(ScaleAssignment {
                    columns: r.columns.selection(),
                    scale: config.scale(&r.scale)?,
                })
            })
            .collect()
    };
    Ok(RecodePlan {
        ranges: assign(&config.recodings)?,
        overrides: assign(&config.overrides)?,
    })
}

fn read_export(path: &str, settings: &InputSettings) -> BPrepResult<Dataset> {
    info!("Attempting to read survey export {:?}", path);
    match settings.provider.as_str() {
        "csv" => read_csv_export(path),
        "xlsx" => read_excel_export(path, settings),
        x => Err(Box::new(PrepError::UnknownProvider {
            provider: x.to_string(),
        })),
    }
}

// Relative paths in the configuration are relative to the configuration file.
fn resolve_path(root: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn check_reference(formatted: &Dataset, reference_path: &str) -> PrepResult<()> {
    let generated = render_csv(formatted)?;
    let reference = fs::read_to_string(reference_path).context(ReadingReferenceSnafu {
        path: reference_path,
    })?;
    let reference = reference.replace("\r\n", "\n");
    if reference.trim_end() != generated.trim_end() {
        warn!("Found differences with the reference file {}", reference_path);
        print_diff(reference.as_str(), generated.as_str(), "\n");
        whatever!("Difference detected between the formatted data and the reference file")
    }
    info!("Formatted data matches the reference file {}", reference_path);
    Ok(())
}

/// Runs the whole preparation: reading, raffle, recoding, reordering and
/// writing.
///
/// Every step that can fail runs before the first output file is written.
pub fn run_preparation(config_path: &str, overrides: &RunOverrides) -> BPrepResult<PrepSummary> {
    let config = read_config(config_path)?;
    info!("config: {:?}", config);

    let setup = validate_rules(&config)?;
    let plan = build_recode_plan(&config)?;

    let root = Path::new(config_path)
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let input_path = match &overrides.input {
        Some(p) => PathBuf::from(p),
        None => resolve_path(&root, &config.input_settings.file_path),
    };
    let raw = read_export(&input_path.display().to_string(), &config.input_settings)?;
    let export = normalize_headers(raw, &config.input_settings)?;
    debug!("run_preparation: columns {:?}", export.columns());

    let outcome = run_raffle(&export, &setup, &mut rand::thread_rng()).context(CleaningSnafu {})?;

    let mut formatted = outcome.merged.clone();
    recode(&mut formatted, &plan).context(CleaningSnafu {})?;
    let formatted = match &config.output_settings.column_order_path {
        Some(p) => {
            let order = read_column_order(&resolve_path(&root, p).display().to_string())?;
            reorder_columns(&formatted, &order).context(CleaningSnafu {})?
        }
        None => {
            info!("No column order file configured, keeping the export order");
            formatted
        }
    };

    if let Some(reference) = &overrides.reference {
        check_reference(&formatted, reference)?;
    }

    let out_dir = match (
        &overrides.output_directory,
        &config.output_settings.output_directory,
    ) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => resolve_path(&root, p),
        (None, None) => root.clone(),
    };
    let settings = &config.output_settings;
    let duplicates = outcome.duplicates.table(&outcome.merged);
    let mut batch = OutputBatch::new(&out_dir)?;
    batch.stage(&outcome.eligible, &settings.eligible_file_name())?;
    match &duplicates {
        Some(dups) => batch.stage(dups, &settings.duplicates_file_name())?,
        None => batch.remove_stale(&settings.duplicates_file_name()),
    }
    batch.stage(&formatted, &settings.formatted_file_name())?;
    let written = batch.commit()?;

    let duplicate_emails = outcome.duplicates.emails();
    if duplicate_emails.is_empty() {
        println!("No duplicate entries");
    }
    for email in duplicate_emails.iter() {
        println!("Warning duplicate: {}", email);
    }
    println!(
        "Raffle Winner: {} {}",
        outcome.winner.id, outcome.winner.email
    );

    Ok(PrepSummary {
        winner: outcome.winner,
        eligible: outcome.eligible.len(),
        duplicate_emails,
        written,
    })
}
