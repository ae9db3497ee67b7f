// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The content of one cell of a survey export.
///
/// Survey tools mix free text answers, numeric codes and blanks in the same
/// column, so a cell keeps whichever of the three it was read as.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    /// An unanswered question or an empty field.
    Missing,
    /// Any value that could be read as a finite number.
    Number(f64),
    /// Everything else, kept verbatim.
    Text(String),
}

impl Cell {
    // Labels that spreadsheet exports use for an empty answer.
    const MISSING_LABELS: [&'static str; 6] = ["NA", "N/A", "NaN", "nan", "null", "NULL"];

    /// Interprets a raw field from an export.
    pub fn parse(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() || Cell::MISSING_LABELS.contains(&trimmed) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(x) if x.is_finite() => Cell::Number(x),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// The text label of this cell, if it holds one.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// A key usable for comparisons across cell kinds: integral numbers
    /// render without a decimal part, so that `98658412.0` and `"98658412"`
    /// are the same key. Missing cells have no key.
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            c => Some(c.to_string()),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Cell::Number(x) => write!(f, "{}", x),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

// ******** Output data structures *********

/// The respondent drawn in the raffle.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Winner {
    /// Position of the winner in the eligible dataset.
    pub row: usize,
    pub id: String,
    pub email: String,
}

/// Errors that prevent the cleaning steps from completing.
#[derive(PartialEq, Debug, Clone)]
pub enum CleaningErrors {
    /// Nobody passed the completeness filter.
    NoEligibleRespondents,
    /// Some emails appear more than once among the eligible respondents
    /// and the halting policy is active.
    DuplicateRespondents(Vec<String>),
    /// A configured column name does not exist in the dataset.
    MissingColumn(String),
    /// A `from`..`to` selection where `to` comes before `from`.
    InvalidColumnRange { from: String, to: String },
    /// The completeness fraction is outside of [0, 1].
    InvalidThreshold(f64),
    /// A configured collector id that reads as an empty value.
    InvalidCollectorId(String),
    /// A row was built with a number of cells different from the header.
    RowWidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// The reference column order and the dataset columns differ.
    SchemaMismatch {
        missing_from_reference: Vec<String>,
        missing_from_data: Vec<String>,
    },
}

impl Error for CleaningErrors {}

impl Display for CleaningErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleaningErrors::NoEligibleRespondents => {
                write!(f, "no eligible respondents: cannot select a raffle winner")
            }
            CleaningErrors::DuplicateRespondents(emails) => write!(
                f,
                "duplicate respondents present, resolve them before selecting a winner: {}",
                emails.join(", ")
            ),
            CleaningErrors::MissingColumn(name) => {
                write!(f, "expected column {:?} is absent from the data", name)
            }
            CleaningErrors::InvalidColumnRange { from, to } => write!(
                f,
                "column range is inverted: {:?} comes after {:?}",
                from, to
            ),
            CleaningErrors::InvalidThreshold(x) => write!(
                f,
                "completeness threshold must be a fraction between 0 and 1, got {}",
                x
            ),
            CleaningErrors::InvalidCollectorId(id) => write!(
                f,
                "collector id {:?} is empty or reads as a missing value",
                id
            ),
            CleaningErrors::RowWidthMismatch {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} cells, the header has {} columns",
                row, found, expected
            ),
            CleaningErrors::SchemaMismatch {
                missing_from_reference,
                missing_from_data,
            } => write!(
                f,
                "column order reference does not match the data. Not in reference: [{}]. Not in data: [{}]",
                missing_from_reference.join(", "),
                missing_from_data.join(", ")
            ),
        }
    }
}

// ********* Configuration **********

/// How the missing-cell count is compared to the threshold.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ThresholdComparison {
    /// Eligible when `missing <= threshold`.
    AtMost,
    /// Eligible when `missing < threshold`.
    LessThan,
}

/// What to do when the same email shows up more than once.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicatePolicy {
    /// Report the duplicates and keep going.
    Warn,
    /// Refuse to draw a winner while eligible duplicates exist.
    Halt,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EligibilityRules {
    /// Fraction of the columns that may be left unanswered.
    pub completeness_fraction: f64,
    pub comparison: ThresholdComparison,
    pub duplicate_policy: DuplicatePolicy,
}

impl EligibilityRules {
    pub const DEFAULT_RULES: EligibilityRules = EligibilityRules {
        completeness_fraction: 0.2,
        comparison: ThresholdComparison::AtMost,
        duplicate_policy: DuplicatePolicy::Warn,
    };

    pub fn validate(&self) -> Result<(), CleaningErrors> {
        if (0.0..=1.0).contains(&self.completeness_fraction) {
            Ok(())
        } else {
            Err(CleaningErrors::InvalidThreshold(self.completeness_fraction))
        }
    }
}

/// The two collection batches merged in one export.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Collectors {
    /// The column holding the collector id.
    pub column: String,
    pub primary: String,
    /// Absent when the export only contains one batch.
    pub secondary: Option<String>,
}

/// The columns identifying a respondent.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IdentityFields {
    pub id_column: String,
    pub email_column: String,
    /// Institutional domains removed from the emails, e.g. `@g.rit.edu`.
    pub email_domain_suffixes: Vec<String>,
}

/// Everything needed to run the raffle over a dataset.
#[derive(PartialEq, Debug, Clone)]
pub struct RaffleSetup {
    pub collectors: Collectors,
    pub identity: IdentityFields,
    /// Columns removed after the merge, typically `IP Address`.
    pub privacy_columns: Vec<String>,
    pub rules: EligibilityRules,
}
