use crate::prep::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::collections::HashMap;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct HeaderPromotion {
    #[serde(rename = "firstColumnIndex")]
    _first_column_index: Option<JSValue>,
    #[serde(rename = "lastColumnIndex")]
    _last_column_index: Option<JSValue>,
    pub suffix: Option<String>,
}

impl HeaderPromotion {
    /// 0-based position of the first promoted column.
    pub fn first_column_index(&self) -> PrepResult<usize> {
        read_js_int(&self._first_column_index).map(|x| x - 1)
    }

    /// 0-based position of the last promoted column. Defaults to the first
    /// one when not given.
    pub fn last_column_index(&self) -> PrepResult<usize> {
        if self._last_column_index.is_some() {
            read_js_int(&self._last_column_index).map(|x| x - 1)
        } else {
            self.first_column_index()
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "headerPromotions")]
    pub header_promotions: Option<Vec<HeaderPromotion>>,
    #[serde(rename = "stripPunctuation")]
    pub strip_punctuation: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "eligibleFileName")]
    pub eligible_file_name: Option<String>,
    #[serde(rename = "duplicatesFileName")]
    pub duplicates_file_name: Option<String>,
    #[serde(rename = "formattedFileName")]
    pub formatted_file_name: Option<String>,
    #[serde(rename = "columnOrderPath")]
    pub column_order_path: Option<String>,
}

impl OutputSettings {
    pub fn eligible_file_name(&self) -> String {
        self.eligible_file_name
            .clone()
            .unwrap_or_else(|| "Eligible-Participants.csv".to_string())
    }

    pub fn duplicates_file_name(&self) -> String {
        self.duplicates_file_name
            .clone()
            .unwrap_or_else(|| "Duplicate-Entries.csv".to_string())
    }

    pub fn formatted_file_name(&self) -> String {
        self.formatted_file_name
            .clone()
            .unwrap_or_else(|| "Formatted-Data.csv".to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RespondentSettings {
    #[serde(rename = "collectorColumn")]
    pub collector_column: Option<String>,
    #[serde(rename = "primaryCollectorId")]
    _primary_collector_id: JSValue,
    #[serde(rename = "secondaryCollectorId")]
    _secondary_collector_id: Option<JSValue>,
    #[serde(rename = "idColumn")]
    pub id_column: String,
    #[serde(rename = "emailColumn")]
    pub email_column: String,
    #[serde(rename = "emailDomainSuffixes")]
    pub email_domain_suffixes: Option<Vec<String>>,
    #[serde(rename = "privacyColumns")]
    pub privacy_columns: Option<Vec<String>>,
}

impl RespondentSettings {
    pub fn primary_collector_id(&self) -> PrepResult<String> {
        read_js_string(&self._primary_collector_id)
    }

    pub fn secondary_collector_id(&self) -> PrepResult<Option<String>> {
        match &self._secondary_collector_id {
            None | Some(JSValue::Null) => Ok(None),
            Some(x) => read_js_string(x).map(Some),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrepRules {
    #[serde(rename = "completenessThreshold")]
    pub completeness_threshold: Option<f64>,
    #[serde(rename = "thresholdComparison")]
    pub _threshold_comparison: Option<String>,
    #[serde(rename = "duplicatePolicy")]
    pub _duplicate_policy: Option<String>,
}

impl PrepRules {
    pub fn threshold_comparison(&self) -> PrepResult<ThresholdComparison> {
        match self._threshold_comparison.as_deref() {
            None | Some("atMost") => Ok(ThresholdComparison::AtMost),
            Some("lessThan") => Ok(ThresholdComparison::LessThan),
            Some(x) => whatever!(
                "unknown threshold comparison {:?}, expected atMost or lessThan",
                x
            ),
        }
    }

    pub fn duplicate_policy(&self) -> PrepResult<DuplicatePolicy> {
        match self._duplicate_policy.as_deref() {
            None | Some("warn") => Ok(DuplicatePolicy::Warn),
            Some("halt") => Ok(DuplicatePolicy::Halt),
            Some(x) => whatever!("unknown duplicate policy {:?}, expected warn or halt", x),
        }
    }
}

/// Either a list of column names or an inclusive span of columns.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnsSettings {
    Named(Vec<String>),
    Span {
        from: String,
        to: String,
        except: Option<Vec<String>>,
    },
}

impl ColumnsSettings {
    pub fn selection(&self) -> ColumnSelection {
        match self {
            ColumnsSettings::Named(names) => ColumnSelection::Named(names.clone()),
            ColumnsSettings::Span { from, to, except } => ColumnSelection::Span {
                from: from.clone(),
                to: to.clone(),
                except: except.clone().unwrap_or_default(),
            },
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RecodingSettings {
    pub scale: String,
    pub columns: ColumnsSettings,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    #[serde(rename = "inputSettings")]
    pub input_settings: InputSettings,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    pub respondents: RespondentSettings,
    #[serde(default)]
    pub rules: PrepRules,
    /// Extra scales, by name: label -> code.
    pub scales: Option<HashMap<String, HashMap<String, i64>>>,
    #[serde(default)]
    pub recodings: Vec<RecodingSettings>,
    #[serde(default)]
    pub overrides: Vec<RecodingSettings>,
}

impl PrepConfig {
    /// Finds a scale among the configured ones first, then the built-in ones.
    pub fn scale(&self, name: &str) -> PrepResult<ScaleMapping> {
        if let Some(labels) = self.scales.as_ref().and_then(|s| s.get(name)) {
            return Ok(ScaleMapping::from_map(labels.clone()));
        }
        ScaleMapping::builtin(name).context(UnknownScaleSnafu { name })
    }
}

pub fn read_config(path: &str) -> PrepResult<PrepConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: {} bytes from {:?}", contents.len(), path);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Reads a 1-based column position, either as a number or as an Excel
/// column name ("A", "AQ", ...).
fn read_js_int(x: &Option<JSValue>) -> PrepResult<usize> {
    let res = match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_uppercase().bytes().try_fold(0usize, |acc, b| {
                acc.checked_mul(26)
                    .and_then(|a| a.checked_add((b - b'A' + 1) as usize))
            })
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok(),
        _ => None,
    };
    match res {
        Some(x) if x >= 1 => Ok(x),
        _ => Err(PrepError::ParsingJsonNumber {
            value: format!("{:?}", x),
        }),
    }
}

fn read_js_string(x: &JSValue) -> PrepResult<String> {
    match x {
        JSValue::Number(n) => Ok(n.to_string()),
        JSValue::String(s) => Ok(s.clone()),
        _ => Err(PrepError::ParsingJsonNumber {
            value: x.to_string(),
        }),
    }
}
