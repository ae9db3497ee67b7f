//! Turning categorical answers into numeric codes.

use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::config::*;
use crate::dataset::Dataset;

/// A fixed label to code mapping.
///
/// The mapping is only defined over its own labels: any other cell (another
/// label, a number, a missing value) is left untouched.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ScaleMapping {
    labels: HashMap<String, i64>,
}

impl ScaleMapping {
    pub fn new(entries: &[(&str, i64)]) -> ScaleMapping {
        ScaleMapping {
            labels: entries.iter().map(|(l, c)| (l.to_string(), *c)).collect(),
        }
    }

    pub fn from_map(labels: HashMap<String, i64>) -> ScaleMapping {
        ScaleMapping { labels }
    }

    pub fn get(&self, label: &str) -> Option<i64> {
        self.labels.get(label).cloned()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn recode(&self, cell: &Cell) -> Cell {
        match cell.as_label().and_then(|l| self.get(l)) {
            Some(code) => Cell::Number(code as f64),
            None => cell.clone(),
        }
    }

    /// Six point agreement scale.
    pub fn likert() -> ScaleMapping {
        ScaleMapping::new(&[
            ("Agree very much", 6),
            ("Agree pretty much", 5),
            ("Agree a little", 4),
            ("Disagree a little", 3),
            ("Disagree pretty much", 2),
            ("Disagree very much", 1),
        ])
    }

    /// The agreement scale for negatively worded statements.
    pub fn likert_reverse() -> ScaleMapping {
        ScaleMapping::new(&[
            ("Agree very much", 1),
            ("Agree pretty much", 2),
            ("Agree a little", 3),
            ("Disagree a little", 4),
            ("Disagree pretty much", 5),
            ("Disagree very much", 6),
        ])
    }

    pub fn experience() -> ScaleMapping {
        ScaleMapping::new(&[
            ("I have personal experience with this", 2),
            ("I have knowledge of this", 1),
        ])
    }

    pub fn software() -> ScaleMapping {
        ScaleMapping::new(&[
            ("I have heard or read about this", 1),
            ("I have done this before", 2),
        ])
    }

    /// Both spellings of the second statement were used by the instrument
    /// over time.
    pub fn web_accessibility() -> ScaleMapping {
        ScaleMapping::new(&[
            ("I’m familiar with this issue", 1),
            ("I have taken this issue into account to make the site more accessible for people with disabilities", 2),
            ("I have taken this issue into account to make it more accessible for people with disabilities", 2),
        ])
    }

    pub fn boolean() -> ScaleMapping {
        ScaleMapping::new(&[("Yes", 1), ("No", 0)])
    }

    /// Looks up one of the scales above by its configuration name.
    pub fn builtin(name: &str) -> Option<ScaleMapping> {
        match name {
            "likert" => Some(ScaleMapping::likert()),
            "likertReverse" => Some(ScaleMapping::likert_reverse()),
            "experience" => Some(ScaleMapping::experience()),
            "software" => Some(ScaleMapping::software()),
            "webAccessibility" => Some(ScaleMapping::web_accessibility()),
            "boolean" => Some(ScaleMapping::boolean()),
            _ => None,
        }
    }
}

/// A set of columns, addressed by name.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ColumnSelection {
    /// Exactly these columns.
    Named(Vec<String>),
    /// All the columns from `from` to `to` inclusive, in dataset order,
    /// except the ones listed.
    Span {
        from: String,
        to: String,
        except: Vec<String>,
    },
}

impl ColumnSelection {
    /// Resolves the names to positions in the dataset.
    pub fn resolve(&self, ds: &Dataset) -> Result<Vec<usize>, CleaningErrors> {
        match self {
            ColumnSelection::Named(names) => names.iter().map(|n| ds.require_column(n)).collect(),
            ColumnSelection::Span { from, to, except } => {
                let start = ds.require_column(from)?;
                let end = ds.require_column(to)?;
                if end < start {
                    return Err(CleaningErrors::InvalidColumnRange {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
                let excluded: Vec<usize> = except
                    .iter()
                    .map(|n| ds.require_column(n))
                    .collect::<Result<Vec<usize>, CleaningErrors>>()?;
                Ok((start..=end).filter(|c| !excluded.contains(c)).collect())
            }
        }
    }
}

/// One recoding pass.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScaleAssignment {
    pub columns: ColumnSelection,
    pub scale: ScaleMapping,
}

/// The passes to run over a dataset.
///
/// The `ranges` run first, in order. The `overrides` run afterwards and so
/// take precedence on the columns they name.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RecodePlan {
    pub ranges: Vec<ScaleAssignment>,
    pub overrides: Vec<ScaleAssignment>,
}

/// Recodes the dataset in place.
///
/// All the selections are resolved before any cell is touched, so a bad
/// column name leaves the dataset as it was. A column named by an override
/// is skipped by the range passes: it is only ever recoded from its
/// original labels, with the override scale.
pub fn recode(ds: &mut Dataset, plan: &RecodePlan) -> Result<(), CleaningErrors> {
    let mut overridden: Vec<(Vec<usize>, &ScaleMapping)> = Vec::new();
    for assignment in plan.overrides.iter() {
        let cols = assignment.columns.resolve(ds)?;
        overridden.push((cols, &assignment.scale));
    }
    let override_cols: HashSet<usize> = overridden
        .iter()
        .flat_map(|(cols, _)| cols.iter().cloned())
        .collect();

    let mut resolved: Vec<(Vec<usize>, &ScaleMapping)> = Vec::new();
    for assignment in plan.ranges.iter() {
        let cols: Vec<usize> = assignment
            .columns
            .resolve(ds)?
            .into_iter()
            .filter(|c| !override_cols.contains(c))
            .collect();
        resolved.push((cols, &assignment.scale));
    }
    resolved.extend(overridden);
    info!(
        "recode: applying {} range passes and {} overrides",
        plan.ranges.len(),
        plan.overrides.len()
    );
    for (cols, scale) in resolved {
        debug!("recode: columns {:?} with {} labels", cols, scale.len());
        for col in cols {
            ds.map_column(col, |c| scale.recode(c));
        }
    }
    Ok(())
}
