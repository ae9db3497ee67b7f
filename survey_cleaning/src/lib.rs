mod config;
mod dataset;

pub mod builder;
pub mod manual;
pub mod recode;
pub mod reorder;

use log::{debug, info, warn};
use rand::Rng;
use std::collections::BTreeMap;

pub use crate::config::*;
pub use crate::dataset::Dataset;
pub use crate::recode::{recode, ColumnSelection, RecodePlan, ScaleAssignment, ScaleMapping};
pub use crate::reorder::reorder_columns;

/// The column added to the eligible respondents, holding their number of
/// unanswered questions.
pub const INCOMPLETE_COLUMN: &str = "Total Incomplete Answers";

/// The rows of an export, split by collector.
///
/// Both datasets keep the columns of the export they come from.
#[derive(PartialEq, Debug, Clone)]
pub struct Batches {
    pub primary: Dataset,
    pub secondary: Option<Dataset>,
    /// Rows that belong to neither collector.
    pub discarded: usize,
}

/// The rows sharing one email.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DuplicateGroup {
    pub email: String,
    /// Positions in the dataset the report was computed on.
    pub rows: Vec<usize>,
}

/// The outcome of looking for respondents who answered more than once.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DuplicateReport {
    NoDuplicates,
    /// Groups ordered by email.
    Found(Vec<DuplicateGroup>),
}

impl DuplicateReport {
    pub fn emails(&self) -> Vec<String> {
        match self {
            DuplicateReport::NoDuplicates => Vec::new(),
            DuplicateReport::Found(groups) => groups.iter().map(|g| g.email.clone()).collect(),
        }
    }

    /// All the rows of all the groups, group after group.
    pub fn table(&self, ds: &Dataset) -> Option<Dataset> {
        match self {
            DuplicateReport::NoDuplicates => None,
            DuplicateReport::Found(groups) => {
                let rows: Vec<usize> = groups.iter().flat_map(|g| g.rows.clone()).collect();
                Some(ds.take_rows(&rows))
            }
        }
    }
}

/// Everything produced by a raffle.
#[derive(PartialEq, Debug, Clone)]
pub struct RaffleOutcome {
    /// Both batches merged, emails normalized, before any filtering.
    pub merged: Dataset,
    /// The respondents who could win, with their incomplete answer count.
    pub eligible: Dataset,
    /// Duplicates found in `merged`.
    pub duplicates: DuplicateReport,
    pub winner: Winner,
    pub discarded_rows: usize,
}

/// Splits the rows between the two collectors.
pub fn partition_batches(ds: &Dataset, collectors: &Collectors) -> Result<Batches, CleaningErrors> {
    let col = ds.require_column(&collectors.column)?;
    // Compare on the same rendering as the cells.
    let collector_key = |id: &String| {
        Cell::parse(id)
            .key()
            .ok_or_else(|| CleaningErrors::InvalidCollectorId(id.clone()))
    };
    let primary = Some(collector_key(&collectors.primary)?);
    let secondary = match collectors.secondary.as_ref() {
        Some(id) => Some(collector_key(id)?),
        None => None,
    };

    let mut primary_rows: Vec<usize> = Vec::new();
    let mut secondary_rows: Vec<usize> = Vec::new();
    let mut discarded: usize = 0;
    for (idx, row) in ds.rows().iter().enumerate() {
        let key = row[col].key();
        if key.is_some() && key == primary {
            primary_rows.push(idx);
        } else if key.is_some() && key == secondary {
            secondary_rows.push(idx);
        } else {
            discarded += 1;
        }
    }
    info!(
        "partition_batches: {} rows for collector {}, {} rows for collector {:?}, {} rows discarded",
        primary_rows.len(),
        collectors.primary,
        secondary_rows.len(),
        collectors.secondary,
        discarded
    );
    Ok(Batches {
        primary: ds.take_rows(&primary_rows),
        secondary: secondary.map(|_| ds.take_rows(&secondary_rows)),
        discarded,
    })
}

/// Concatenates the batches, primary rows first.
///
/// Each batch drops the columns that none of its rows answered. A column
/// that survives in one batch only is kept, with missing cells for the
/// rows of the other batch.
pub fn merge_batches(batches: Batches) -> Dataset {
    let mut keep = batches.primary.non_empty_columns();
    if let Some(b) = batches.secondary.as_ref() {
        keep.extend(b.non_empty_columns());
    }
    let mut cols: Vec<usize> = keep.into_iter().collect();
    cols.sort_unstable();
    info!(
        "merge_batches: keeping {} columns out of {}",
        cols.len(),
        batches.primary.width()
    );

    let mut merged = batches.primary.select_columns(&cols);
    if let Some(b) = batches.secondary {
        for row in b.select_columns(&cols).rows() {
            // Same column list on both sides, the width always matches.
            if let Err(e) = merged.push_row(row.clone()) {
                warn!("merge_batches: skipping row: {}", e);
            }
        }
    }
    merged
}

/// Removes the listed columns when they are present.
pub fn drop_privacy_columns(ds: &mut Dataset, names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|n| ds.drop_column(n))
        .cloned()
        .collect()
}

/// Lower-cases an email and removes the institutional domains from it.
pub fn normalize_email(email: &str, suffixes: &[String]) -> String {
    let mut res = email.trim().to_lowercase();
    for suffix in suffixes {
        if let Some(stripped) = res.strip_suffix(&suffix.to_lowercase()) {
            res = stripped.to_string();
        }
    }
    res
}

pub fn normalize_emails(ds: &mut Dataset, identity: &IdentityFields) -> Result<(), CleaningErrors> {
    let col = ds.require_column(&identity.email_column)?;
    ds.map_column(col, |c| match c {
        Cell::Text(s) => Cell::Text(normalize_email(s, &identity.email_domain_suffixes)),
        other => other.clone(),
    });
    Ok(())
}

/// Groups the rows by email. Rows without an email are never duplicates.
pub fn find_duplicates(ds: &Dataset, email_column: &str) -> Result<DuplicateReport, CleaningErrors> {
    let col = ds.require_column(email_column)?;
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, row) in ds.rows().iter().enumerate() {
        if let Some(email) = row[col].key() {
            groups.entry(email).or_default().push(idx);
        }
    }
    let dups: Vec<DuplicateGroup> = groups
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(email, rows)| DuplicateGroup { email, rows })
        .collect();
    debug!("find_duplicates: {:?}", dups);
    if dups.is_empty() {
        Ok(DuplicateReport::NoDuplicates)
    } else {
        Ok(DuplicateReport::Found(dups))
    }
}

/// The number of unanswered cells of each row.
pub fn missing_counts(ds: &Dataset) -> Vec<usize> {
    ds.rows()
        .iter()
        .map(|r| r.iter().filter(|c| c.is_missing()).count())
        .collect()
}

/// The largest number of missing cells tolerated for a table this wide.
pub fn completeness_threshold(width: usize, fraction: f64) -> f64 {
    width as f64 * fraction
}

pub fn is_eligible(missing: usize, threshold: f64, comparison: ThresholdComparison) -> bool {
    let m = missing as f64;
    match comparison {
        ThresholdComparison::AtMost => m <= threshold,
        ThresholdComparison::LessThan => m < threshold,
    }
}

/// Keeps the respondents who answered enough questions.
///
/// The threshold is computed over the columns of `ds`, before the
/// incomplete answer count is appended to the result.
pub fn filter_eligible(ds: &Dataset, rules: &EligibilityRules) -> Result<Dataset, CleaningErrors> {
    rules.validate()?;
    let threshold = completeness_threshold(ds.width(), rules.completeness_fraction);
    let counts = missing_counts(ds);
    let kept: Vec<usize> = counts
        .iter()
        .enumerate()
        .filter(|(_, m)| is_eligible(**m, threshold, rules.comparison))
        .map(|(idx, _)| idx)
        .collect();
    info!(
        "filter_eligible: {} of {} respondents within {} missing answers ({:?})",
        kept.len(),
        ds.len(),
        threshold,
        rules.comparison
    );
    let mut eligible = ds.take_rows(&kept);
    eligible.add_column(
        INCOMPLETE_COLUMN.to_string(),
        kept.iter().map(|idx| Cell::Number(counts[*idx] as f64)).collect(),
    );
    Ok(eligible)
}

/// Draws one respondent uniformly among the rows of `eligible`.
pub fn draw_winner<R: Rng>(
    eligible: &Dataset,
    identity: &IdentityFields,
    rng: &mut R,
) -> Result<Winner, CleaningErrors> {
    let id_col = eligible.require_column(&identity.id_column)?;
    let email_col = eligible.require_column(&identity.email_column)?;
    if eligible.is_empty() {
        return Err(CleaningErrors::NoEligibleRespondents);
    }
    let row = rng.gen_range(0..eligible.len());
    let render = |col: usize| eligible.cell(row, col).map(|c| c.to_string()).unwrap_or_default();
    Ok(Winner {
        row,
        id: render(id_col),
        email: render(email_col),
    })
}

/// Runs the whole selection over a cleaned export.
///
/// Arguments:
/// * `ds` the export, with its final column names
/// * `setup` the collectors, identity columns and eligibility rules
/// * `rng` the source of randomness for the draw
pub fn run_raffle<R: Rng>(
    ds: &Dataset,
    setup: &RaffleSetup,
    rng: &mut R,
) -> Result<RaffleOutcome, CleaningErrors> {
    info!(
        "run_raffle: processing {} rows, rules: {:?}",
        ds.len(),
        setup.rules
    );
    setup.rules.validate()?;

    let batches = partition_batches(ds, &setup.collectors)?;
    let discarded_rows = batches.discarded;
    let mut merged = merge_batches(batches);
    let dropped = drop_privacy_columns(&mut merged, &setup.privacy_columns);
    debug!("run_raffle: dropped columns {:?}", dropped);
    normalize_emails(&mut merged, &setup.identity)?;

    let duplicates = find_duplicates(&merged, &setup.identity.email_column)?;
    match &duplicates {
        DuplicateReport::NoDuplicates => info!("run_raffle: no duplicate entries"),
        DuplicateReport::Found(groups) => {
            for g in groups {
                warn!("Duplicate respondent: {} (rows {:?})", g.email, g.rows);
            }
        }
    }

    let eligible = filter_eligible(&merged, &setup.rules)?;

    if setup.rules.duplicate_policy == DuplicatePolicy::Halt {
        let eligible_dups = find_duplicates(&eligible, &setup.identity.email_column)?;
        if let DuplicateReport::Found(_) = eligible_dups {
            return Err(CleaningErrors::DuplicateRespondents(eligible_dups.emails()));
        }
    }

    let winner = draw_winner(&eligible, &setup.identity, rng)?;
    info!("run_raffle: winner {:?}", winner);
    Ok(RaffleOutcome {
        merged,
        eligible,
        duplicates,
        winner,
        discarded_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn setup(policy: DuplicatePolicy) -> RaffleSetup {
        RaffleSetup {
            collectors: Collectors {
                column: "Collector ID".to_string(),
                primary: "98658412".to_string(),
                secondary: Some("98658411".to_string()),
            },
            identity: IdentityFields {
                id_column: "Respondent ID".to_string(),
                email_column: "Email".to_string(),
                email_domain_suffixes: names(&["@rit.edu", "@g.rit.edu"]),
            },
            privacy_columns: names(&["IP Address"]),
            rules: EligibilityRules {
                duplicate_policy: policy,
                ..EligibilityRules::DEFAULT_RULES
            },
        }
    }

    // Merged, without the IP address and the column nobody answered, the
    // export has 9 columns: at 20% a respondent may skip 1 of them.
    fn export() -> Dataset {
        let mut b = builder::Builder::new(&names(&[
            "Respondent ID",
            "Collector ID",
            "Email",
            "IP Address",
            "Q1",
            "Q2",
            "Q3",
            "Q4",
            "Q5",
            "Only A",
            "Nobody",
        ]));
        let rows: Vec<Vec<&str>> = vec![
            vec!["1", "98658412", "Ann@RIT.edu", "10.0.0.1", "Yes", "No", "Yes", "No", "Yes", "x", ""],
            vec!["2", "98658412", "bob@g.rit.edu", "10.0.0.2", "Yes", "", "", "", "No", "", ""],
            vec!["3", "98658411", "ann@rit.edu", "10.0.0.3", "No", "No", "Yes", "No", "Yes", "", ""],
            vec!["4", "11111111", "eve@rit.edu", "10.0.0.4", "No", "No", "Yes", "No", "No", "", ""],
            vec!["5", "98658411", "cy@rit.edu", "10.0.0.5", "No", "No", "No", "No", "No", "", ""],
        ];
        for r in rows {
            b.add_record(r.as_slice()).unwrap();
        }
        b.build()
    }

    #[test]
    fn partition_and_merge_keep_every_batch_row() {
        init();
        let ds = export();
        let batches = partition_batches(&ds, &setup(DuplicatePolicy::Warn).collectors).unwrap();
        assert_eq!(batches.discarded, 1);
        let a = batches.primary.len();
        let b = batches.secondary.as_ref().map(|b| b.len()).unwrap_or(0);
        assert_eq!((a, b), (2, 2));
        let merged = merge_batches(batches);
        assert_eq!(merged.len(), a + b);
        // Empty in both batches: dropped. Empty only in B: kept.
        assert_eq!(merged.column_index("Nobody"), None);
        let only_a = merged.require_column("Only A").unwrap();
        assert_eq!(merged.cell(0, only_a), Some(&Cell::Text("x".to_string())));
        assert_eq!(merged.cell(2, only_a), Some(&Cell::Missing));
        // Primary rows first.
        let ids: Vec<String> = merged.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(ids, names(&["1", "2", "3", "5"]));
    }

    #[test]
    fn single_batch_mode() {
        let ds = export();
        let mut collectors = setup(DuplicatePolicy::Warn).collectors;
        collectors.secondary = None;
        let batches = partition_batches(&ds, &collectors).unwrap();
        assert_eq!(batches.secondary, None);
        assert_eq!(batches.discarded, 3);
        assert_eq!(merge_batches(batches).len(), 2);
    }

    #[test]
    fn blank_collector_ids_are_rejected() {
        let ds = export();
        let mut collectors = setup(DuplicatePolicy::Warn).collectors;
        collectors.secondary = Some("NA".to_string());
        assert_eq!(
            partition_batches(&ds, &collectors),
            Err(CleaningErrors::InvalidCollectorId("NA".to_string()))
        );
        collectors.secondary = None;
        collectors.primary = " ".to_string();
        assert_eq!(
            partition_batches(&ds, &collectors),
            Err(CleaningErrors::InvalidCollectorId(" ".to_string()))
        );
    }

    #[test]
    fn emails_are_normalized() {
        let suffixes = names(&["@rit.edu", "@g.rit.edu"]);
        assert_eq!(normalize_email(" Ann@RIT.edu", &suffixes), "ann");
        assert_eq!(normalize_email("bob@g.rit.edu", &suffixes), "bob");
        assert_eq!(normalize_email("zed@example.com", &suffixes), "zed@example.com");
    }

    #[test]
    fn duplicates_are_reported_not_hidden() {
        let mut ds = export();
        normalize_emails(&mut ds, &setup(DuplicatePolicy::Warn).identity).unwrap();
        let report = find_duplicates(&ds, "Email").unwrap();
        assert_eq!(
            report,
            DuplicateReport::Found(vec![DuplicateGroup {
                email: "ann".to_string(),
                rows: vec![0, 2],
            }])
        );
        assert_eq!(report.table(&ds).map(|t| t.len()), Some(2));

        let unique = ds.take_rows(&[0, 1]);
        assert_eq!(
            find_duplicates(&unique, "Email").unwrap(),
            DuplicateReport::NoDuplicates
        );
        assert_eq!(
            find_duplicates(&unique, "E-mail"),
            Err(CleaningErrors::MissingColumn("E-mail".to_string()))
        );
    }

    #[test]
    fn missing_count_grows_with_missing_cells() {
        let ds = export();
        let before = missing_counts(&ds);
        let mut more = ds.clone();
        more.map_column(4, |_| Cell::Missing);
        let after = missing_counts(&more);
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(a >= b);
        }
        assert_eq!(before[0], 1);
        assert_eq!(after[0], 2);
    }

    #[test]
    fn threshold_comparison_modes() {
        assert!(is_eligible(2, 2.0, ThresholdComparison::AtMost));
        assert!(!is_eligible(2, 2.0, ThresholdComparison::LessThan));
        assert!(is_eligible(1, 2.0, ThresholdComparison::LessThan));
        assert_eq!(completeness_threshold(10, 0.2), 2.0);
    }

    #[test]
    fn eligible_rows_carry_their_incomplete_count() {
        let ds = Dataset::from_rows(
            names(&["a", "b", "c", "d", "e"]),
            vec![
                vec![Cell::parse("1"), Cell::parse("x"), Cell::parse("x"), Cell::parse("x"), Cell::parse("x")],
                vec![Cell::parse("2"), Cell::Missing, Cell::parse("x"), Cell::parse("x"), Cell::parse("x")],
                vec![Cell::parse("3"), Cell::Missing, Cell::Missing, Cell::parse("x"), Cell::parse("x")],
            ],
        )
        .unwrap();
        // 5 columns * 0.2 = 1 missing cell allowed
        let eligible = filter_eligible(&ds, &EligibilityRules::DEFAULT_RULES).unwrap();
        assert_eq!(eligible.len(), 2);
        let col = eligible.require_column(INCOMPLETE_COLUMN).unwrap();
        assert_eq!(eligible.cell(1, col), Some(&Cell::Number(1.0)));

        let strict = EligibilityRules {
            comparison: ThresholdComparison::LessThan,
            ..EligibilityRules::DEFAULT_RULES
        };
        assert_eq!(filter_eligible(&ds, &strict).unwrap().len(), 1);

        let invalid = EligibilityRules {
            completeness_fraction: 1.5,
            ..EligibilityRules::DEFAULT_RULES
        };
        assert_eq!(
            filter_eligible(&ds, &invalid),
            Err(CleaningErrors::InvalidThreshold(1.5))
        );
    }

    #[test]
    fn empty_pool_fails_cleanly() {
        let ds = Dataset::new(names(&["Respondent ID", "Email"]));
        let mut rng = StdRng::seed_from_u64(3);
        let res = draw_winner(&ds, &setup(DuplicatePolicy::Warn).identity, &mut rng);
        assert_eq!(res, Err(CleaningErrors::NoEligibleRespondents));
    }

    #[test]
    fn winner_is_always_eligible() {
        init();
        let ds = export();
        let s = setup(DuplicatePolicy::Warn);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = run_raffle(&ds, &s, &mut rng).unwrap();
            // Respondent 2 skipped 4 questions, respondent 4 is from another collector.
            assert_ne!(outcome.winner.id, "2");
            assert_ne!(outcome.winner.id, "4");
            assert!(outcome.winner.row < outcome.eligible.len());
        }
    }

    #[test]
    fn every_eligible_respondent_can_win() {
        let ds = export();
        let s = setup(DuplicatePolicy::Warn);
        let mut seen: Vec<String> = Vec::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let w = run_raffle(&ds, &s, &mut rng).unwrap().winner;
            if !seen.contains(&w.id) {
                seen.push(w.id);
            }
        }
        seen.sort();
        assert_eq!(seen, names(&["1", "3", "5"]));
    }

    #[test]
    fn halting_policy_blocks_the_draw() {
        let ds = export();
        let mut rng = StdRng::seed_from_u64(7);
        let res = run_raffle(&ds, &setup(DuplicatePolicy::Halt), &mut rng);
        assert_eq!(
            res,
            Err(CleaningErrors::DuplicateRespondents(names(&["ann"])))
        );
    }

    #[test]
    fn warn_policy_reports_and_continues() {
        let ds = export();
        let mut rng = StdRng::seed_from_u64(7);
        let outcome = run_raffle(&ds, &setup(DuplicatePolicy::Warn), &mut rng).unwrap();
        assert_eq!(outcome.duplicates.emails(), names(&["ann"]));
        assert_eq!(outcome.discarded_rows, 1);
        assert_eq!(outcome.merged.column_index("IP Address"), None);
        assert_eq!(outcome.eligible.len(), 3);
    }
}
