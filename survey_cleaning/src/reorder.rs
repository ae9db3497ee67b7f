use log::debug;
use std::collections::HashMap;

use crate::config::*;
use crate::dataset::Dataset;

/// Reorders the columns of a dataset to follow a reference order.
///
/// The operation is a permutation: both sides must hold the same column
/// names, with the same multiplicities. Otherwise nothing is dropped or
/// padded, and the error lists every name that does not line up.
pub fn reorder_columns(ds: &Dataset, order: &[String]) -> Result<Dataset, CleaningErrors> {
    // name -> positions in the dataset, consumed in order
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, c) in ds.columns().iter().enumerate().rev() {
        positions.entry(c.as_str()).or_default().push(idx);
    }

    let mut permutation: Vec<usize> = Vec::with_capacity(order.len());
    let mut missing_from_data: Vec<String> = Vec::new();
    for name in order {
        match positions.get_mut(name.as_str()).and_then(|v| v.pop()) {
            Some(idx) => permutation.push(idx),
            None => missing_from_data.push(name.clone()),
        }
    }
    let mut missing_from_reference: Vec<String> = positions
        .into_iter()
        .flat_map(|(_, v)| v.into_iter())
        .map(|idx| ds.columns()[idx].clone())
        .collect();
    missing_from_reference.sort();

    if !missing_from_reference.is_empty() || !missing_from_data.is_empty() {
        return Err(CleaningErrors::SchemaMismatch {
            missing_from_reference,
            missing_from_data,
        });
    }
    debug!("reorder_columns: permutation {:?}", permutation);
    Ok(ds.select_columns(&permutation))
}
