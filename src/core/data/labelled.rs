use faer::{Mat, MatRef};
use std::collections::HashMap;

use crate::ensure_dim;
use crate::error::{HotspotError, Result};

/// Dense matrix with row and column labels
///
/// Stands in for the labelled tables the hotspot workflow passes around: the
/// coordinates (samples x features) and the expression data (variables x
/// samples) as well as the results.
///
/// ### Fields
///
/// * `data` - The numeric values.
/// * `row_labels` - One label per row.
/// * `col_labels` - One label per column.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelledMatrix {
    pub data: Mat<f64>,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
}

impl LabelledMatrix {
    /// Generate a new labelled matrix
    ///
    /// ### Params
    ///
    /// * `data` - The matrix.
    /// * `row_labels` - Labels of the rows. Needs `data.nrows()` entries.
    /// * `col_labels` - Labels of the columns. Needs `data.ncols()` entries.
    pub fn new(data: Mat<f64>, row_labels: Vec<String>, col_labels: Vec<String>) -> Result<Self> {
        ensure_dim!("row labels", data.nrows(), row_labels.len());
        ensure_dim!("column labels", data.ncols(), col_labels.len());

        Ok(Self {
            data,
            row_labels,
            col_labels,
        })
    }

    /// Generate a labelled matrix with positional labels (`"0"`, `"1"`, ...)
    pub fn with_default_labels(data: Mat<f64>) -> Self {
        let row_labels = default_labels(data.nrows());
        let col_labels = default_labels(data.ncols());

        Self {
            data,
            row_labels,
            col_labels,
        }
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.data.as_ref()
    }
}

/// Positional labels `"0"..n`
pub fn default_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

/// Find for every target label its position in `source`
///
/// ### Params
///
/// * `source` - The labels in their current order.
/// * `target` - The labels in the wanted order.
///
/// ### Returns
///
/// `perm` with `source[perm[p]] == target[p]`. Fails if the two label sets
/// differ or `source` contains duplicates.
pub fn label_permutation(source: &[String], target: &[String]) -> Result<Vec<usize>> {
    ensure_dim!("label alignment", source.len(), target.len());

    let mut lookup: HashMap<&str, usize> = HashMap::with_capacity(source.len());
    for (i, label) in source.iter().enumerate() {
        if lookup.insert(label.as_str(), i).is_some() {
            return Err(HotspotError::LabelMismatch(format!(
                "duplicated label '{}'",
                label
            )));
        }
    }

    let mut seen = vec![false; source.len()];
    let mut perm = Vec::with_capacity(target.len());
    for label in target {
        let idx = *lookup.get(label.as_str()).ok_or_else(|| {
            HotspotError::LabelMismatch(format!("label '{}' not found", label))
        })?;
        if seen[idx] {
            return Err(HotspotError::LabelMismatch(format!(
                "duplicated label '{}'",
                label
            )));
        }
        seen[idx] = true;
        perm.push(idx);
    }

    Ok(perm)
}
