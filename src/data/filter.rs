use std::fmt;

use super::model::{Dataset, Value};
use crate::error::{CleanError, Result};

// ---------------------------------------------------------------------------
// Range predicate: inclusive numeric bounds on one column
// ---------------------------------------------------------------------------

/// Keeps rows whose `column` value lies in `[min, max]`, both ends inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct RangePredicate {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl RangePredicate {
    pub fn new(column: impl Into<String>, min: f64, max: f64) -> Self {
        RangePredicate {
            column: column.into(),
            min,
            max,
        }
    }

    /// Whether a single cell passes.
    ///
    /// * null → fails (a missing value never compares inside a range)
    /// * numeric → `min <= v <= max`
    /// * anything else → `None`, the caller reports a conversion error
    pub fn test(&self, value: &Value) -> Option<bool> {
        if value.is_null() {
            return Some(false);
        }
        value.as_f64().map(|v| self.min <= v && v <= self.max)
    }
}

impl fmt::Display for RangePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in [{}, {}]", self.column, self.min, self.max)
    }
}

/// Predicates combined with logical AND; one stage of the cleaning pass.
pub type PredicateSet = Vec<RangePredicate>;

/// Return indices of rows that pass every predicate in `predicates`.
///
/// Indices come back in ascending order so selecting them keeps the input
/// row order.  Fails with `MissingColumn` before looking at any row if a
/// predicate names a column the dataset lacks.
pub fn filtered_indices(dataset: &Dataset, predicates: &[RangePredicate]) -> Result<Vec<usize>> {
    let resolved = predicates
        .iter()
        .map(|p| dataset.column_index(&p.column).map(|idx| (idx, p)))
        .collect::<Result<Vec<_>>>()?;

    let mut keep = Vec::with_capacity(dataset.len());
    'rows: for (row_no, row) in dataset.rows.iter().enumerate() {
        for (idx, pred) in &resolved {
            let value = row.get(*idx);
            match pred.test(value) {
                Some(true) => {}
                Some(false) => continue 'rows,
                None => {
                    return Err(CleanError::TypeConversion {
                        row: row.source_row,
                        column: pred.column.clone(),
                        value: row.output_text(*idx),
                        target: "a number",
                    })
                }
            }
        }
        keep.push(row_no);
    }
    Ok(keep)
}

/// Apply one AND-combined stage, producing a new dataset.
pub fn apply(dataset: &Dataset, predicates: &[RangePredicate]) -> Result<Dataset> {
    let keep = filtered_indices(dataset, predicates)?;
    Ok(dataset.select(&keep))
}
