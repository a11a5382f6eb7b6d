//! Missing-value threshold pruning.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{PrepError, PrepResult};
use crate::types::DataSet;

/// Stage name used in logs and degraded-stage reports.
pub const STAGE: &str = "threshold_prune";

/// What [`try_prune`] would remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrunePlan {
    /// Columns whose missing fraction exceeded the column threshold.
    pub dropped_columns: Vec<String>,
    /// Row mask evaluated on the column-pruned table.
    pub keep_rows: Vec<bool>,
}

/// Drop sparse columns, then sparse rows.
///
/// Any internal error is logged and the input is returned unchanged; use [`try_prune`] to see
/// the error.
pub fn prune(
    dataset: DataSet,
    identifier_column: &str,
    row_threshold: f64,
    column_threshold: f64,
    protected_columns: &[String],
) -> DataSet {
    prune_or_keep(
        dataset,
        identifier_column,
        row_threshold,
        column_threshold,
        protected_columns,
    )
    .0
}

/// Like [`prune`], but also hands back the error that left the table unchanged.
pub fn prune_or_keep(
    dataset: DataSet,
    identifier_column: &str,
    row_threshold: f64,
    column_threshold: f64,
    protected_columns: &[String],
) -> (DataSet, Option<PrepError>) {
    let plan = plan_prune(
        &dataset,
        identifier_column,
        row_threshold,
        column_threshold,
        protected_columns,
    );
    match plan {
        Ok(plan) => (plan.apply(dataset), None),
        Err(err) => {
            warn!(stage = STAGE, %err, "returning table unmodified");
            (dataset, Some(err))
        }
    }
}

/// Fallible form of [`prune`].
pub fn try_prune(
    dataset: DataSet,
    identifier_column: &str,
    row_threshold: f64,
    column_threshold: f64,
    protected_columns: &[String],
) -> PrepResult<DataSet> {
    let plan = plan_prune(
        &dataset,
        identifier_column,
        row_threshold,
        column_threshold,
        protected_columns,
    )?;
    Ok(plan.apply(dataset))
}

/// Decide which columns and rows go without touching the table.
///
/// Columns are evaluated first; row fractions are then computed over the surviving columns
/// only. The identifier is always protected.
pub fn plan_prune(
    dataset: &DataSet,
    identifier_column: &str,
    row_threshold: f64,
    column_threshold: f64,
    protected_columns: &[String],
) -> PrepResult<PrunePlan> {
    check_threshold("column_threshold", column_threshold)?;
    check_threshold("row_threshold", row_threshold)?;
    if dataset.column_count() == 0 {
        return Err(PrepError::EmptyTable {
            stage: STAGE,
            reason: "table has no columns".to_string(),
        });
    }
    if dataset.row_count() == 0 {
        return Err(PrepError::EmptyTable {
            stage: STAGE,
            reason: "table has no rows".to_string(),
        });
    }

    let mut protected: HashSet<&str> = protected_columns.iter().map(String::as_str).collect();
    protected.insert(identifier_column);

    let keep_cols: Vec<bool> = dataset
        .schema
        .fields
        .iter()
        .zip(dataset.missing_fraction_by_column())
        .map(|(field, frac)| frac <= column_threshold || protected.contains(field.name.as_str()))
        .collect();
    let width = keep_cols.iter().filter(|k| **k).count();
    if width == 0 {
        return Err(PrepError::EmptyTable {
            stage: STAGE,
            reason: "every column exceeds the column threshold".to_string(),
        });
    }

    let keep_rows = dataset
        .rows
        .iter()
        .map(|row| {
            let missing = row
                .iter()
                .zip(&keep_cols)
                .filter(|(v, keep)| **keep && v.is_null())
                .count();
            missing as f64 / width as f64 <= row_threshold
        })
        .collect();

    let dropped_columns = dataset
        .schema
        .fields
        .iter()
        .zip(&keep_cols)
        .filter(|(_, keep)| !**keep)
        .map(|(field, _)| field.name.clone())
        .collect();

    Ok(PrunePlan {
        dropped_columns,
        keep_rows,
    })
}

impl PrunePlan {
    /// Apply the plan to the table it was computed from.
    pub fn apply(self, mut dataset: DataSet) -> DataSet {
        let before = dataset.row_count();
        dataset.drop_columns(&self.dropped_columns);
        dataset.retain_rows(&self.keep_rows);
        debug!(
            stage = STAGE,
            dropped_columns = ?self.dropped_columns,
            dropped_rows = before - dataset.row_count(),
            "pruned"
        );
        dataset
    }
}

fn check_threshold(name: &'static str, value: f64) -> PrepResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PrepError::InvalidThreshold { name, value })
    }
}
