//! Z-score outlier removal.

use tracing::{debug, warn};

use crate::error::{PrepError, PrepResult};
use crate::types::DataSet;

use super::roles::ColumnRoles;

/// Stage name used in logs and degraded-stage reports.
pub const STAGE: &str = "outlier_filter";

/// Default number of standard deviations beyond which a value is an outlier.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Remove rows holding an extreme value in any numeric, non-excluded column.
///
/// Tables without such columns are returned as-is. Internal errors are logged and the input is
/// returned unchanged; use [`try_filter_outliers`] to see them.
pub fn filter_outliers(
    dataset: DataSet,
    z_threshold: f64,
    excluded_columns: &[String],
) -> DataSet {
    filter_outliers_or_keep(dataset, z_threshold, excluded_columns).0
}

/// Like [`filter_outliers`], but also hands back the error that left the table unchanged.
pub fn filter_outliers_or_keep(
    dataset: DataSet,
    z_threshold: f64,
    excluded_columns: &[String],
) -> (DataSet, Option<PrepError>) {
    match outlier_mask(&dataset, z_threshold, excluded_columns) {
        Ok(Some(keep)) => (apply_mask(dataset, &keep), None),
        Ok(None) => (dataset, None),
        Err(err) => {
            warn!(stage = STAGE, %err, "returning table unmodified");
            (dataset, Some(err))
        }
    }
}

/// Fallible form of [`filter_outliers`].
pub fn try_filter_outliers(
    dataset: DataSet,
    z_threshold: f64,
    excluded_columns: &[String],
) -> PrepResult<DataSet> {
    Ok(match outlier_mask(&dataset, z_threshold, excluded_columns)? {
        Some(keep) => apply_mask(dataset, &keep),
        None => dataset,
    })
}

/// Per-row keep mask, or `None` when there is no numeric column to judge by.
///
/// Each column's mean and population standard deviation come from its non-null cells in the
/// current table. A row is kept iff `|z| < z_threshold` for every considered column; null cells
/// never condemn a row, and a zero-variance column gives `z = 0`.
pub fn outlier_mask(
    dataset: &DataSet,
    z_threshold: f64,
    excluded_columns: &[String],
) -> PrepResult<Option<Vec<bool>>> {
    if !(z_threshold.is_finite() && z_threshold > 0.0) {
        return Err(PrepError::InvalidThreshold {
            name: "z_threshold",
            value: z_threshold,
        });
    }

    let roles = ColumnRoles::classify(dataset, excluded_columns);
    if roles.numeric.is_empty() {
        debug!(stage = STAGE, "no numeric columns; skipping");
        return Ok(None);
    }

    let mut keep = vec![true; dataset.row_count()];
    for name in &roles.numeric {
        let Some(idx) = dataset.column_index(name) else {
            continue;
        };
        let Some((mean, std)) = mean_and_std(dataset, idx) else {
            continue;
        };
        for (flag, row) in keep.iter_mut().zip(&dataset.rows) {
            if let Some(x) = row[idx].as_f64() {
                let z = if std > 0.0 { (x - mean) / std } else { 0.0 };
                *flag = *flag && z.abs() < z_threshold;
            }
        }
    }
    Ok(Some(keep))
}

/// Mean and population standard deviation over the non-null cells of column `idx`.
pub(crate) fn mean_and_std(dataset: &DataSet, idx: usize) -> Option<(f64, f64)> {
    let values: Vec<f64> = dataset.column_values(idx).filter_map(|v| v.as_f64()).collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var.sqrt()))
}

fn apply_mask(mut dataset: DataSet, keep: &[bool]) -> DataSet {
    let before = dataset.row_count();
    dataset.retain_rows(keep);
    debug!(stage = STAGE, removed = before - dataset.row_count(), "filtered outliers");
    dataset
}
