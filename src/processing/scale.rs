//! Numeric scaling: z-score standardization or min-max normalization.
//!
//! Statistics are computed per call over the table being scaled; nothing is persisted between
//! batches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepError, PrepResult};
use crate::types::{DataSet, DataType, Value};

use super::outliers::mean_and_std;
use super::roles::select_columns;

/// Supported numeric scalings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMethod {
    /// `(x - mean) / std` with the population standard deviation.
    Standardize,
    /// `(x - min) / (max - min)`, mapping into `[0, 1]`.
    MinMax,
}

impl ScaleMethod {
    pub const ACCEPTED: &'static str = "standardize, min_max";

    pub fn as_str(self) -> &'static str {
        match self {
            ScaleMethod::Standardize => "standardize",
            ScaleMethod::MinMax => "min_max",
        }
    }
}

impl fmt::Display for ScaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standardize" => Ok(ScaleMethod::Standardize),
            "min_max" => Ok(ScaleMethod::MinMax),
            other => Err(PrepError::InvalidMethod {
                kind: "scale",
                value: other.to_string(),
                accepted: Self::ACCEPTED,
            }),
        }
    }
}

/// Scale numeric columns by method name.
///
/// Fails with [`PrepError::InvalidMethod`] if `method` is not `standardize` or `min_max`.
pub fn scale(
    dataset: DataSet,
    columns: Option<&[String]>,
    excluded_columns: &[String],
    method: &str,
) -> PrepResult<DataSet> {
    let method: ScaleMethod = method.parse()?;
    Ok(scale_with(dataset, columns, excluded_columns, method))
}

/// Scale numeric columns with an already-parsed method.
///
/// Only numeric columns are touched, even when named explicitly. Scaled columns become Float64;
/// nulls stay null. A constant column maps to `0.0` under either method.
pub fn scale_with(
    mut dataset: DataSet,
    columns: Option<&[String]>,
    excluded_columns: &[String],
    method: ScaleMethod,
) -> DataSet {
    let targets = select_columns(&dataset, columns, excluded_columns, |roles| roles.numeric);
    let mut scaled = Vec::with_capacity(targets.len());

    for name in &targets {
        let Some(idx) = dataset.column_index(name) else {
            continue;
        };
        if !dataset.schema.fields[idx].data_type.is_numeric() {
            continue;
        }
        let Some((offset, divisor)) = fit_column(&dataset, idx, method) else {
            continue;
        };
        let values = dataset
            .column_values(idx)
            .map(|v| match v.as_f64() {
                Some(x) => Value::Float64((x - offset) / divisor),
                None => Value::Null,
            })
            .collect();
        dataset.replace_column(idx, DataType::Float64, values);
        scaled.push(name.as_str());
    }

    debug!(stage = "scale", %method, columns = ?scaled, "scaled");
    dataset
}

/// `(offset, divisor)` such that a value scales to `(x - offset) / divisor`, or `None` if
/// column `idx` has no numeric cells.
fn fit_column(dataset: &DataSet, idx: usize, method: ScaleMethod) -> Option<(f64, f64)> {
    let (offset, divisor) = match method {
        ScaleMethod::Standardize => {
            let (mean, std) = mean_and_std(dataset, idx)?;
            (mean, std)
        }
        ScaleMethod::MinMax => {
            let (min, max) = dataset
                .column_values(idx)
                .filter_map(Value::as_f64)
                .fold(None, |acc: Option<(f64, f64)>, x| match acc {
                    Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
                    None => Some((x, x)),
                })?;
            (min, max - min)
        }
    };
    // Zero spread: every value sits on the offset and scales to 0.
    let divisor = if divisor > 0.0 { divisor } else { 1.0 };
    Some((offset, divisor))
}

#[cfg(test)]
mod tests {
    use super::{ScaleMethod, scale};
    use crate::error::PrepError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn sample() -> DataSet {
        let row = |id: i64, age: i64, marker: Value, status: &str| {
            vec![
                Value::Int64(id),
                Value::Int64(age),
                marker,
                Value::Float64(7.0),
                Value::Utf8(status.into()),
            ]
        };
        DataSet::new(
            Schema::new(vec![
                Field::new("PatientID", DataType::Int64),
                Field::new("Age", DataType::Int64),
                Field::new("Marker", DataType::Float64),
                Field::new("Const", DataType::Float64),
                Field::new("Status", DataType::Utf8),
            ]),
            vec![
                row(10, 30, Value::Float64(1.5), "a"),
                row(11, 40, Value::Float64(2.5), "b"),
                row(12, 50, Value::Null, "c"),
                row(13, 60, Value::Float64(4.0), "d"),
            ],
        )
    }

    fn column(ds: &DataSet, name: &str) -> Vec<f64> {
        let idx = ds.column_index(name).unwrap();
        ds.column_values(idx).filter_map(Value::as_f64).collect()
    }

    #[test]
    fn standardize_gives_zero_mean_unit_std_and_skips_excluded() {
        let excluded = vec!["PatientID".to_string()];
        let out = scale(sample(), None, &excluded, "standardize").unwrap();

        for name in ["Age", "Marker"] {
            let xs = column(&out, name);
            let n = xs.len() as f64;
            let mean = xs.iter().sum::<f64>() / n;
            let std = (xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
            assert!(mean.abs() < 1e-9, "{name} mean {mean}");
            assert!((std - 1.0).abs() < 1e-9, "{name} std {std}");
        }

        let ids: Vec<Value> = out.rows.iter().map(|r| r[0].clone()).collect();
        let expected: Vec<Value> = (10..=13).map(Value::Int64).collect();
        assert_eq!(ids, expected);
        assert_eq!(out.rows[2][2], Value::Null);
        assert_eq!(out.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(column(&out, "Const"), vec![0.0; 4]);
        assert_eq!(out.rows[0][4], Value::Utf8("a".into()));
    }

    #[test]
    fn min_max_maps_into_unit_range_and_constant_to_zero() {
        let excluded = vec!["PatientID".to_string()];
        let out = scale(sample(), None, &excluded, "min_max").unwrap();
        assert_eq!(column(&out, "Age"), vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]);
        assert_eq!(column(&out, "Marker"), vec![0.0, 0.4, 1.0]);
        assert_eq!(column(&out, "Const"), vec![0.0; 4]);
    }

    #[test]
    fn explicit_columns_skip_non_numeric() {
        let cols = vec!["Status".to_string(), "Age".to_string()];
        let out = scale(sample(), Some(&cols), &[], "min_max").unwrap();
        assert_eq!(out.rows[0][4], Value::Utf8("a".into()));
        assert_eq!(out.rows[0][2], Value::Float64(1.5));
        assert_eq!(out.rows[3][1], Value::Float64(1.0));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = scale(sample(), None, &[], "bogus").unwrap_err();
        assert!(matches!(
            err,
            PrepError::InvalidMethod { kind: "scale", ref value, .. } if value == "bogus"
        ));
        assert_eq!("min_max".parse::<ScaleMethod>().unwrap(), ScaleMethod::MinMax);
    }
}
