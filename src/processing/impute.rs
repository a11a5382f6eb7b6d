//! Missing-value imputation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{PrepError, PrepResult};
use crate::types::{DataSet, DataType, Value};

use super::roles::ColumnRoles;

/// How numeric nulls are filled. Text nulls always take the column's most frequent value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImputeStrategy {
    Mean,
    Median,
    MostFrequent,
    Constant(f64),
}

impl ImputeStrategy {
    pub const ACCEPTED: &'static str = "mean, median, most_frequent, constant:<number>";
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputeStrategy::Mean => f.write_str("mean"),
            ImputeStrategy::Median => f.write_str("median"),
            ImputeStrategy::MostFrequent => f.write_str("most_frequent"),
            ImputeStrategy::Constant(v) => write!(f, "constant:{v}"),
        }
    }
}

impl FromStr for ImputeStrategy {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PrepError::InvalidMethod {
            kind: "impute",
            value: s.to_string(),
            accepted: Self::ACCEPTED,
        };
        match s {
            "mean" => Ok(ImputeStrategy::Mean),
            "median" => Ok(ImputeStrategy::Median),
            "most_frequent" => Ok(ImputeStrategy::MostFrequent),
            other => {
                let raw = other.strip_prefix("constant:").ok_or_else(invalid)?;
                let v = raw.trim().parse::<f64>().map_err(|_| invalid())?;
                Ok(ImputeStrategy::Constant(v))
            }
        }
    }
}

/// Fill nulls in numeric and text columns not excluded.
///
/// Int64 columns filled with a non-integral mean/median/constant are widened to Float64.
/// Columns with no observed value are left alone.
pub fn impute_missing(
    mut dataset: DataSet,
    strategy: ImputeStrategy,
    excluded_columns: &[String],
) -> DataSet {
    let roles = ColumnRoles::classify(&dataset, excluded_columns);

    for name in &roles.numeric {
        let Some(idx) = dataset.column_index(name) else {
            continue;
        };
        let observed: Vec<f64> = dataset.column_values(idx).filter_map(Value::as_f64).collect();
        let Some(fill) = numeric_fill(&observed, strategy) else {
            continue;
        };
        let data_type = match dataset.schema.fields[idx].data_type {
            DataType::Int64 if fill.fract() == 0.0 => DataType::Int64,
            _ => DataType::Float64,
        };
        let values = dataset
            .column_values(idx)
            .map(|v| match (v, data_type) {
                (Value::Null, DataType::Int64) => Value::Int64(fill as i64),
                (Value::Null, _) => Value::Float64(fill),
                (other, DataType::Float64) => {
                    other.as_f64().map(Value::Float64).unwrap_or(Value::Null)
                }
                (other, _) => other.clone(),
            })
            .collect();
        dataset.replace_column(idx, data_type, values);
    }

    for name in &roles.categorical {
        let Some(idx) = dataset.column_index(name) else {
            continue;
        };
        let Some(fill) = most_frequent(dataset.column_values(idx).filter(|v| !v.is_null())) else {
            continue;
        };
        for row in &mut dataset.rows {
            if row[idx].is_null() {
                row[idx] = fill.clone();
            }
        }
    }

    debug!(stage = "impute", %strategy, "imputed");
    dataset
}

/// Parse-then-impute convenience for callers holding a strategy name.
pub fn impute(
    dataset: DataSet,
    strategy: &str,
    excluded_columns: &[String],
) -> PrepResult<DataSet> {
    Ok(impute_missing(dataset, strategy.parse()?, excluded_columns))
}

fn numeric_fill(observed: &[f64], strategy: ImputeStrategy) -> Option<f64> {
    if observed.is_empty() {
        return None;
    }
    match strategy {
        ImputeStrategy::Constant(v) => Some(v),
        ImputeStrategy::Mean => Some(observed.iter().sum::<f64>() / observed.len() as f64),
        ImputeStrategy::Median => {
            let mut sorted = observed.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            Some(if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            })
        }
        ImputeStrategy::MostFrequent => {
            let values: Vec<Value> = observed.iter().map(|x| Value::Float64(*x)).collect();
            most_frequent(values.iter()).and_then(|v| v.as_f64())
        }
    }
}

/// Most frequent value; ties go to the smallest rendering so the result is deterministic.
fn most_frequent<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<String, (usize, &'a Value)> = HashMap::new();
    for v in values {
        counts.entry(v.to_string()).or_insert((0, v)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(ka, (ca, _)), (kb, (cb, _))| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map(|(_, (_, v))| v.clone())
}
