//! Exact duplicate-row removal.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::types::{DataSet, Value};

/// Hash/equality view of a row: nulls equal each other, floats compare by bit pattern with
/// `-0.0` folded into `0.0`.
struct RowKey<'a>(&'a [Value]);

fn float_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

impl Hash for RowKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in self.0 {
            std::mem::discriminant(v).hash(state);
            match v {
                Value::Null => {}
                Value::Int64(x) => x.hash(state),
                Value::Float64(x) => float_bits(*x).hash(state),
                Value::Bool(x) => x.hash(state),
                Value::Utf8(x) => x.hash(state),
            }
        }
    }
}

impl PartialEq for RowKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0).all(|(a, b)| match (a, b) {
                (Value::Float64(x), Value::Float64(y)) => float_bits(*x) == float_bits(*y),
                _ => a == b,
            })
    }
}

impl Eq for RowKey<'_> {}

/// Drop rows equal in every column to an earlier row, keeping first occurrences in order.
pub fn drop_duplicates(mut dataset: DataSet) -> DataSet {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(dataset.row_count());
        dataset
            .rows
            .iter()
            .map(|row| seen.insert(RowKey(row.as_slice())))
            .collect()
    };
    let before = dataset.row_count();
    dataset.retain_rows(&keep);
    debug!(stage = "drop_duplicates", removed = before - dataset.row_count(), "deduplicated");
    dataset
}

#[cfg(test)]
mod tests {
    use super::drop_duplicates;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn sample() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("x", DataType::Float64),
            Field::new("s", DataType::Utf8),
        ]);
        let row = |id: i64, x: Value, s: &str| {
            vec![Value::Int64(id), x, Value::Utf8(s.to_string())]
        };
        DataSet::new(
            schema,
            vec![
                row(1, Value::Float64(0.5), "a"),
                row(2, Value::Null, "b"),
                row(1, Value::Float64(0.5), "a"),
                row(2, Value::Null, "b"),
                row(3, Value::Float64(-0.0), "c"),
                row(3, Value::Float64(0.0), "c"),
                row(1, Value::Float64(0.5), "A"),
            ],
        )
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let out = drop_duplicates(sample());
        let ids: Vec<Value> = out.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            ids,
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3), Value::Int64(1)]
        );
        assert_eq!(out.rows[2][1], Value::Float64(-0.0));
    }

    #[test]
    fn is_idempotent() {
        let once = drop_duplicates(sample());
        let twice = drop_duplicates(once.clone());
        assert_eq!(once, twice);
    }
}
