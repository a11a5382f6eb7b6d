//! Lowercase/trim normalization of text columns.

use tracing::debug;

use crate::types::{DataSet, Value};

use super::roles::select_columns;

/// Lowercase and trim every text cell of the selected columns.
///
/// With `columns == None` the categorical columns are used. Names that are excluded or absent
/// from the table are skipped silently.
pub fn normalize_text(
    mut dataset: DataSet,
    columns: Option<&[String]>,
    excluded_columns: &[String],
) -> DataSet {
    let targets = select_columns(&dataset, columns, excluded_columns, |roles| roles.categorical);
    let idxs: Vec<usize> = targets
        .iter()
        .filter_map(|name| dataset.column_index(name))
        .collect();

    for row in &mut dataset.rows {
        for &idx in &idxs {
            if let Value::Utf8(s) = &mut row[idx] {
                let normalized = s.trim().to_lowercase();
                *s = normalized;
            }
        }
    }

    debug!(stage = "normalize_text", columns = ?targets, "normalized");
    dataset
}

#[cfg(test)]
mod tests {
    use super::normalize_text;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn s(v: &str) -> Value {
        Value::Utf8(v.to_string())
    }

    fn sample() -> DataSet {
        DataSet::new(
            Schema::new(vec![
                Field::new("code", DataType::Utf8),
                Field::new("status", DataType::Utf8),
                Field::new("age", DataType::Int64),
            ]),
            vec![
                vec![s(" AB-1 "), s("  Active"), Value::Int64(3)],
                vec![s("Cd-2"), Value::Null, Value::Int64(4)],
            ],
        )
    }

    #[test]
    fn auto_detects_text_columns_and_respects_exclusion() {
        let out = normalize_text(sample(), None, &["code".to_string()]);
        assert_eq!(out.rows[0][0], s(" AB-1 "));
        assert_eq!(out.rows[0][1], s("active"));
        assert_eq!(out.rows[1][1], Value::Null);
        assert_eq!(out.rows[0][2], Value::Int64(3));
    }

    #[test]
    fn explicit_list_may_name_absent_columns() {
        let cols = vec!["code".to_string(), "not_a_column".to_string()];
        let out = normalize_text(sample(), Some(&cols), &[]);
        assert_eq!(out.rows[0][0], s("ab-1"));
        assert_eq!(out.rows[1][0], s("cd-2"));
        assert_eq!(out.rows[0][1], s("  Active"));
    }
}
