//! Column role classification.
//!
//! Roles are derived from the *current* schema each time a stage asks for them; a stage that
//! retypes a column (label encoding turning text into integers, say) changes that column's
//! role for every later stage.

use std::collections::HashSet;

use crate::types::{DataSet, DataType};

/// Column names of a [`DataSet`] partitioned by role, each list in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    /// Int64/Float64 columns not excluded.
    pub numeric: Vec<String>,
    /// Utf8 columns not excluded.
    pub categorical: Vec<String>,
    /// Bool columns not excluded. Never scaled or encoded automatically.
    pub other: Vec<String>,
    /// Columns present in the table and named in the exclusion list.
    pub excluded: Vec<String>,
}

impl ColumnRoles {
    /// Classify every column of `dataset`.
    pub fn classify(dataset: &DataSet, excluded: &[String]) -> Self {
        let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
        let mut roles = Self::default();
        for field in &dataset.schema.fields {
            let name = field.name.clone();
            if excluded.contains(field.name.as_str()) {
                roles.excluded.push(name);
                continue;
            }
            match field.data_type {
                DataType::Int64 | DataType::Float64 => roles.numeric.push(name),
                DataType::Utf8 => roles.categorical.push(name),
                DataType::Bool => roles.other.push(name),
            }
        }
        roles
    }
}

/// Resolve which columns a stage operates on.
///
/// With an explicit list, names are kept in the given order minus exclusions and minus names
/// absent from the table; otherwise `auto` supplies the candidates.
pub(crate) fn select_columns(
    dataset: &DataSet,
    explicit: Option<&[String]>,
    excluded: &[String],
    auto: impl FnOnce(ColumnRoles) -> Vec<String>,
) -> Vec<String> {
    match explicit {
        Some(cols) => cols
            .iter()
            .filter(|c| !excluded.contains(c) && dataset.column_index(c).is_some())
            .cloned()
            .collect(),
        None => auto(ColumnRoles::classify(dataset, excluded)),
    }
}

#[cfg(test)]
mod tests {
    use super::ColumnRoles;
    use crate::types::{DataSet, DataType, Field, Schema};

    #[test]
    fn classifies_by_current_type_and_exclusion() {
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("PatientID", DataType::Int64),
                Field::new("Age", DataType::Float64),
                Field::new("Status", DataType::Utf8),
                Field::new("Smoker", DataType::Bool),
            ]),
            vec![],
        );
        let roles = ColumnRoles::classify(&ds, &["PatientID".to_string(), "Ghost".to_string()]);
        assert_eq!(roles.numeric, vec!["Age"]);
        assert_eq!(roles.categorical, vec!["Status"]);
        assert_eq!(roles.other, vec!["Smoker"]);
        assert_eq!(roles.excluded, vec!["PatientID"]);
    }
}
