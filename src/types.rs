//! Core data model types.
//!
//! Every stage consumes and produces an in-memory [`DataSet`]: an ordered list of typed
//! [`Field`]s (the [`Schema`]) plus row-major [`Value`] storage.

use std::collections::HashSet;
use std::fmt;

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Int64 and Float64 columns take part in outlier removal and scaling.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; `None` for nulls and non-numeric cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Renders the cell the way it is written to CSV (nulls as the empty string).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{v:.1}")
            }
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }

    /// Iterate the cells of column `idx` top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }

    /// Keep row `i` iff `keep[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `keep.len()` differs from the row count.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        assert!(
            keep.len() == self.rows.len(),
            "keep mask length {} does not match row count {}",
            keep.len(),
            self.rows.len()
        );
        let mut flags = keep.iter();
        self.rows.retain(|_| flags.next().copied().unwrap_or(false));
    }

    /// Remove the named columns. Names not present are ignored.
    pub fn drop_columns(&mut self, names: &[String]) {
        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
        let keep: Vec<bool> = self
            .schema
            .fields
            .iter()
            .map(|f| !doomed.contains(f.name.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }

        let mut flags = keep.iter();
        self.schema.fields.retain(|_| flags.next().copied().unwrap_or(true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| flags.next().copied().unwrap_or(true));
        }
    }

    /// Overwrite column `idx` with `values`, retyping the field to `data_type`.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the row count.
    pub fn replace_column(&mut self, idx: usize, data_type: DataType, values: Vec<Value>) {
        assert!(
            values.len() == self.rows.len(),
            "column length {} does not match row count {}",
            values.len(),
            self.rows.len()
        );
        self.schema.fields[idx].data_type = data_type;
        for (row, v) in self.rows.iter_mut().zip(values) {
            row[idx] = v;
        }
    }

    /// Append a new column at the end of the schema.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the row count.
    pub fn push_column(&mut self, field: Field, values: Vec<Value>) {
        assert!(
            values.len() == self.rows.len(),
            "column length {} does not match row count {}",
            values.len(),
            self.rows.len()
        );
        self.schema.fields.push(field);
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
    }

    /// Fraction of null cells per column, in schema order. Empty when there are no rows.
    pub fn missing_fraction_by_column(&self) -> Vec<f64> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        let n = self.rows.len() as f64;
        (0..self.column_count())
            .map(|idx| self.column_values(idx).filter(|v| v.is_null()).count() as f64 / n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("age", DataType::Float64),
            Field::new("status", DataType::Utf8),
        ]);

        let rows = vec![
            vec![Value::Int64(1), Value::Float64(40.0), Value::Utf8("a".to_string())],
            vec![Value::Int64(2), Value::Null, Value::Null],
            vec![Value::Int64(3), Value::Float64(55.0), Value::Utf8("c".to_string())],
        ];

        DataSet::new(schema, rows)
    }

    #[test]
    fn schema_index_of_works() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.index_of("id"), Some(0));
        assert_eq!(ds.schema.index_of("status"), Some(2));
        assert_eq!(ds.schema.index_of("missing"), None);
    }

    #[test]
    fn retain_rows_applies_mask() {
        let mut ds = sample_dataset();
        ds.retain_rows(&[true, false, true]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows[1][0], Value::Int64(3));
    }

    #[test]
    fn drop_columns_removes_schema_and_cells() {
        let mut ds = sample_dataset();
        ds.drop_columns(&["age".to_string(), "not_there".to_string()]);
        assert_eq!(ds.schema.field_names().collect::<Vec<_>>(), vec!["id", "status"]);
        assert!(ds.rows.iter().all(|r| r.len() == 2));
        assert_eq!(ds.rows[2][1], Value::Utf8("c".to_string()));
    }

    #[test]
    fn missing_fraction_by_column_counts_nulls() {
        let ds = sample_dataset();
        let cols = ds.missing_fraction_by_column();
        assert_eq!(cols[0], 0.0);
        assert!((cols[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(cols[2], cols[1]);
    }

    #[test]
    fn display_renders_null_as_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float64(0.5).to_string(), "0.5");
        assert_eq!(Value::Float64(2.0).to_string(), "2.0");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }
}
