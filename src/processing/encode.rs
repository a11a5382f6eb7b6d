//! Categorical encoding: one-hot indicators or integer label codes.
//!
//! Both encoders are split into a `fit` step that learns categories from a table and a
//! `transform` step that applies them, so a fitted encoder can be re-applied to later batches.
//! [`LabelCodebook`] serializes to JSON for exactly that purpose.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PrepError, PrepResult};
use crate::types::{DataSet, DataType, Field, Value};

use super::roles::select_columns;

/// Supported categorical encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeMethod {
    /// One boolean indicator column per observed value.
    OneHot,
    /// Integer codes in first-seen order.
    Label,
    /// Leave categorical columns as text.
    None,
}

impl EncodeMethod {
    pub const ACCEPTED: &'static str = "one_hot, label, none";

    pub fn as_str(self) -> &'static str {
        match self {
            EncodeMethod::OneHot => "one_hot",
            EncodeMethod::Label => "label",
            EncodeMethod::None => "none",
        }
    }
}

impl fmt::Display for EncodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncodeMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_hot" => Ok(EncodeMethod::OneHot),
            "label" => Ok(EncodeMethod::Label),
            "none" => Ok(EncodeMethod::None),
            other => Err(PrepError::InvalidMethod {
                kind: "encode",
                value: other.to_string(),
                accepted: Self::ACCEPTED,
            }),
        }
    }
}

/// Encode categorical columns by method name.
///
/// Fails with [`PrepError::InvalidMethod`] if `method` is not one of `one_hot`, `label`, `none`.
pub fn encode(
    dataset: DataSet,
    columns: Option<&[String]>,
    excluded_columns: &[String],
    method: &str,
) -> PrepResult<DataSet> {
    let method: EncodeMethod = method.parse()?;
    Ok(encode_with(dataset, columns, excluded_columns, method))
}

/// Encode categorical columns with an already-parsed method.
pub fn encode_with(
    dataset: DataSet,
    columns: Option<&[String]>,
    excluded_columns: &[String],
    method: EncodeMethod,
) -> DataSet {
    let targets = encode_columns(&dataset, columns, excluded_columns);
    match method {
        EncodeMethod::OneHot => OneHotEncoder::fit(&dataset, &targets).transform(dataset),
        EncodeMethod::Label => LabelCodebook::fit(&dataset, &targets).transform(dataset),
        EncodeMethod::None => dataset,
    }
}

/// Columns an encoder would operate on: the explicit list or the categorical columns, minus
/// exclusions.
pub fn encode_columns(
    dataset: &DataSet,
    columns: Option<&[String]>,
    excluded_columns: &[String],
) -> Vec<String> {
    select_columns(dataset, columns, excluded_columns, |roles| roles.categorical)
}

/// Category key of a cell; `None` for missing.
fn category_key(v: &Value) -> Option<String> {
    if v.is_null() { None } else { Some(v.to_string()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OneHotColumn {
    name: String,
    /// Sorted categories; a missing cell is the trailing `None` category when observed.
    categories: Vec<Option<String>>,
    /// Output column name of each category, parallel to `categories`.
    indicators: Vec<String>,
}

/// A fitted one-hot encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneHotEncoder {
    columns: Vec<OneHotColumn>,
}

impl OneHotEncoder {
    /// Learn the categories of `columns` from `dataset`. Absent columns are ignored.
    ///
    /// Indicators are named `<column>_<value>` (`<column>_nan` for missing cells). A name
    /// already taken by a kept column or an earlier indicator gets a `_1`, `_2`, ... suffix.
    pub fn fit(dataset: &DataSet, columns: &[String]) -> Self {
        let encoded: Vec<&String> = columns
            .iter()
            .filter(|name| dataset.column_index(name).is_some())
            .collect();
        let mut taken: HashSet<String> = dataset
            .schema
            .field_names()
            .filter(|name| !encoded.iter().any(|e| e.as_str() == *name))
            .map(str::to_owned)
            .collect();

        let columns = encoded
            .into_iter()
            .filter_map(|name| {
                let idx = dataset.column_index(name)?;
                let seen: BTreeSet<Option<String>> =
                    dataset.column_values(idx).map(category_key).collect();
                let mut categories: Vec<Option<String>> =
                    seen.iter().filter(|c| c.is_some()).cloned().collect();
                if seen.contains(&None) {
                    categories.push(None);
                }
                let indicators = categories
                    .iter()
                    .map(|cat| claim_name(&mut taken, indicator_name(name, cat)))
                    .collect();
                Some(OneHotColumn {
                    name: name.clone(),
                    categories,
                    indicators,
                })
            })
            .collect();
        Self { columns }
    }

    /// Names of the indicator columns [`Self::transform`] appends, in order.
    pub fn output_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| c.indicators.iter().cloned())
            .collect()
    }

    /// Replace each fitted column with its Bool indicator columns, appended at the end.
    ///
    /// Values not seen during `fit` (and fitted columns missing from `dataset`) produce a row
    /// of all-`false` indicators.
    pub fn transform(&self, mut dataset: DataSet) -> DataSet {
        let mut indicators: Vec<(Field, Vec<Value>)> = Vec::new();
        for col in &self.columns {
            let keys: Option<Vec<Option<String>>> = dataset
                .column_index(&col.name)
                .map(|idx| dataset.column_values(idx).map(category_key).collect());
            for (cat, name) in col.categories.iter().zip(&col.indicators) {
                let values = match &keys {
                    Some(keys) => keys.iter().map(|k| Value::Bool(k == cat)).collect(),
                    None => vec![Value::Bool(false); dataset.row_count()],
                };
                indicators.push((Field::new(name.clone(), DataType::Bool), values));
            }
        }

        let encoded: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        dataset.drop_columns(&encoded);
        for (field, values) in indicators {
            dataset.push_column(field, values);
        }
        debug!(stage = "encode", method = "one_hot", columns = ?encoded, "encoded");
        dataset
    }
}

fn indicator_name(column: &str, category: &Option<String>) -> String {
    match category {
        Some(v) => format!("{column}_{v}"),
        None => format!("{column}_nan"),
    }
}

/// Reserve `base` in `taken`, suffixing `_1`, `_2`, ... until it is free.
fn claim_name(taken: &mut HashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut n = 0;
    while taken.contains(&candidate) {
        n += 1;
        candidate = format!("{base}_{n}");
    }
    taken.insert(candidate.clone());
    candidate
}

/// On-disk format version of [`LabelCodebook`].
pub const CODEBOOK_VERSION: u32 = 1;

/// The codes of one column: `values()[i]` is encoded as `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCodes", into = "StoredCodes")]
pub struct ColumnCodes {
    column: String,
    values: Vec<String>,
    index: HashMap<String, i64>,
}

/// Serialized shape of [`ColumnCodes`]; the lookup index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct StoredCodes {
    column: String,
    values: Vec<String>,
}

impl From<StoredCodes> for ColumnCodes {
    fn from(stored: StoredCodes) -> Self {
        let mut codes = ColumnCodes::new(stored.column);
        for value in stored.values {
            codes.insert(value);
        }
        codes
    }
}

impl From<ColumnCodes> for StoredCodes {
    fn from(codes: ColumnCodes) -> Self {
        StoredCodes {
            column: codes.column,
            values: codes.values,
        }
    }
}

impl ColumnCodes {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Known values in code order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Code of `value`, assigning the next one if it is new.
    pub fn insert(&mut self, value: String) -> i64 {
        if let Some(&code) = self.index.get(&value) {
            return code;
        }
        let code = self.values.len() as i64;
        self.index.insert(value.clone(), code);
        self.values.push(value);
        code
    }

    pub fn code(&self, value: &str) -> Option<i64> {
        self.index.get(value).copied()
    }
}

/// Value-to-integer mapping for label encoding.
///
/// Codes are assigned in first-seen order within the table passed to [`Self::fit`], so two
/// independent fits over different batches can disagree. Persist the codebook and re-apply it
/// with [`Self::transform`] when codes have to stay stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodebook {
    pub version: u32,
    pub columns: Vec<ColumnCodes>,
}

impl Default for LabelCodebook {
    fn default() -> Self {
        Self {
            version: CODEBOOK_VERSION,
            columns: Vec::new(),
        }
    }
}

impl LabelCodebook {
    /// Assign codes to the non-missing values of `columns`. Absent columns are ignored.
    pub fn fit(dataset: &DataSet, columns: &[String]) -> Self {
        let columns = columns
            .iter()
            .filter_map(|name| {
                let idx = dataset.column_index(name)?;
                let mut codes = ColumnCodes::new(name.clone());
                for key in dataset.column_values(idx).filter_map(category_key) {
                    codes.insert(key);
                }
                Some(codes)
            })
            .collect();
        Self {
            version: CODEBOOK_VERSION,
            columns,
        }
    }

    /// Code of `value` in `column`, if known.
    pub fn code_of(&self, column: &str, value: &str) -> Option<i64> {
        self.columns
            .iter()
            .find(|c| c.column == column)?
            .code(value)
    }

    /// Replace each coded column's values with their Int64 codes.
    ///
    /// Missing cells and values the codebook does not know become null.
    pub fn transform(&self, mut dataset: DataSet) -> DataSet {
        let mut encoded = Vec::new();
        for codes in &self.columns {
            let Some(idx) = dataset.column_index(&codes.column) else {
                continue;
            };
            let values = dataset
                .column_values(idx)
                .map(|v| {
                    category_key(v)
                        .and_then(|k| codes.code(&k))
                        .map(Value::Int64)
                        .unwrap_or(Value::Null)
                })
                .collect();
            dataset.replace_column(idx, DataType::Int64, values);
            encoded.push(codes.column.as_str());
        }
        debug!(stage = "encode", method = "label", columns = ?encoded, "encoded");
        dataset
    }

    /// Write the codebook as pretty JSON.
    pub fn to_json_path(&self, path: impl AsRef<Path>) -> PrepResult<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load a codebook written by [`Self::to_json_path`].
    pub fn from_json_path(path: impl AsRef<Path>) -> PrepResult<Self> {
        let file = BufReader::new(File::open(path)?);
        let codebook: Self = serde_json::from_reader(file)?;
        if codebook.version != CODEBOOK_VERSION {
            return Err(PrepError::SchemaMismatch {
                message: format!(
                    "codebook version {} is not supported (expected {CODEBOOK_VERSION})",
                    codebook.version
                ),
            });
        }
        Ok(codebook)
    }
}

#[cfg(test)]
mod tests {
    use super::{EncodeMethod, LabelCodebook, OneHotEncoder, encode};
    use crate::error::PrepError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn s(v: &str) -> Value {
        Value::Utf8(v.to_string())
    }

    fn sample() -> DataSet {
        DataSet::new(
            Schema::new(vec![
                Field::new("PatientID", DataType::Int64),
                Field::new("Status", DataType::Utf8),
                Field::new("Site", DataType::Utf8),
            ]),
            vec![
                vec![Value::Int64(1), s("stable"), s("north")],
                vec![Value::Int64(2), s("critical"), s("south")],
                vec![Value::Int64(3), Value::Null, s("north")],
                vec![Value::Int64(4), s("stable"), s("east")],
            ],
        )
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("one_hot".parse::<EncodeMethod>().unwrap(), EncodeMethod::OneHot);
        assert_eq!("label".parse::<EncodeMethod>().unwrap(), EncodeMethod::Label);
        let err = "bogus".parse::<EncodeMethod>().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PrepError::InvalidMethod { kind: "encode", .. }));
        assert!(msg.contains("'bogus'"));
        assert!(msg.contains("one_hot, label, none"));
    }

    #[test]
    fn one_hot_indicators_sum_to_one_per_row() {
        let out = encode(sample(), None, &["Site".to_string()], "one_hot").unwrap();
        let names: Vec<&str> = out.schema.field_names().collect();
        assert_eq!(
            names,
            vec!["PatientID", "Site", "Status_critical", "Status_stable", "Status_nan"]
        );
        for row in &out.rows {
            let hot = row[2..].iter().filter(|v| **v == Value::Bool(true)).count();
            assert_eq!(hot, 1);
        }
        assert_eq!(out.schema.fields[2].data_type, DataType::Bool);
    }

    #[test]
    fn one_hot_unseen_values_are_all_false() {
        let cols = vec!["Status".to_string()];
        let enc = OneHotEncoder::fit(&sample(), &cols);
        let later = DataSet::new(
            Schema::new(vec![Field::new("Status", DataType::Utf8)]),
            vec![vec![s("recovered")], vec![s("stable")]],
        );
        let out = enc.transform(later);
        assert_eq!(out.column_count(), 3);
        assert!(out.rows[0].iter().all(|v| *v == Value::Bool(false)));
        assert_eq!(out.rows[1][1], Value::Bool(true));
    }

    #[test]
    fn label_codes_follow_first_seen_order() {
        let out = encode(sample(), None, &[], "label").unwrap();
        let status: Vec<Value> = out.rows.iter().map(|r| r[1].clone()).collect();
        assert_eq!(
            status,
            vec![Value::Int64(0), Value::Int64(1), Value::Null, Value::Int64(0)]
        );
        let site: Vec<Value> = out.rows.iter().map(|r| r[2].clone()).collect();
        assert_eq!(
            site,
            vec![Value::Int64(0), Value::Int64(1), Value::Int64(0), Value::Int64(2)]
        );
        assert_eq!(out.schema.fields[1].data_type, DataType::Int64);
        assert_eq!(out.rows[0][0], Value::Int64(1));
    }

    #[test]
    fn persisted_codebook_gives_stable_codes() {
        let cols = vec!["Status".to_string()];
        let book = LabelCodebook::fit(&sample(), &cols);
        let path = std::env::temp_dir().join(format!(
            "cohort-prep-codebook-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        book.to_json_path(&path).unwrap();
        let loaded = LabelCodebook::from_json_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, book);

        // A batch where "critical" comes first still gets the persisted codes.
        let batch = DataSet::new(
            Schema::new(vec![Field::new("Status", DataType::Utf8)]),
            vec![vec![s("critical")], vec![s("stable")], vec![s("unknown")]],
        );
        let out = loaded.transform(batch);
        assert_eq!(out.rows[0][0], Value::Int64(1));
        assert_eq!(out.rows[1][0], Value::Int64(0));
        assert_eq!(out.rows[2][0], Value::Null);
        assert_eq!(loaded.code_of("Status", "stable"), Some(0));
    }

    #[test]
    fn colliding_indicator_names_get_suffixes() {
        let ds = DataSet::new(
            Schema::new(vec![
                Field::new("a", DataType::Utf8),
                Field::new("a_b", DataType::Utf8),
                Field::new("x", DataType::Utf8),
                Field::new("x_y", DataType::Utf8),
            ]),
            vec![vec![s("b_c"), s("c"), s("y"), s("kept")]],
        );
        let cols: Vec<String> = ["a", "a_b", "x"].map(String::from).to_vec();
        let enc = OneHotEncoder::fit(&ds, &cols);
        assert_eq!(enc.output_names(), vec!["a_b_c", "a_b_c_1", "x_y_1"]);

        let out = enc.transform(ds);
        let names: Vec<&str> = out.schema.field_names().collect();
        assert_eq!(names, vec!["x_y", "a_b_c", "a_b_c_1", "x_y_1"]);
        assert_eq!(out.column_index("x_y"), Some(0));
        assert_eq!(out.rows[0][0], s("kept"));
        assert!(out.rows[0][1..].iter().all(|v| *v == Value::Bool(true)));
    }

    #[test]
    fn label_fit_handles_many_distinct_values() {
        let n = 50_000;
        let ds = DataSet::new(
            Schema::new(vec![Field::new("Note", DataType::Utf8)]),
            (0..n)
                .chain(0..10)
                .map(|i| vec![s(&format!("note-{i}"))])
                .collect(),
        );
        let book = LabelCodebook::fit(&ds, &["Note".to_string()]);
        assert_eq!(book.columns[0].values().len(), n);
        assert_eq!(book.code_of("Note", "note-0"), Some(0));
        assert_eq!(book.code_of("Note", "note-49999"), Some(49_999));
        assert_eq!(book.code_of("Note", "note-50000"), None);

        let out = book.transform(ds);
        assert_eq!(out.rows[n + 3][0], Value::Int64(3));
    }

    #[test]
    fn none_method_is_identity() {
        assert_eq!(encode(sample(), None, &[], "none").unwrap(), sample());
    }
}
