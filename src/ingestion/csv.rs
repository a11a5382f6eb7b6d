//! CSV ingestion and output.
//!
//! Files are first read as a [`RawTable`] of strings, column types are inferred over the
//! non-missing cells, and the records are then parsed into a typed [`DataSet`].

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::warn;

use crate::error::{PrepError, PrepResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Cell spellings that are read as [`Value::Null`].
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A",
];

/// Returns `true` if `raw` (after trimming) denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// A string-level table: header names plus one `Vec<String>` per record.
///
/// Used where files have to be combined before their column types are known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    /// Read a headed CSV file without interpreting any cell.
    pub fn from_path(path: impl AsRef<Path>) -> PrepResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        Self::from_reader(&mut rdr)
    }

    /// Read from an existing CSV reader. Ragged records are rejected by the reader.
    ///
    /// A repeated header name gets a numeric suffix (`age`, `age.1`, ...) so no column is lost.
    pub fn from_reader<R: io::Read>(rdr: &mut csv::Reader<R>) -> PrepResult<Self> {
        let headers = unique_headers(rdr.headers()?.iter());
        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result?;
            records.push(record.iter().map(str::to_owned).collect());
        }
        Ok(Self { headers, records })
    }

    /// Append `other` below `self`, aligning columns by name.
    ///
    /// Columns unknown to `self` are appended in the order `other` lists them; cells a table
    /// does not have are left empty (missing).
    pub fn concat(&mut self, other: RawTable) {
        let mut mapping = Vec::with_capacity(other.headers.len());
        for h in &other.headers {
            match self.headers.iter().position(|x| x == h) {
                Some(idx) => mapping.push(idx),
                None => {
                    self.headers.push(h.clone());
                    for rec in &mut self.records {
                        rec.push(String::new());
                    }
                    mapping.push(self.headers.len() - 1);
                }
            }
        }

        let width = self.headers.len();
        for rec in other.records {
            let mut row = vec![String::new(); width];
            for (cell, &dst) in rec.into_iter().zip(mapping.iter()) {
                row[dst] = cell;
            }
            self.records.push(row);
        }
    }

    /// Infer one [`DataType`] per column.
    pub fn infer_schema(&self) -> Schema {
        let fields = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells = self.records.iter().filter_map(|r| r.get(idx)).map(String::as_str);
                Field::new(name.clone(), infer_column_type(cells))
            })
            .collect();
        Schema::new(fields)
    }

    /// Parse every record into a [`DataSet`] matching `schema` (columns matched by name).
    pub fn into_dataset(self, schema: &Schema) -> PrepResult<DataSet> {
        let col_idxs = column_positions(&self.headers, schema)?;
        let mut rows = Vec::with_capacity(self.records.len());
        for (row_idx0, record) in self.records.iter().enumerate() {
            // 1-based, +1 for the header line.
            let user_row = row_idx0 + 2;
            let mut row = Vec::with_capacity(schema.fields.len());
            for (field, &idx) in schema.fields.iter().zip(col_idxs.iter()) {
                let raw = record.get(idx).map(String::as_str).unwrap_or("");
                row.push(parse_typed_value(user_row, &field.name, field.data_type, raw)?);
            }
            rows.push(row);
        }
        Ok(DataSet::new(schema.clone(), rows))
    }

    /// Infer the schema and parse in one go.
    pub fn into_inferred_dataset(self) -> PrepResult<DataSet> {
        let schema = self.infer_schema();
        self.into_dataset(&schema)
    }

    /// Write the raw table back out as CSV.
    pub fn write_path(&self, path: impl AsRef<Path>) -> PrepResult<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&self.headers)?;
        for rec in &self.records {
            wtr.write_record(rec)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Read a CSV file, inferring each column's type from its contents.
pub fn read_csv_inferred(path: impl AsRef<Path>) -> PrepResult<DataSet> {
    RawTable::from_path(path)?.into_inferred_dataset()
}

/// Ingest CSV data from an existing CSV reader using a known schema.
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all schema fields (order can differ).
/// - Each value is parsed according to the schema field type.
pub fn ingest_csv_from_reader<R: io::Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> PrepResult<DataSet> {
    RawTable::from_reader(rdr)?.into_dataset(schema)
}

/// Write a [`DataSet`] as a headed CSV file. Nulls become empty cells.
pub fn write_csv(path: impl AsRef<Path>, dataset: &DataSet) -> PrepResult<()> {
    let wtr = csv::Writer::from_path(path)?;
    write_csv_to_writer(wtr, dataset)
}

/// Write a [`DataSet`] to any CSV writer.
pub fn write_csv_to_writer<W: io::Write>(
    mut wtr: csv::Writer<W>,
    dataset: &DataSet,
) -> PrepResult<()> {
    wtr.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();
    for name in raw {
        let mut candidate = name.to_owned();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        if n > 0 {
            warn!(header = name, renamed = %candidate, "duplicate header renamed");
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }
    headers
}

fn column_positions(headers: &[String], schema: &Schema) -> PrepResult<Vec<usize>> {
    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        match headers.iter().position(|h| *h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(PrepError::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={headers:?}",
                        field = field.name
                    ),
                });
            }
        }
    }
    Ok(col_idxs)
}

fn infer_column_type<'a>(cells: impl Iterator<Item = &'a str>) -> DataType {
    let mut seen_any = false;
    let (mut int_ok, mut float_ok, mut bool_ok) = (true, true, true);
    for raw in cells {
        if is_missing(raw) {
            continue;
        }
        seen_any = true;
        let t = raw.trim();
        int_ok = int_ok && t.parse::<i64>().is_ok();
        float_ok = float_ok && t.parse::<f64>().is_ok();
        bool_ok = bool_ok && parse_bool_literal(t).is_some();
        if !(int_ok || float_ok || bool_ok) {
            return DataType::Utf8;
        }
    }

    match (seen_any, int_ok, float_ok, bool_ok) {
        // All-missing columns are numeric (NaN) by convention.
        (false, ..) => DataType::Float64,
        (true, true, ..) => DataType::Int64,
        (true, _, true, _) => DataType::Float64,
        (true, _, _, true) => DataType::Bool,
        _ => DataType::Utf8,
    }
}

fn parse_bool_literal(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: DataType,
    raw: &str,
) -> PrepResult<Value> {
    if is_missing(raw) {
        return Ok(Value::Null);
    }
    let trimmed = raw.trim();

    let err = |message: String| PrepError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(raw.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| err(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| err(e.to_string())),
        DataType::Bool => parse_bool_literal(trimmed)
            .map(Value::Bool)
            .ok_or_else(|| err("expected bool (true/false)".to_string())),
    }
}
