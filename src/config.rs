//! Pipeline configuration.
//!
//! [`PipelineConfig`] is the one place run parameters live; the orchestrator passes it down to
//! each stage instead of relying on per-function defaults. [`CleaningRequest`] is the stricter
//! request-layer shape in which every field is mandatory.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, PrepResult};
use crate::ingestion::merge::DEFAULT_SIMILARITY_THRESHOLD;
use crate::processing::DEFAULT_Z_THRESHOLD;

/// Parameters of one pipeline run.
///
/// Method names are kept as strings and parsed by the encode/scale stages, so an unknown name
/// fails the groups it is applied to rather than the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column never dropped or transformed (e.g. patient ID).
    pub identifier_column: String,
    /// Columns exempt from pruning, encoding and scaling.
    pub excluded_columns: Vec<String>,
    /// `one_hot`, `label` or `none`.
    pub encode_method: String,
    /// `standardize` or `min_max`.
    pub scale_method: String,
    /// Max fraction of missing cells a row may have.
    pub row_threshold: f64,
    /// Max fraction of missing cells a column may have.
    pub column_threshold: f64,
    pub z_threshold: f64,
    /// Filename similarity (0-100) a file must exceed to join a group.
    pub similarity_threshold: u8,
    /// `mean`, `median`, `most_frequent` or `constant:<n>`; no imputation when unset.
    pub impute_strategy: Option<String>,
    /// Write `codebook_<name>.json` next to label-encoded outputs.
    pub persist_codebooks: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            identifier_column: String::new(),
            excluded_columns: Vec::new(),
            encode_method: "label".to_string(),
            scale_method: "standardize".to_string(),
            row_threshold: 0.3,
            column_threshold: 0.5,
            z_threshold: DEFAULT_Z_THRESHOLD,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            impute_strategy: None,
            persist_codebooks: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults with the given identifier column.
    pub fn new(identifier_column: impl Into<String>) -> Self {
        Self {
            identifier_column: identifier_column.into(),
            ..Default::default()
        }
    }

    /// Load a config from a JSON file; missing keys take their defaults.
    pub fn from_json_path(path: impl AsRef<Path>) -> PrepResult<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(file)?)
    }

    /// Check the settings that are not method names.
    pub fn validate(&self) -> PrepResult<()> {
        if self.identifier_column.trim().is_empty() {
            return Err(PrepError::MissingField("identifier_column"));
        }
        for (name, value) in [
            ("row_threshold", self.row_threshold),
            ("column_threshold", self.column_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PrepError::InvalidThreshold { name, value });
            }
        }
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(PrepError::InvalidThreshold {
                name: "z_threshold",
                value: self.z_threshold,
            });
        }
        if self.similarity_threshold > 100 {
            return Err(PrepError::InvalidThreshold {
                name: "similarity_threshold",
                value: f64::from(self.similarity_threshold),
            });
        }
        Ok(())
    }

    /// Exclusion list with the identifier column added if absent.
    pub fn effective_exclusions(&self) -> Vec<String> {
        let mut excluded = self.excluded_columns.clone();
        if !excluded.contains(&self.identifier_column) {
            excluded.push(self.identifier_column.clone());
        }
        excluded
    }
}

/// A cleaning request as the request layer receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleaningRequest {
    pub input_path: PathBuf,
    pub patient_identifier: String,
    pub encoding_method: String,
    pub scale_method: String,
    pub row_threshold: f64,
    pub column_threshold: f64,
    pub excluded_columns: Vec<String>,
}

impl CleaningRequest {
    pub fn from_json_path(path: impl AsRef<Path>) -> PrepResult<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(file)?)
    }

    /// Split into the input directory and a validated config.
    pub fn into_config(self) -> PrepResult<(PathBuf, PipelineConfig)> {
        if self.input_path.as_os_str().is_empty() {
            return Err(PrepError::MissingField("input_path"));
        }
        let config = PipelineConfig {
            identifier_column: self.patient_identifier,
            excluded_columns: self.excluded_columns,
            encode_method: self.encoding_method,
            scale_method: self.scale_method,
            row_threshold: self.row_threshold,
            column_threshold: self.column_threshold,
            ..Default::default()
        };
        config.validate()?;
        Ok((self.input_path, config))
    }
}
