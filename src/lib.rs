//! `cohort-prep` cleans directories of patient/biomarker CSV files into analysis-ready tables.
//!
//! The primary entrypoint is [`pipeline::Pipeline::run`], which groups similarly named CSV files
//! in an input directory, merges each group, runs the cleaning stages over the merged table and
//! writes one `processed_merged_<name>` file per group.
//!
//! ## Stages (in order)
//!
//! - threshold pruning of sparse columns, then sparse rows ([`processing::prune()`])
//! - optional imputation ([`processing::impute_missing()`])
//! - z-score outlier removal ([`processing::filter_outliers()`])
//! - text normalization ([`processing::normalize_text()`])
//! - duplicate removal ([`processing::drop_duplicates()`])
//! - categorical encoding ([`processing::encode()`])
//! - numeric scaling ([`processing::scale()`])
//!
//! The identifier column (e.g. a patient ID) is never dropped or transformed.
//!
//! ## Schema + value types
//!
//! Files are read into a [`types::DataSet`] whose column types are inferred per column:
//!
//! - [`types::DataType::Int64`]
//! - [`types::DataType::Float64`]
//! - [`types::DataType::Bool`]
//! - [`types::DataType::Utf8`]
//!
//! Empty cells and common missing tokens (`NA`, `NaN`, `null`, ...) map to [`types::Value::Null`].
//!
//! ## Quick example: run over a directory
//!
//! ```no_run
//! use cohort_prep::{Pipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), cohort_prep::PrepError> {
//! let config = PipelineConfig {
//!     encode_method: "one_hot".to_string(),
//!     ..PipelineConfig::new("PatientID")
//! };
//! let report = Pipeline::new(config).run("data/raw", "data/clean")?;
//! for group in &report.groups {
//!     println!("{} -> {:?}", group.representative, group.output);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: CSV reading/writing, filename grouping + merging, observers
//! - [`processing`]: the cleaning stages
//! - [`pipeline`]: per-directory orchestration and run reports
//! - [`config`]: run parameters
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: error types

pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use config::{CleaningRequest, PipelineConfig};
pub use error::{PrepError, PrepResult};
pub use pipeline::{GroupReport, Pipeline, RunReport};
