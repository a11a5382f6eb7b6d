//! The cleaning stages.
//!
//! Every stage takes a [`crate::types::DataSet`] by value and hands back the transformed
//! table, so no caller can observe an intermediate state after passing it on. Column roles
//! are re-derived from the current schema by each stage ([`roles::ColumnRoles`]).
//!
//! In pipeline order:
//!
//! - [`prune()`]: drop columns, then rows, whose missing fraction exceeds a threshold
//! - [`impute_missing()`]: optional null filling
//! - [`filter_outliers()`]: drop rows with any `|z| >= threshold`
//! - [`normalize_text()`]: lowercase + trim text columns
//! - [`drop_duplicates()`]: exact duplicate removal
//! - [`encode()`]: one-hot / label encoding
//! - [`scale()`]: standardization / min-max normalization
//!
//! `prune` and `filter_outliers` are fail-soft: on an internal error they log and return the
//! input unchanged. Their `try_*` forms surface the error instead, and the `*_or_keep` forms
//! return the unchanged table together with the error.
//!
//! ## Example
//!
//! ```rust
//! use cohort_prep::processing::{drop_duplicates, encode, filter_outliers, prune, scale};
//! use cohort_prep::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("PatientID", DataType::Int64),
//!     Field::new("Age", DataType::Int64),
//!     Field::new("Status", DataType::Utf8),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Int64(1), Value::Int64(40), Value::Utf8("stable".into())],
//!         vec![Value::Int64(2), Value::Int64(60), Value::Utf8("critical".into())],
//!         vec![Value::Int64(2), Value::Int64(60), Value::Utf8("critical".into())],
//!     ],
//! );
//! let excluded = vec!["PatientID".to_string()];
//!
//! let ds = prune(ds, "PatientID", 0.3, 0.5, &excluded);
//! let ds = filter_outliers(ds, 3.0, &excluded);
//! let ds = drop_duplicates(ds);
//! let ds = encode(ds, None, &excluded, "label").unwrap();
//! let ds = scale(ds, None, &excluded, "min_max").unwrap();
//!
//! assert_eq!(ds.row_count(), 2);
//! assert_eq!(ds.rows[1][2], Value::Float64(1.0));
//! ```

pub mod dedup;
pub mod encode;
pub mod impute;
pub mod outliers;
pub mod prune;
pub mod roles;
pub mod scale;
pub mod text;

pub use dedup::drop_duplicates;
pub use encode::{EncodeMethod, LabelCodebook, OneHotEncoder, encode, encode_with};
pub use impute::{ImputeStrategy, impute, impute_missing};
pub use outliers::{
    DEFAULT_Z_THRESHOLD, filter_outliers, filter_outliers_or_keep, try_filter_outliers,
};
pub use prune::{PrunePlan, plan_prune, prune, prune_or_keep, try_prune};
pub use roles::ColumnRoles;
pub use scale::{ScaleMethod, scale, scale_with};
pub use text::normalize_text;
