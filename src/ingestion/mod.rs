//! Reading, merging and writing CSV inputs.
//!
//! - [`csv`]: string-level [`csv::RawTable`], type inference, typed reads and CSV output
//! - [`merge`]: filename-similarity grouping and row-wise merging of shards
//! - [`observability`]: observer hooks the orchestrator reports group outcomes to

pub mod csv;
pub mod merge;
pub mod observability;

pub use self::csv::{RawTable, read_csv_inferred, write_csv};
pub use merge::{FileGroup, MergedGroup, group_similar_files, merge_directory, similarity_ratio};
pub use observability::{
    CompositeObserver, FileObserver, GroupContext, GroupStats, PipelineObserver, PipelineSeverity,
    TracingObserver,
};
