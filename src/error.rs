use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PrepResult<T> = Result<T, PrepError>;

/// Error type returned by ingestion, stages and the orchestrator.
///
/// This is a single error enum shared across CSV ingestion, merging, the cleaning stages and
/// configuration loading.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (config, request or codebook) error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The input does not conform to the expected shape (missing columns, ragged rows, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// An encode or scale method name did not match a recognized variant.
    #[error("invalid {kind} method '{value}'; expected one of: {accepted}")]
    InvalidMethod {
        kind: &'static str,
        value: String,
        accepted: &'static str,
    },

    /// A proportion/threshold setting was out of range.
    #[error("invalid {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    /// A stage had nothing to compute over.
    #[error("{stage}: {reason}")]
    EmptyTable { stage: &'static str, reason: String },

    /// A required configuration or request field was absent or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}

impl PrepError {
    /// `true` for failures caused by the filesystem or the CSV/IO layer rather than the data.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            PrepError::Io(_) | PrepError::Walk(_) => true,
            PrepError::Csv(err) => matches!(err.kind(), csv::ErrorKind::Io(_)),
            _ => false,
        }
    }
}
