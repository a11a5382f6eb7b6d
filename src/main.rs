//! `cohort-prep` command line.
//!
//! ```sh
//! cohort-prep --input data/raw --output data/clean --identifier PatientID --encode one_hot
//! cohort-prep --request request.json --output data/clean
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG` (e.g. `RUST_LOG=cohort_prep=debug`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cohort_prep::ingestion::{CompositeObserver, FileObserver, PipelineObserver, TracingObserver};
use cohort_prep::{CleaningRequest, Pipeline, PipelineConfig, PrepError, PrepResult};

#[derive(Parser, Debug)]
#[command(version, about = "Merge, clean, encode and scale directories of cohort CSV files")]
struct Args {
    /// Directory of input CSV files. Required unless `--request` supplies it.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for processed outputs (created if missing).
    #[arg(long)]
    output: PathBuf,

    /// JSON file with a `PipelineConfig`; missing keys take defaults.
    #[arg(long, conflicts_with = "request")]
    config: Option<PathBuf>,

    /// JSON cleaning request in which every field is mandatory.
    #[arg(long)]
    request: Option<PathBuf>,

    /// Identifier column never dropped or transformed.
    #[arg(long)]
    identifier: Option<String>,

    /// Additional excluded column (repeatable).
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// `one_hot`, `label` or `none`.
    #[arg(long)]
    encode: Option<String>,

    /// `standardize` or `min_max`.
    #[arg(long)]
    scale: Option<String>,

    #[arg(long)]
    row_threshold: Option<f64>,

    #[arg(long)]
    column_threshold: Option<f64>,

    #[arg(long)]
    z_threshold: Option<f64>,

    #[arg(long)]
    similarity_threshold: Option<u8>,

    /// `mean`, `median`, `most_frequent` or `constant:<n>`.
    #[arg(long)]
    impute: Option<String>,

    /// Write label codebooks next to outputs.
    #[arg(long)]
    persist_codebooks: bool,

    /// Append group outcomes to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Resolve the input directory and config: file first, then command-line overrides.
    fn resolve(&self) -> PrepResult<(PathBuf, PipelineConfig)> {
        let (request_input, mut config) = match (&self.request, &self.config) {
            (Some(path), _) => {
                let (input, config) = CleaningRequest::from_json_path(path)?.into_config()?;
                (Some(input), config)
            }
            (None, Some(path)) => (None, PipelineConfig::from_json_path(path)?),
            (None, None) => (None, PipelineConfig::default()),
        };

        if let Some(identifier) = &self.identifier {
            config.identifier_column = identifier.clone();
        }
        config.excluded_columns.extend(self.exclude.iter().cloned());
        if let Some(encode) = &self.encode {
            config.encode_method = encode.clone();
        }
        if let Some(scale) = &self.scale {
            config.scale_method = scale.clone();
        }
        if let Some(v) = self.row_threshold {
            config.row_threshold = v;
        }
        if let Some(v) = self.column_threshold {
            config.column_threshold = v;
        }
        if let Some(v) = self.z_threshold {
            config.z_threshold = v;
        }
        if let Some(v) = self.similarity_threshold {
            config.similarity_threshold = v;
        }
        if let Some(impute) = &self.impute {
            config.impute_strategy = Some(impute.clone());
        }
        config.persist_codebooks |= self.persist_codebooks;
        config.validate()?;

        let input = self
            .input
            .clone()
            .or(request_input)
            .ok_or(PrepError::MissingField("input"))?;
        Ok((input, config))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (input, config) = match args.resolve() {
        Ok(resolved) => resolved,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let mut observers: Vec<Arc<dyn PipelineObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &args.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    let pipeline = Pipeline::new(config).with_observer(Arc::new(CompositeObserver::new(observers)));

    match pipeline.run(&input, &args.output) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report.to_json()) {
                Ok(json) => println!("{json}"),
                Err(err) => error!(%err, "could not render report"),
            }
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            error!(%err, "run aborted");
            ExitCode::FAILURE
        }
    }
}
