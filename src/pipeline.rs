//! Directory-level orchestration: merge similar files, clean each merged group, write results.
//!
//! Each group is an independent unit of work. A group that fails is recorded in the
//! [`RunReport`] and the remaining groups still run. Runs are single-threaded and must not
//! share an output directory with a concurrent run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, info_span, warn};

use crate::config::PipelineConfig;
use crate::error::{PrepError, PrepResult};
use crate::ingestion::csv::{read_csv_inferred, write_csv};
use crate::ingestion::merge::{FileGroup, MERGED_PREFIX, merge_group, plan_groups};
use crate::ingestion::observability::{
    GroupContext, GroupStats, PipelineObserver, PipelineSeverity,
};
use crate::processing::encode::{EncodeMethod, LabelCodebook, OneHotEncoder, encode_columns};
use crate::processing::{
    ImputeStrategy, drop_duplicates, filter_outliers_or_keep, impute_missing, normalize_text,
    outliers, prune, prune_or_keep, scale,
};
use crate::types::DataSet;

/// Prefix of the processed output file (prepended to the merged artifact's name).
pub const PROCESSED_PREFIX: &str = "processed_";

/// A fail-soft stage that returned its input unchanged.
#[derive(Debug)]
pub struct DegradedStage {
    pub stage: &'static str,
    pub error: PrepError,
}

/// Result of running the stages over one table.
#[derive(Debug)]
pub struct Processed {
    pub dataset: DataSet,
    pub degraded: Vec<DegradedStage>,
    /// Present when label encoding ran.
    pub codebook: Option<LabelCodebook>,
}

/// Outcome of one merged group.
#[derive(Debug)]
pub struct GroupReport {
    pub representative: String,
    pub members: Vec<String>,
    /// Written output file; `None` if the group failed.
    pub output: Option<PathBuf>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub degraded: Vec<DegradedStage>,
    pub error: Option<PrepError>,
}

impl GroupReport {
    fn new(group: &FileGroup) -> Self {
        Self {
            representative: group.representative.clone(),
            members: group.members.clone(),
            output: None,
            rows_in: 0,
            rows_out: 0,
            degraded: Vec::new(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// JSON summary (errors rendered as messages).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "representative": self.representative,
            "members": self.members,
            "output": self.output.as_ref().map(|p| p.display().to_string()),
            "rows_in": self.rows_in,
            "rows_out": self.rows_out,
            "degraded": self
                .degraded
                .iter()
                .map(|d| serde_json::json!({ "stage": d.stage, "error": d.error.to_string() }))
                .collect::<Vec<_>>(),
            "error": self.error.as_ref().map(|e| e.to_string()),
        })
    }
}

/// Outcome of a whole run, one entry per group in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.groups.iter().all(GroupReport::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| !g.is_success())
    }

    /// Paths of every written output file.
    pub fn outputs(&self) -> Vec<&Path> {
        self.groups.iter().filter_map(|g| g.output.as_deref()).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "succeeded": self.groups.iter().filter(|g| g.is_success()).count(),
            "failed": self.failures().count(),
            "groups": self.groups.iter().map(GroupReport::to_json).collect::<Vec<_>>(),
        })
    }
}

/// The cleaning pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    observer: Option<Arc<dyn PipelineObserver>>,
    alert_at_or_above: PipelineSeverity,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: None,
            alert_at_or_above: PipelineSeverity::Critical,
        }
    }

    /// Attach an observer for group outcomes.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Severity at which `on_alert` is invoked (default: Critical).
    pub fn with_alert_threshold(mut self, severity: PipelineSeverity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every CSV group of `input_dir` into `output_dir`.
    ///
    /// For each group of similarly named files: merge into `merged_<name>`, run the stages,
    /// write `processed_merged_<name>`, and remove the merged artifact. Returns `Err` only if the
    /// run cannot start (bad config, unreadable input directory, uncreatable output directory);
    /// per-group failures are reported in the [`RunReport`].
    pub fn run(
        &self,
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> PrepResult<RunReport> {
        let input_dir = input_dir.as_ref();
        let output_dir = output_dir.as_ref();
        self.config.validate()?;
        if !input_dir.is_dir() {
            return Err(PrepError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input directory not found: {}", input_dir.display()),
            )));
        }
        std::fs::create_dir_all(output_dir)?;

        let groups = plan_groups(input_dir, self.config.similarity_threshold)?;
        info!(
            input = %input_dir.display(),
            output = %output_dir.display(),
            groups = groups.len(),
            "starting run"
        );

        let mut report = RunReport::default();
        for group in &groups {
            report.groups.push(self.process_group(input_dir, output_dir, group));
        }
        info!(
            succeeded = report.groups.len() - report.failures().count(),
            failed = report.failures().count(),
            "run finished"
        );
        Ok(report)
    }

    fn process_group(&self, input_dir: &Path, output_dir: &Path, group: &FileGroup) -> GroupReport {
        let _span = info_span!("group", representative = %group.representative).entered();
        let ctx = GroupContext {
            representative: group.representative.clone(),
            shards: group.members.len(),
        };
        let mut report = GroupReport::new(group);

        let outcome = self.run_group(input_dir, output_dir, group, &ctx, &mut report);

        let merged = output_dir.join(format!("{MERGED_PREFIX}{}", group.representative));
        if merged.exists() {
            if let Err(err) = std::fs::remove_file(&merged) {
                warn!(path = %merged.display(), %err, "could not remove merged artifact");
            }
        }

        match outcome {
            Ok(stats) => {
                report.output = Some(stats.output.clone());
                if let Some(obs) = &self.observer {
                    obs.on_group_success(&ctx, &stats);
                }
            }
            Err(err) => {
                let severity = PipelineSeverity::for_error(&err);
                if let Some(obs) = &self.observer {
                    obs.on_group_failure(&ctx, severity, &err);
                    if severity >= self.alert_at_or_above {
                        obs.on_alert(&ctx, severity, &err);
                    }
                }
                report.error = Some(err);
            }
        }
        report
    }

    fn run_group(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        group: &FileGroup,
        ctx: &GroupContext,
        report: &mut GroupReport,
    ) -> PrepResult<GroupStats> {
        let merged = merge_group(input_dir, output_dir, group)?;
        let dataset = read_csv_inferred(&merged.path)?;
        report.rows_in = dataset.row_count();

        let processed = self.process_dataset(dataset)?;
        if let Some(obs) = &self.observer {
            for d in &processed.degraded {
                obs.on_stage_degraded(ctx, d.stage, PipelineSeverity::Warning, &d.error);
            }
        }
        report.degraded = processed.degraded;

        if self.config.persist_codebooks {
            if let Some(codebook) = &processed.codebook {
                let stem = file_stem(&group.representative);
                let path = output_dir.join(format!("codebook_{stem}.json"));
                codebook.to_json_path(path)?;
            }
        }

        let output = output_dir.join(format!(
            "{PROCESSED_PREFIX}{MERGED_PREFIX}{}",
            group.representative
        ));
        write_csv(&output, &processed.dataset)?;
        report.rows_out = processed.dataset.row_count();

        Ok(GroupStats {
            rows_in: report.rows_in,
            rows_out: report.rows_out,
            columns_out: processed.dataset.column_count(),
            output,
        })
    }

    /// Run every stage over one table, in order: threshold pruning, optional imputation,
    /// outlier filtering, text normalization, deduplication, encoding, scaling.
    ///
    /// The identifier column is added to the exclusions before any stage runs. Pruning and
    /// outlier filtering degrade to no-ops on internal errors (recorded in
    /// [`Processed::degraded`]); an unknown encode/scale/impute method is an error.
    pub fn process_dataset(&self, dataset: DataSet) -> PrepResult<Processed> {
        let cfg = &self.config;
        let excluded = cfg.effective_exclusions();
        let mut degraded = Vec::new();

        let (dataset, error) = prune_or_keep(
            dataset,
            &cfg.identifier_column,
            cfg.row_threshold,
            cfg.column_threshold,
            &excluded,
        );
        if let Some(error) = error {
            degraded.push(DegradedStage {
                stage: prune::STAGE,
                error,
            });
        }

        let dataset = match &cfg.impute_strategy {
            Some(name) => impute_missing(dataset, name.parse::<ImputeStrategy>()?, &excluded),
            None => dataset,
        };

        let (dataset, error) = filter_outliers_or_keep(dataset, cfg.z_threshold, &excluded);
        if let Some(error) = error {
            degraded.push(DegradedStage {
                stage: outliers::STAGE,
                error,
            });
        }

        let dataset = normalize_text(dataset, None, &excluded);
        let dataset = drop_duplicates(dataset);

        let method: EncodeMethod = cfg.encode_method.parse()?;
        let targets = encode_columns(&dataset, None, &excluded);
        let (dataset, codebook) = match method {
            EncodeMethod::OneHot => {
                let encoder = OneHotEncoder::fit(&dataset, &targets);
                (encoder.transform(dataset), None)
            }
            EncodeMethod::Label => {
                let codebook = LabelCodebook::fit(&dataset, &targets);
                (codebook.transform(dataset), Some(codebook))
            }
            EncodeMethod::None => (dataset, None),
        };

        let dataset = scale(dataset, None, &excluded, &cfg.scale_method)?;

        Ok(Processed {
            dataset,
            degraded,
            codebook,
        })
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}
