use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PrepError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineSeverity {
    /// A fail-soft stage returned its input unchanged; the group still succeeds.
    Warning,
    /// A group failed on its data or configuration.
    Error,
    /// A group failed on I/O or other infrastructure.
    Critical,
}

impl PipelineSeverity {
    /// Classify a group failure.
    pub fn for_error(err: &PrepError) -> Self {
        if err.is_infrastructure() {
            PipelineSeverity::Critical
        } else {
            PipelineSeverity::Error
        }
    }
}

/// Context about the group being processed.
#[derive(Debug, Clone)]
pub struct GroupContext {
    /// Representative input filename of the group.
    pub representative: String,
    /// Number of input shards merged into the group.
    pub shards: usize,
}

/// Minimal stats reported when a group is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    pub output: PathBuf,
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called when a group has been processed and written.
    fn on_group_success(&self, _ctx: &GroupContext, _stats: &GroupStats) {}

    /// Called when a group fails.
    fn on_group_failure(
        &self,
        _ctx: &GroupContext,
        _severity: PipelineSeverity,
        _error: &PrepError,
    ) {
    }

    /// Called when a group failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_group_failure`].
    fn on_alert(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        self.on_group_failure(ctx, severity, error)
    }

    /// Called with [`PipelineSeverity::Warning`] when a fail-soft stage returned its input
    /// unchanged.
    fn on_stage_degraded(
        &self,
        _ctx: &GroupContext,
        _stage: &str,
        _severity: PipelineSeverity,
        _error: &PrepError,
    ) {
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_group_success(&self, ctx: &GroupContext, stats: &GroupStats) {
        for o in &self.observers {
            o.on_group_success(ctx, stats);
        }
    }

    fn on_group_failure(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        for o in &self.observers {
            o.on_group_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_stage_degraded(
        &self,
        ctx: &GroupContext,
        stage: &str,
        severity: PipelineSeverity,
        error: &PrepError,
    ) {
        for o in &self.observers {
            o.on_stage_degraded(ctx, stage, severity, error);
        }
    }
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_group_success(&self, ctx: &GroupContext, stats: &GroupStats) {
        tracing::info!(
            group = %ctx.representative,
            shards = ctx.shards,
            rows_in = stats.rows_in,
            rows_out = stats.rows_out,
            columns = stats.columns_out,
            output = %stats.output.display(),
            "group processed"
        );
    }

    fn on_group_failure(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        tracing::error!(group = %ctx.representative, ?severity, %error, "group failed");
    }

    fn on_alert(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        tracing::error!(group = %ctx.representative, ?severity, %error, "ALERT");
    }

    fn on_stage_degraded(
        &self,
        ctx: &GroupContext,
        stage: &str,
        severity: PipelineSeverity,
        error: &PrepError,
    ) {
        tracing::warn!(group = %ctx.representative, stage, ?severity, %error, "stage degraded");
    }
}

/// Appends pipeline events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_group_success(&self, ctx: &GroupContext, stats: &GroupStats) {
        self.append_line(&format!(
            "{} ok group={} shards={} rows_in={} rows_out={} output={}",
            unix_ts(),
            ctx.representative,
            ctx.shards,
            stats.rows_in,
            stats.rows_out,
            stats.output.display()
        ));
    }

    fn on_group_failure(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        self.append_line(&format!(
            "{} fail severity={:?} group={} err={}",
            unix_ts(),
            severity,
            ctx.representative,
            error
        ));
    }

    fn on_alert(&self, ctx: &GroupContext, severity: PipelineSeverity, error: &PrepError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} group={} err={}",
            unix_ts(),
            severity,
            ctx.representative,
            error
        ));
    }

    fn on_stage_degraded(
        &self,
        ctx: &GroupContext,
        stage: &str,
        severity: PipelineSeverity,
        error: &PrepError,
    ) {
        self.append_line(&format!(
            "{} degraded severity={:?} stage={} group={} err={}",
            unix_ts(),
            severity,
            stage,
            ctx.representative,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
