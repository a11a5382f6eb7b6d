use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use cohort_prep::ingestion::{
    FileObserver, GroupContext, GroupStats, PipelineObserver, PipelineSeverity,
};
use cohort_prep::{Pipeline, PipelineConfig, PrepError};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, PipelineSeverity)>>,
    alerts: Mutex<Vec<PipelineSeverity>>,
    degraded: Mutex<Vec<(String, String, PipelineSeverity)>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_group_success(&self, ctx: &GroupContext, _stats: &GroupStats) {
        self.successes.lock().unwrap().push(ctx.representative.clone());
    }

    fn on_group_failure(
        &self,
        ctx: &GroupContext,
        severity: PipelineSeverity,
        _error: &PrepError,
    ) {
        self.failures
            .lock()
            .unwrap()
            .push((ctx.representative.clone(), severity));
    }

    fn on_alert(&self, _ctx: &GroupContext, severity: PipelineSeverity, _error: &PrepError) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_stage_degraded(
        &self,
        ctx: &GroupContext,
        stage: &str,
        severity: PipelineSeverity,
        _error: &PrepError,
    ) {
        self.degraded
            .lock()
            .unwrap()
            .push((ctx.representative.clone(), stage.to_string(), severity));
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!("cohort_prep_{name}_{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Three unrelated groups: header-only, ragged, and healthy.
fn write_inputs(dir: &Path) {
    fs::write(dir.join("empty_c.csv"), "PatientID,Age\n").unwrap();
    fs::write(dir.join("ragged_b.csv"), "PatientID,Age\n1,40,extra\n").unwrap();
    fs::write(dir.join("patients_a.csv"), "PatientID,Age\n1,40\n2,50\n").unwrap();
}

#[test]
fn observer_sees_success_failure_and_degraded_stage() {
    let input = temp_dir("obs_in");
    let output = temp_dir("obs_out");
    write_inputs(&input);

    let obs = Arc::new(RecordingObserver::default());
    let report = Pipeline::new(PipelineConfig::new("PatientID"))
        .with_observer(obs.clone())
        .run(&input, &output)
        .unwrap();

    let _ = fs::remove_dir_all(&input);
    let _ = fs::remove_dir_all(&output);

    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec!["empty_c.csv".to_string(), "patients_a.csv".to_string()]
    );
    // Ragged records are a data error, below the default Critical alert threshold.
    assert_eq!(
        *obs.failures.lock().unwrap(),
        vec![("ragged_b.csv".to_string(), PipelineSeverity::Error)]
    );
    assert!(obs.alerts.lock().unwrap().is_empty());
    assert_eq!(
        *obs.degraded.lock().unwrap(),
        vec![(
            "empty_c.csv".to_string(),
            "threshold_prune".to_string(),
            PipelineSeverity::Warning
        )]
    );

    let empty = &report.groups[0];
    assert_eq!(empty.degraded.len(), 1);
    assert!(matches!(empty.degraded[0].error, PrepError::EmptyTable { .. }));
}

#[test]
fn degraded_stages_rank_below_group_failures() {
    assert!(PipelineSeverity::Warning < PipelineSeverity::Error);
    assert!(PipelineSeverity::Error < PipelineSeverity::Critical);
}

#[test]
fn alert_threshold_is_configurable() {
    let input = temp_dir("obs_alert_in");
    let output = temp_dir("obs_alert_out");
    write_inputs(&input);

    let obs = Arc::new(RecordingObserver::default());
    Pipeline::new(PipelineConfig::new("PatientID"))
        .with_observer(obs.clone())
        .with_alert_threshold(PipelineSeverity::Error)
        .run(&input, &output)
        .unwrap();

    let _ = fs::remove_dir_all(&input);
    let _ = fs::remove_dir_all(&output);

    assert_eq!(*obs.alerts.lock().unwrap(), vec![PipelineSeverity::Error]);
}

#[test]
fn file_observer_appends_one_line_per_event() {
    let input = temp_dir("obs_file_in");
    let output = temp_dir("obs_file_out");
    let log = output.join("events.log");
    write_inputs(&input);

    Pipeline::new(PipelineConfig::new("PatientID"))
        .with_observer(Arc::new(FileObserver::new(&log)))
        .run(&input, &output)
        .unwrap();

    let text = fs::read_to_string(&log).unwrap();
    let _ = fs::remove_dir_all(&input);
    let _ = fs::remove_dir_all(&output);

    assert_eq!(text.lines().filter(|l| l.contains(" ok ")).count(), 2);
    assert_eq!(text.lines().filter(|l| l.contains(" fail ")).count(), 1);
    assert_eq!(
        text.lines()
            .filter(|l| l.contains(" degraded severity=Warning stage=threshold_prune "))
            .count(),
        1
    );
    assert!(text.contains("group=ragged_b.csv"));
}
