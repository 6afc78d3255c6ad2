use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use cst_core::{CalibrationOutcome, TaskMode, TrialLog, TRIAL_COLUMNS};
use tracing::info;

use crate::SessionError;

/// File collecting one line of failure difficulties per calibration phase.
pub const CALIBRATION_SUMMARY_FILE: &str = "calibration_lambdas.csv";

const END_COLUMN: &str = "datetime_ended";
const END_FORMAT: &str = "%m/%d/%Y,%H:%M:%S";
const MAX_VARIANTS: u32 = 999;

/// Destination for the artefacts a phase leaves behind.
pub trait PhaseRecorder {
    /// Persists the per-tick log of a finished phase.
    fn record_phase(&mut self, mode: TaskMode, log: &TrialLog) -> Result<(), SessionError>;

    /// Persists the failure difficulties of a finished calibration phase.
    fn record_calibration(&mut self, outcome: &CalibrationOutcome) -> Result<(), SessionError>;
}

/// Participant and run identifiers embedded in output paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionIds {
    subject: String,
    visit: String,
    run: String,
}

impl SessionIds {
    /// Creates identifiers for one participant visit.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        visit: impl Into<String>,
        run: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            visit: visit.into(),
            run: run.into(),
        }
    }

    /// Participant identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Visit identifier.
    #[must_use]
    pub fn visit(&self) -> &str {
        &self.visit
    }

    /// Run identifier.
    #[must_use]
    pub fn run(&self) -> &str {
        &self.run
    }
}

/// Writes per-phase CSV logs under a BIDS-like directory tree.
#[derive(Clone, Debug)]
pub struct CsvRecorder {
    root: PathBuf,
    ids: SessionIds,
}

impl CsvRecorder {
    /// Creates a recorder writing below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, ids: SessionIds) -> Self {
        Self {
            root: root.into(),
            ids,
        }
    }

    /// Directory holding the raw per-phase logs.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.root
            .join(format!("sub-{}", self.ids.subject))
            .join(format!("ses-{}", self.ids.visit))
            .join("raw")
    }

    /// Preferred path of the log written for `mode`.
    #[must_use]
    pub fn phase_path(&self, mode: TaskMode) -> PathBuf {
        self.raw_dir().join(format!(
            "sub-{}_ses-{}_task-{}_run-{}_events.csv",
            self.ids.subject,
            self.ids.visit,
            mode.file_label(),
            self.ids.run
        ))
    }

    /// Path of the cross-session calibration summary.
    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.root.join(CALIBRATION_SUMMARY_FILE)
    }

    /// Writes the trial log with a trailing end-timestamp column and returns the path used.
    pub fn write_trial_log(
        &self,
        mode: TaskMode,
        log: &TrialLog,
        ended: DateTime<Local>,
    ) -> Result<PathBuf, SessionError> {
        fs::create_dir_all(self.raw_dir())?;
        let path = non_clobbering_path(&self.phase_path(mode))?;

        let mut writer = csv::Writer::from_path(&path)?;
        let mut header: Vec<&str> = TRIAL_COLUMNS.to_vec();
        header.push(END_COLUMN);
        writer.write_record(&header)?;

        let ended = ended.format(END_FORMAT).to_string();
        for record in log.records() {
            let fields = record.fields();
            writer.write_record(fields.iter().map(String::as_str).chain([ended.as_str()]))?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = log.len(), "trial log written");
        Ok(path)
    }

    /// Appends one line describing a calibration phase to the cross-session summary.
    pub fn append_calibration_line(
        &self,
        outcome: &CalibrationOutcome,
        ended: DateTime<Local>,
    ) -> Result<PathBuf, SessionError> {
        fs::create_dir_all(&self.root)?;
        let path = self.summary_path();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(file);

        let mut line = vec![
            self.ids.subject.clone(),
            format!("ses-{}", self.ids.visit),
            format!("task-{}", TaskMode::Calibrate.file_label()),
            format!("run-{}", self.ids.run),
            "events".to_owned(),
            ended.format("%m/%d/%Y").to_string(),
            ended.format("%H:%M:%S").to_string(),
        ];
        line.extend(
            outcome
                .failure_difficulties()
                .iter()
                .map(ToString::to_string),
        );
        writer.write_record(&line)?;
        writer.flush()?;

        info!(path = %path.display(), failures = outcome.len(), "calibration summary appended");
        Ok(path)
    }
}

impl PhaseRecorder for CsvRecorder {
    fn record_phase(&mut self, mode: TaskMode, log: &TrialLog) -> Result<(), SessionError> {
        let _ = self.write_trial_log(mode, log, Local::now())?;
        Ok(())
    }

    fn record_calibration(&mut self, outcome: &CalibrationOutcome) -> Result<(), SessionError> {
        let _ = self.append_calibration_line(outcome, Local::now())?;
        Ok(())
    }
}

/// Returns `preferred` when it is free, otherwise the first free
/// `<stem>_NNN.<ext>` sibling.
pub fn non_clobbering_path(preferred: &Path) -> Result<PathBuf, SessionError> {
    if !preferred.exists() {
        return Ok(preferred.to_path_buf());
    }

    let stem = preferred
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = preferred
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    for index in 1..=MAX_VARIANTS {
        let candidate = preferred.with_file_name(format!("{stem}_{index:03}{extension}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free name left for {} after {MAX_VARIANTS} variants",
            preferred.display()
        ),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_paths_follow_task_labels() {
        let recorder = CsvRecorder::new("/data", SessionIds::new("007", "1", "2"));

        assert_eq!(
            recorder.phase_path(TaskMode::Calibrate),
            PathBuf::from("/data/sub-007/ses-1/raw/sub-007_ses-1_task-CPTCalibrate_run-2_events.csv")
        );
        assert!(recorder
            .phase_path(TaskMode::Assessment)
            .ends_with("sub-007_ses-1_task-CPT_run-2_events.csv"));
        assert_eq!(
            recorder.summary_path(),
            PathBuf::from("/data/calibration_lambdas.csv")
        );
    }
}
