use crate::SessionState;

/// Column names of the per-tick log, in persisted order.
pub const TRIAL_COLUMNS: [&str; 9] = [
    "expected_time",
    "flip_time",
    "stim_pos",
    "user_pos",
    "crash_count",
    "lambda_val",
    "change_rate_x",
    "did_crash",
    "lambda_slope",
];

/// Units of the per-tick log columns, aligned with [`TRIAL_COLUMNS`].
pub const TRIAL_UNITS: [&str; 9] = [
    "seconds",
    "seconds",
    "arbitrary_distance",
    "arbitrary_distance",
    "integer_count",
    "units_per_second",
    "units_per_second",
    "binary_state",
    "units_per_second",
];

/// Immutable snapshot of the logged state fields taken at the end of a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialRecord {
    /// Scheduled onset of the tick, in seconds.
    pub expected_time: f64,
    /// Realized flip timestamp, in seconds.
    pub flip_time: f64,
    /// Stimulus position after the plant update.
    pub stim_pos: f64,
    /// Corrective position polled this tick.
    pub user_pos: f64,
    /// Failures observed so far in the phase.
    pub crash_count: u32,
    /// Difficulty after the plant update.
    pub lambda_val: f64,
    /// Stimulus displacement applied this tick.
    pub change_rate_x: f64,
    /// Whether the tick went through crash recovery.
    pub did_crash: bool,
    /// Difficulty slope after any adaptation.
    pub lambda_slope: f64,
}

impl TrialRecord {
    /// Captures the logged subset of the provided state.
    #[must_use]
    pub fn capture(state: &SessionState) -> Self {
        Self {
            expected_time: state.expected_time,
            flip_time: state.flip_time,
            stim_pos: state.stim_pos,
            user_pos: state.user_pos,
            crash_count: state.failure_count,
            lambda_val: state.difficulty,
            change_rate_x: state.change_rate,
            did_crash: state.did_crash,
            lambda_slope: state.difficulty_slope,
        }
    }

    /// Numeric values in column order, as pushed to telemetry streams.
    #[must_use]
    pub fn values(&self) -> [f64; 9] {
        [
            self.expected_time,
            self.flip_time,
            self.stim_pos,
            self.user_pos,
            f64::from(self.crash_count),
            self.lambda_val,
            self.change_rate_x,
            if self.did_crash { 1.0 } else { 0.0 },
            self.lambda_slope,
        ]
    }

    /// Textual fields in column order, as written to tabular logs.
    #[must_use]
    pub fn fields(&self) -> [String; 9] {
        [
            self.expected_time.to_string(),
            self.flip_time.to_string(),
            self.stim_pos.to_string(),
            self.user_pos.to_string(),
            self.crash_count.to_string(),
            self.lambda_val.to_string(),
            self.change_rate_x.to_string(),
            u8::from(self.did_crash).to_string(),
            self.lambda_slope.to_string(),
        ]
    }
}

/// Append-only per-phase log of trial records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialLog {
    records: Vec<TrialRecord>,
}

impl TrialLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record; existing records are never touched.
    pub fn append(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    /// Records in append order.
    #[must_use]
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Number of logged ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Reports whether nothing was logged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Difficulty values at which failures occurred during a calibration phase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationOutcome {
    failure_difficulties: Vec<f64>,
}

impl CalibrationOutcome {
    /// Creates an outcome from previously recorded failure difficulties.
    #[must_use]
    pub fn from_difficulties(failure_difficulties: Vec<f64>) -> Self {
        Self {
            failure_difficulties,
        }
    }

    /// Records the difficulty in effect when a failure occurred.
    pub fn record_failure(&mut self, difficulty: f64) {
        self.failure_difficulties.push(difficulty);
    }

    /// Failure difficulties in the order they occurred.
    #[must_use]
    pub fn failure_difficulties(&self) -> &[f64] {
        &self.failure_difficulties
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failure_difficulties.len()
    }

    /// Reports whether no failure was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failure_difficulties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TaskConfig, TaskMode};

    #[test]
    fn record_captures_logged_subset_in_column_order() {
        let mut state = SessionState::seeded(&TaskConfig::new(TaskMode::Calibrate));
        state.expected_time = 1.5;
        state.flip_time = 1.497;
        state.stim_pos = 0.25;
        state.user_pos = -0.1;
        state.failure_count = 2;
        state.did_crash = true;

        let record = TrialRecord::capture(&state);
        let values = record.values();

        assert_eq!(values.len(), TRIAL_COLUMNS.len());
        assert!((values[0] - 1.5).abs() < f64::EPSILON);
        assert!((values[4] - 2.0).abs() < f64::EPSILON);
        assert!((values[7] - 1.0).abs() < f64::EPSILON);
        assert_eq!(record.fields()[7], "1");
    }
}
