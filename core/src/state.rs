use crate::TaskConfig;

/// Mutable per-phase state exclusively owned by the running phase.
///
/// Only the calibration feedback and the plant model write the
/// difficulty-shaping fields (`difficulty`, `difficulty_intercept`,
/// `difficulty_slope`); the scheduler writes positions, timestamps and flags.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    /// Index of the tick currently being processed.
    pub tick_index: u64,
    /// Stimulus position on the tracked axis.
    pub stim_pos: f64,
    /// Corrective position reported by the input device.
    pub user_pos: f64,
    /// Difficulty coefficient applied by the plant this tick.
    pub difficulty: f64,
    /// Standing difficulty baseline lowered on every failure.
    pub difficulty_intercept: f64,
    /// Growth of the difficulty over elapsed time.
    pub difficulty_slope: f64,
    /// Ceiling applied when the difficulty evolves.
    pub max_difficulty: f64,
    /// Combined displacement measured by the last plant update.
    pub distance_to_center: f64,
    /// Stimulus displacement applied by the last plant update.
    pub change_rate: f64,
    /// Set while a failure is being handled.
    pub out_of_bounds: bool,
    /// Number of failures observed in this phase.
    pub failure_count: u32,
    /// Cumulative score.
    pub score: f64,
    /// Realized timestamp of the last flip on the experiment clock, in seconds.
    pub flip_time: f64,
    /// Scheduled onset of the last flip, in seconds.
    pub expected_time: f64,
    /// Requests that the phase stops at the end of the current tick.
    pub stop: bool,
    /// Marks that the current tick went through crash recovery; cleared after logging.
    pub did_crash: bool,
}

impl SessionState {
    /// Creates a fresh state seeded from the phase configuration.
    #[must_use]
    pub fn seeded(config: &TaskConfig) -> Self {
        Self {
            tick_index: 0,
            stim_pos: 0.0,
            user_pos: 0.0,
            difficulty: config.initial_difficulty(),
            difficulty_intercept: config.initial_difficulty(),
            difficulty_slope: config.slope(),
            max_difficulty: config.max_difficulty(),
            distance_to_center: 0.0,
            change_rate: 0.0,
            out_of_bounds: false,
            failure_count: 0,
            score: 0.0,
            flip_time: 0.0,
            expected_time: 0.0,
            stop: false,
            did_crash: false,
        }
    }

    /// Caps the difficulty at `ceiling` and starts the phase at half of it.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: f64) -> Self {
        self.max_difficulty = ceiling;
        self.difficulty = ceiling * 0.5;
        self
    }

    /// Carries a score over from an earlier phase.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState;
    use crate::{TaskConfig, TaskMode};

    #[test]
    fn seeded_state_starts_at_initial_difficulty() {
        let config = TaskConfig::new(TaskMode::Calibrate)
            .with_initial_difficulty(0.1)
            .expect("valid difficulty");
        let state = SessionState::seeded(&config);

        assert!((state.difficulty - 0.1).abs() < f64::EPSILON);
        assert!((state.difficulty_intercept - 0.1).abs() < f64::EPSILON);
        assert!((state.difficulty_slope - config.slope()).abs() < f64::EPSILON);
        assert_eq!(state.failure_count, 0);
        assert!(!state.stop);
    }

    #[test]
    fn ceiling_seeds_half_difficulty() {
        let config = TaskConfig::new(TaskMode::Assessment);
        let state = SessionState::seeded(&config).with_ceiling(0.06);

        assert!((state.max_difficulty - 0.06).abs() < f64::EPSILON);
        assert!((state.difficulty - 0.03).abs() < 1e-12);
    }
}
