#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Adaptive calibration feedback that lowers difficulty on every failure.
//!
//! [`CalibrationFeedback::on_tick`] is the only writer of the
//! difficulty-shaping fields outside the plant model. It also owns the
//! failure-target stop and accumulates the [`CalibrationOutcome`] consumed when
//! the assessment ceiling is derived.

use cst_core::{
    CalibrationOutcome, ConfigError, SessionState, TaskConfig, TaskMode, TOP_FAILURES,
};
use tracing::debug;

/// Result of evaluating the feedback rule for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdaptationResult {
    /// Whether a failure was detected and the difficulty lowered.
    pub applied: bool,
    /// Difficulty in effect when the failure was detected.
    pub failed_at_difficulty: Option<f64>,
}

/// Stateful failure-driven difficulty adaptation.
#[derive(Clone, Debug, Default)]
pub struct CalibrationFeedback {
    outcome: CalibrationOutcome,
}

impl CalibrationFeedback {
    /// Creates feedback with an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates the out-of-bounds rule and the failure-target stop.
    ///
    /// The duration bound is enforced by the tick loop, not here.
    ///
    /// On a failure the intercept drops by the scheduled fraction of the
    /// current difficulty, the slope decays and the failure count grows.
    /// A schedule shorter than the failures incurred is a configuration error.
    pub fn on_tick(
        &mut self,
        state: &mut SessionState,
        config: &TaskConfig,
    ) -> Result<AdaptationResult, ConfigError> {
        let mut result = AdaptationResult::default();

        if !state.stop && is_out_of_bounds(state.distance_to_center, config.max_bounds()) {
            let scale = config.scale_schedule().factor(state.failure_count)?;
            let difficulty = state.difficulty;

            state.out_of_bounds = true;
            state.difficulty_intercept -= scale * difficulty.max(0.0);
            state.difficulty_slope *= config.slope_decay();
            state.failure_count += 1;
            self.outcome.record_failure(difficulty);

            debug!(
                failures = state.failure_count,
                difficulty,
                intercept = state.difficulty_intercept,
                slope = state.difficulty_slope,
                "failure adapted"
            );

            result = AdaptationResult {
                applied: true,
                failed_at_difficulty: Some(difficulty),
            };
        }

        if reached_failure_target(state, config) {
            state.stop = true;
        }

        Ok(result)
    }

    /// Failure difficulties recorded so far.
    #[must_use]
    pub fn outcome(&self) -> &CalibrationOutcome {
        &self.outcome
    }

    /// Consumes the feedback, yielding its outcome.
    #[must_use]
    pub fn into_outcome(self) -> CalibrationOutcome {
        self.outcome
    }
}

/// Reports whether the combined displacement exceeds the bound.
#[must_use]
pub fn is_out_of_bounds(distance: f64, max_bounds: f64) -> bool {
    distance > max_bounds
}

/// Reports whether a calibration phase has accrued its required failures.
#[must_use]
pub fn reached_failure_target(state: &SessionState, config: &TaskConfig) -> bool {
    config.mode() == TaskMode::Calibrate && state.failure_count >= config.required_failures()
}

/// Derives the assessment ceiling from the best calibration failures.
///
/// The three highest failure difficulties are averaged and scaled by
/// `proportion`.
pub fn derive_assessment_ceiling(
    outcome: &CalibrationOutcome,
    proportion: f64,
) -> Result<f64, ConfigError> {
    let observed = outcome.len();
    if observed < TOP_FAILURES {
        return Err(ConfigError::InsufficientFailures {
            observed,
            required: TOP_FAILURES,
        });
    }

    let mut sorted = outcome.failure_difficulties().to_vec();
    sorted.sort_by(f64::total_cmp);
    let best = &sorted[observed - TOP_FAILURES..];
    let mean = best.iter().sum::<f64>() / TOP_FAILURES as f64;
    Ok(mean * proportion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_exclusive() {
        assert!(is_out_of_bounds(0.80001, 0.8));
        assert!(!is_out_of_bounds(0.8, 0.8));
        assert!(!is_out_of_bounds(0.79999, 0.8));
    }
}
