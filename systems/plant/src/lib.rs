#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure plant model that advances the drifting stimulus and its difficulty.
//!
//! The plant never mutates state on its own: [`advance`] reads the current
//! [`SessionState`] and returns a [`PlantStep`] that the caller commits.

use cst_core::{SessionState, TaskConfig};

/// Scale between the difficulty coefficient and the per-tick drift factor.
pub const DIFFICULTY_DIVISOR: f64 = 10.0;

/// Time scale applied to the elapsed flip time when evolving difficulty.
const SLOPE_TIME_SCALE: f64 = 1000.0;

/// Values produced by one plant update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlantStep {
    /// Stimulus position after this tick's drift.
    pub next_stim_pos: f64,
    /// Combined displacement of the stimulus and corrective positions before the drift.
    pub distance: f64,
    /// Displacement applied to the stimulus this tick.
    pub change_rate: f64,
    /// Difficulty to use from the next tick on.
    pub next_difficulty: f64,
    /// Score earned this tick.
    pub score_gain: f64,
}

impl PlantStep {
    /// Writes the step into the provided state.
    pub fn commit(self, state: &mut SessionState) {
        state.stim_pos = self.next_stim_pos;
        state.distance_to_center = self.distance;
        state.change_rate = self.change_rate;
        state.difficulty = self.next_difficulty;
        state.score += self.score_gain;
    }
}

/// Combined displacement of the stimulus and the corrective input.
///
/// The two positions are added rather than subtracted: the corrective input
/// cancels the stimulus when it points the opposite way.
#[must_use]
pub fn compute_distance(stim_pos: f64, user_pos: f64) -> f64 {
    (stim_pos + user_pos).abs()
}

/// Per-tick drift of the stimulus for the provided difficulty.
#[must_use]
pub fn compute_rate(stim_pos: f64, user_pos: f64, difficulty: f64) -> f64 {
    (difficulty / DIFFICULTY_DIVISOR) * (stim_pos + user_pos)
}

/// Evolves the difficulty from its intercept and slope, capped at `max_difficulty`.
///
/// `elapsed` is the last realized flip time in seconds.
#[must_use]
pub fn update_difficulty(intercept: f64, slope: f64, elapsed: f64, max_difficulty: f64) -> f64 {
    let candidate = intercept + slope * elapsed / SLOPE_TIME_SCALE;
    candidate.min(max_difficulty)
}

/// Score earned by a tick that starts at `stim_pos`.
#[must_use]
pub fn score_increment(stim_pos: f64, config: &TaskConfig) -> f64 {
    if stim_pos.abs() < config.score_radius() {
        config.score_rate() * config.tick_period()
    } else {
        0.0
    }
}

/// Computes the next plant step from the current state.
#[must_use]
pub fn advance(state: &SessionState, config: &TaskConfig) -> PlantStep {
    let change_rate = compute_rate(state.stim_pos, state.user_pos, state.difficulty);
    PlantStep {
        next_stim_pos: state.stim_pos + change_rate,
        distance: compute_distance(state.stim_pos, state.user_pos),
        change_rate,
        next_difficulty: update_difficulty(
            state.difficulty_intercept,
            state.difficulty_slope,
            state.flip_time,
            state.max_difficulty,
        ),
        score_gain: score_increment(state.stim_pos, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_adds_positions() {
        assert!((compute_distance(0.3, 0.2) - 0.5).abs() < 1e-12);
        assert!((compute_distance(0.3, -0.3)).abs() < 1e-12);
        assert!((compute_distance(-0.6, -0.3) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn rate_scales_with_difficulty() {
        let rate = compute_rate(0.5, 0.0, 2.0);
        assert!((rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn difficulty_grows_with_elapsed_time() {
        let value = update_difficulty(0.1, 20.0, 30.0, 10.0);
        assert!((value - 0.7).abs() < 1e-12);
    }
}
