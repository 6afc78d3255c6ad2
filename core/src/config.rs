use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, TaskMode};

/// Seconds added to a phase's duration bound before generating its onset schedule.
pub const SCHEDULE_PADDING_SECONDS: f64 = 30.0;

/// Difficulty-reduction factors applied on successive failures.
pub const DEFAULT_SCALE_SCHEDULE: [f64; 16] = [
    0.5, 0.5, 0.4, 0.4, 0.3, 0.3, 0.2, 0.2, 0.2, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1,
];

/// Longest onset schedule a phase may request.
pub const MAX_SCHEDULED_ONSETS: usize = 10_000_000;

const DEFAULT_TICK_RATE_HZ: f64 = 30.0;
const MAX_TICK_RATE_HZ: f64 = 1000.0;
const DEFAULT_MAX_SECONDS: f64 = 600.0;
const DEFAULT_MAX_BOUNDS: f64 = 0.8;
const DEFAULT_REQUIRED_FAILURES: u32 = 10;
const DEFAULT_INITIAL_DIFFICULTY: f64 = 0.125;
const DEFAULT_MAX_DIFFICULTY: f64 = 10.0;
const PRACTICE_INITIAL_DIFFICULTY: f64 = 0.01;
const PRACTICE_MAX_DIFFICULTY: f64 = 0.05;
const DEFAULT_SLOPE: f64 = 20.0;
const DEFAULT_SLOPE_DECAY: f64 = 0.95;
const DEFAULT_ASSESSMENT_PROPORTION: f64 = 0.5;
const DEFAULT_LEAD_IN_SECONDS: f64 = 1.0;
const DEFAULT_FLIP_MARGIN_SECONDS: f64 = 0.005;
const DEFAULT_CRASH_DISPLAY: Duration = Duration::from_millis(1500);
const DEFAULT_RESET_PAUSE: Duration = Duration::from_secs(1);
const DEFAULT_RESET_OFFSET: f64 = 0.005;
const DEFAULT_SCORE_RADIUS: f64 = 0.05;
const DEFAULT_SCORE_RATE: f64 = 1.25;

/// Ordered difficulty-reduction factors indexed by the current failure count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ScaleSchedule(Vec<f64>);

impl ScaleSchedule {
    /// Creates a schedule after checking every factor lies in `0.0..=1.0`.
    pub fn new(factors: Vec<f64>) -> Result<Self, ConfigError> {
        if factors.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        for &factor in &factors {
            if !factor.is_finite() || !(0.0..=1.0).contains(&factor) {
                return Err(ConfigError::InvalidValue {
                    field: "scale_schedule",
                    value: factor,
                    reason: "factors must lie within 0.0..=1.0",
                });
            }
        }
        Ok(Self(factors))
    }

    /// Looks up the factor for the provided failure count.
    pub fn factor(&self, failure_count: u32) -> Result<f64, ConfigError> {
        usize::try_from(failure_count)
            .ok()
            .and_then(|index| self.0.get(index).copied())
            .ok_or(ConfigError::ScheduleExhausted {
                failures: failure_count,
                schedule_len: self.0.len(),
            })
    }

    /// Number of failures the schedule can absorb.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Reports whether the schedule has no entries. Validated schedules never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Factors in failure order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Default for ScaleSchedule {
    fn default() -> Self {
        Self(DEFAULT_SCALE_SCHEDULE.to_vec())
    }
}

impl TryFrom<Vec<f64>> for ScaleSchedule {
    type Error = ConfigError;

    fn try_from(factors: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(factors)
    }
}

impl From<ScaleSchedule> for Vec<f64> {
    fn from(schedule: ScaleSchedule) -> Self {
        schedule.0
    }
}

/// How a phase's duration bound is turned into the span covered by its onset schedule.
///
/// The calibration and assessment parameter sets historically padded their
/// bound differently; both conventions are kept so that each phase's schedule
/// length stays reproducible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnsetHorizon {
    /// Horizon is the bound plus the padding, both in seconds.
    SecondsPadded,
    /// Bound is read as minutes with the padding converted to minutes, then scaled to seconds.
    MinutesPadded,
}

impl OnsetHorizon {
    /// Span in seconds that the onset schedule must cover for the provided bound.
    #[must_use]
    pub fn horizon_seconds(self, max_seconds: f64) -> f64 {
        match self {
            Self::SecondsPadded => max_seconds + SCHEDULE_PADDING_SECONDS,
            Self::MinutesPadded => (max_seconds + SCHEDULE_PADDING_SECONDS / 60.0) * 60.0,
        }
    }
}

/// Immutable parameters for a single phase.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskConfig {
    mode: TaskMode,
    tick_rate_hz: f64,
    max_seconds: f64,
    horizon: OnsetHorizon,
    max_bounds: f64,
    required_failures: u32,
    scale_schedule: ScaleSchedule,
    initial_difficulty: f64,
    max_difficulty: f64,
    slope: f64,
    slope_decay: f64,
    assessment_proportion: f64,
    lead_in_seconds: f64,
    flip_margin_seconds: f64,
    crash_display: Duration,
    reset_pause: Duration,
    reset_offset: f64,
    score_radius: f64,
    score_rate: f64,
}

impl TaskConfig {
    /// Creates a configuration for the provided mode populated with defaults.
    ///
    /// Calibration pads its schedule in seconds; the practice and assessment
    /// parameter sets use the minute-based padding. Practice starts from a
    /// much lower difficulty and ceiling than the other phases.
    #[must_use]
    pub fn new(mode: TaskMode) -> Self {
        let horizon = match mode {
            TaskMode::Calibrate => OnsetHorizon::SecondsPadded,
            TaskMode::Practice | TaskMode::Assessment => OnsetHorizon::MinutesPadded,
        };
        let (initial_difficulty, max_difficulty) = match mode {
            TaskMode::Practice => (PRACTICE_INITIAL_DIFFICULTY, PRACTICE_MAX_DIFFICULTY),
            TaskMode::Calibrate | TaskMode::Assessment => {
                (DEFAULT_INITIAL_DIFFICULTY, DEFAULT_MAX_DIFFICULTY)
            }
        };
        Self {
            mode,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            max_seconds: DEFAULT_MAX_SECONDS,
            horizon,
            max_bounds: DEFAULT_MAX_BOUNDS,
            required_failures: DEFAULT_REQUIRED_FAILURES,
            scale_schedule: ScaleSchedule::default(),
            initial_difficulty,
            max_difficulty,
            slope: DEFAULT_SLOPE,
            slope_decay: DEFAULT_SLOPE_DECAY,
            assessment_proportion: DEFAULT_ASSESSMENT_PROPORTION,
            lead_in_seconds: DEFAULT_LEAD_IN_SECONDS,
            flip_margin_seconds: DEFAULT_FLIP_MARGIN_SECONDS,
            crash_display: DEFAULT_CRASH_DISPLAY,
            reset_pause: DEFAULT_RESET_PAUSE,
            reset_offset: DEFAULT_RESET_OFFSET,
            score_radius: DEFAULT_SCORE_RADIUS,
            score_rate: DEFAULT_SCORE_RATE,
        }
    }

    /// Phase driven by this configuration.
    #[must_use]
    pub const fn mode(&self) -> TaskMode {
        self.mode
    }

    /// Loop rate in ticks per second.
    #[must_use]
    pub const fn tick_rate_hz(&self) -> f64 {
        self.tick_rate_hz
    }

    /// Nominal spacing between scheduled ticks, in seconds.
    #[must_use]
    pub fn tick_period(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }

    /// Duration bound of the phase measured on the experiment clock, in seconds.
    #[must_use]
    pub const fn max_seconds(&self) -> f64 {
        self.max_seconds
    }

    /// Convention used to derive the onset schedule span.
    #[must_use]
    pub const fn horizon(&self) -> OnsetHorizon {
        self.horizon
    }

    /// Combined displacement above which the stimulus counts as out of bounds.
    #[must_use]
    pub const fn max_bounds(&self) -> f64 {
        self.max_bounds
    }

    /// Failures required before a calibration phase stops.
    #[must_use]
    pub const fn required_failures(&self) -> u32 {
        self.required_failures
    }

    /// Difficulty-reduction factors indexed by failure count.
    #[must_use]
    pub const fn scale_schedule(&self) -> &ScaleSchedule {
        &self.scale_schedule
    }

    /// Difficulty (and intercept) the phase starts from.
    #[must_use]
    pub const fn initial_difficulty(&self) -> f64 {
        self.initial_difficulty
    }

    /// Default ceiling applied to the evolving difficulty.
    #[must_use]
    pub const fn max_difficulty(&self) -> f64 {
        self.max_difficulty
    }

    /// Initial growth rate of the difficulty over elapsed time.
    #[must_use]
    pub const fn slope(&self) -> f64 {
        self.slope
    }

    /// Factor applied to the slope on every failure.
    #[must_use]
    pub const fn slope_decay(&self) -> f64 {
        self.slope_decay
    }

    /// Fraction of the calibrated threshold used as the assessment ceiling.
    #[must_use]
    pub const fn assessment_proportion(&self) -> f64 {
        self.assessment_proportion
    }

    /// Delay between the clock reset and the first scheduled tick, in seconds.
    #[must_use]
    pub const fn lead_in_seconds(&self) -> f64 {
        self.lead_in_seconds
    }

    /// How early a flip may be requested ahead of its scheduled onset, in seconds.
    #[must_use]
    pub const fn flip_margin_seconds(&self) -> f64 {
        self.flip_margin_seconds
    }

    /// How long the crash overlay stays on screen.
    #[must_use]
    pub const fn crash_display(&self) -> Duration {
        self.crash_display
    }

    /// How long the reset overlay stays on screen before ticking resumes.
    #[must_use]
    pub const fn reset_pause(&self) -> Duration {
        self.reset_pause
    }

    /// Magnitude of the stimulus offset applied on reset.
    #[must_use]
    pub const fn reset_offset(&self) -> f64 {
        self.reset_offset
    }

    /// Radius around the centre within which ticks earn score.
    #[must_use]
    pub const fn score_radius(&self) -> f64 {
        self.score_radius
    }

    /// Score earned per second spent inside the score radius.
    #[must_use]
    pub const fn score_rate(&self) -> f64 {
        self.score_rate
    }

    /// Sets the loop rate.
    pub fn with_tick_rate_hz(mut self, value: f64) -> Result<Self, ConfigError> {
        let value = positive("tick_rate_hz", value)?;
        if value > MAX_TICK_RATE_HZ {
            return Err(ConfigError::InvalidValue {
                field: "tick_rate_hz",
                value,
                reason: "must not exceed 1000 Hz",
            });
        }
        self.tick_rate_hz = value;
        Ok(self)
    }

    /// Sets the duration bound.
    pub fn with_max_seconds(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_seconds = positive("max_seconds", value)?;
        Ok(self)
    }

    /// Sets the onset horizon convention.
    #[must_use]
    pub fn with_horizon(mut self, horizon: OnsetHorizon) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the out-of-bounds threshold.
    pub fn with_max_bounds(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_bounds = positive("max_bounds", value)?;
        Ok(self)
    }

    /// Sets the number of failures that stops a calibration phase.
    pub fn with_required_failures(mut self, value: u32) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                field: "required_failures",
                value: 0.0,
                reason: "at least one failure must be required",
            });
        }
        self.required_failures = value;
        Ok(self)
    }

    /// Replaces the difficulty-reduction schedule.
    #[must_use]
    pub fn with_scale_schedule(mut self, schedule: ScaleSchedule) -> Self {
        self.scale_schedule = schedule;
        self
    }

    /// Sets the starting difficulty.
    pub fn with_initial_difficulty(mut self, value: f64) -> Result<Self, ConfigError> {
        self.initial_difficulty = non_negative("initial_difficulty", value)?;
        Ok(self)
    }

    /// Sets the default difficulty ceiling.
    pub fn with_max_difficulty(mut self, value: f64) -> Result<Self, ConfigError> {
        self.max_difficulty = positive("max_difficulty", value)?;
        Ok(self)
    }

    /// Sets the initial difficulty slope.
    pub fn with_slope(mut self, value: f64) -> Result<Self, ConfigError> {
        self.slope = non_negative("slope", value)?;
        Ok(self)
    }

    /// Sets the per-failure slope decay.
    pub fn with_slope_decay(mut self, value: f64) -> Result<Self, ConfigError> {
        self.slope_decay = unit_interval("slope_decay", value)?;
        Ok(self)
    }

    /// Sets the assessment ceiling proportion.
    pub fn with_assessment_proportion(mut self, value: f64) -> Result<Self, ConfigError> {
        self.assessment_proportion = unit_interval("assessment_proportion", value)?;
        Ok(self)
    }

    /// Sets the lead-in before the first tick.
    pub fn with_lead_in_seconds(mut self, value: f64) -> Result<Self, ConfigError> {
        self.lead_in_seconds = non_negative("lead_in_seconds", value)?;
        Ok(self)
    }

    /// Sets the early-flip margin.
    pub fn with_flip_margin_seconds(mut self, value: f64) -> Result<Self, ConfigError> {
        self.flip_margin_seconds = non_negative("flip_margin_seconds", value)?;
        Ok(self)
    }

    /// Sets how long the crash overlay and reset overlay are shown.
    pub fn with_recovery_pauses(
        mut self,
        crash_display_seconds: f64,
        reset_pause_seconds: f64,
    ) -> Result<Self, ConfigError> {
        self.crash_display = pause("crash_display", crash_display_seconds)?;
        self.reset_pause = pause("reset_pause", reset_pause_seconds)?;
        Ok(self)
    }

    /// Number of onsets the phase schedule holds.
    ///
    /// Fails when the horizon at the configured rate exceeds [`MAX_SCHEDULED_ONSETS`].
    pub fn onset_count(&self) -> Result<usize, ConfigError> {
        let count = (self.horizon.horizon_seconds(self.max_seconds) * self.tick_rate_hz).ceil();
        if count.is_finite() && count <= MAX_SCHEDULED_ONSETS as f64 {
            Ok(count.max(0.0) as usize)
        } else {
            Err(ConfigError::InvalidValue {
                field: "max_seconds",
                value: self.max_seconds,
                reason: "onset schedule at this tick rate is too long",
            })
        }
    }

    /// Sets the reset offset magnitude.
    pub fn with_reset_offset(mut self, value: f64) -> Result<Self, ConfigError> {
        self.reset_offset = non_negative("reset_offset", value)?;
        Ok(self)
    }

    /// Sets the score radius and rate.
    pub fn with_scoring(mut self, radius: f64, rate: f64) -> Result<Self, ConfigError> {
        self.score_radius = non_negative("score_radius", radius)?;
        self.score_rate = non_negative("score_rate", rate)?;
        Ok(self)
    }

    /// Merges a partial update, validating every provided field.
    pub fn apply_overrides(self, overrides: &TaskConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = self;
        if let Some(value) = overrides.tick_rate_hz {
            config = config.with_tick_rate_hz(value)?;
        }
        if let Some(value) = overrides.max_seconds {
            config = config.with_max_seconds(value)?;
        }
        if let Some(horizon) = overrides.horizon {
            config = config.with_horizon(horizon);
        }
        if let Some(value) = overrides.max_bounds {
            config = config.with_max_bounds(value)?;
        }
        if let Some(value) = overrides.required_failures {
            config = config.with_required_failures(value)?;
        }
        if let Some(schedule) = &overrides.scale_schedule {
            config = config.with_scale_schedule(schedule.clone());
        }
        if let Some(value) = overrides.initial_difficulty {
            config = config.with_initial_difficulty(value)?;
        }
        if let Some(value) = overrides.max_difficulty {
            config = config.with_max_difficulty(value)?;
        }
        if let Some(value) = overrides.slope {
            config = config.with_slope(value)?;
        }
        if let Some(value) = overrides.slope_decay {
            config = config.with_slope_decay(value)?;
        }
        if let Some(value) = overrides.assessment_proportion {
            config = config.with_assessment_proportion(value)?;
        }
        if let Some(value) = overrides.lead_in_seconds {
            config = config.with_lead_in_seconds(value)?;
        }
        if let Some(value) = overrides.flip_margin_seconds {
            config = config.with_flip_margin_seconds(value)?;
        }
        if overrides.crash_display_seconds.is_some() || overrides.reset_pause_seconds.is_some() {
            let crash = overrides
                .crash_display_seconds
                .unwrap_or_else(|| config.crash_display.as_secs_f64());
            let reset = overrides
                .reset_pause_seconds
                .unwrap_or_else(|| config.reset_pause.as_secs_f64());
            config = config.with_recovery_pauses(crash, reset)?;
        }
        if let Some(value) = overrides.reset_offset {
            config = config.with_reset_offset(value)?;
        }
        if overrides.score_radius.is_some() || overrides.score_rate.is_some() {
            let radius = overrides.score_radius.unwrap_or(config.score_radius);
            let rate = overrides.score_rate.unwrap_or(config.score_rate);
            config = config.with_scoring(radius, rate)?;
        }
        let _ = config.onset_count()?;
        Ok(config)
    }
}

/// Partial configuration update read from settings files.
///
/// Every field is optional; present fields are routed through the matching
/// validated setter on [`TaskConfig`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfigOverrides {
    /// Loop rate in ticks per second.
    pub tick_rate_hz: Option<f64>,
    /// Duration bound in seconds.
    pub max_seconds: Option<f64>,
    /// Onset horizon convention.
    pub horizon: Option<OnsetHorizon>,
    /// Out-of-bounds threshold.
    pub max_bounds: Option<f64>,
    /// Failures required to stop calibration.
    pub required_failures: Option<u32>,
    /// Difficulty-reduction factors.
    pub scale_schedule: Option<ScaleSchedule>,
    /// Starting difficulty.
    pub initial_difficulty: Option<f64>,
    /// Difficulty ceiling.
    pub max_difficulty: Option<f64>,
    /// Initial difficulty slope.
    pub slope: Option<f64>,
    /// Per-failure slope decay.
    pub slope_decay: Option<f64>,
    /// Assessment ceiling proportion.
    pub assessment_proportion: Option<f64>,
    /// Lead-in before the first tick, in seconds.
    pub lead_in_seconds: Option<f64>,
    /// Early-flip margin, in seconds.
    pub flip_margin_seconds: Option<f64>,
    /// Crash overlay duration, in seconds.
    pub crash_display_seconds: Option<f64>,
    /// Reset overlay duration, in seconds.
    pub reset_pause_seconds: Option<f64>,
    /// Reset offset magnitude.
    pub reset_offset: Option<f64>,
    /// Score radius.
    pub score_radius: Option<f64>,
    /// Score earned per second inside the radius.
    pub score_rate: Option<f64>,
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be finite and greater than zero",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be finite and not negative",
        })
    }
}

fn pause(field: &'static str, seconds: f64) -> Result<Duration, ConfigError> {
    let seconds = non_negative(field, seconds)?;
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidValue {
        field,
        value: seconds,
        reason: "does not fit in a duration",
    })
}

fn unit_interval(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must lie within (0.0, 1.0]",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizons_keep_their_padding_conventions() {
        assert!((OnsetHorizon::SecondsPadded.horizon_seconds(600.0) - 630.0).abs() < 1e-9);
        assert!((OnsetHorizon::MinutesPadded.horizon_seconds(10.0) - 630.0).abs() < 1e-9);
    }

    #[test]
    fn mode_selects_default_horizon() {
        assert_eq!(
            TaskConfig::new(TaskMode::Calibrate).horizon(),
            OnsetHorizon::SecondsPadded
        );
        assert_eq!(
            TaskConfig::new(TaskMode::Assessment).horizon(),
            OnsetHorizon::MinutesPadded
        );
    }

    #[test]
    fn practice_starts_easier() {
        let practice = TaskConfig::new(TaskMode::Practice);
        assert!((practice.initial_difficulty() - 0.01).abs() < f64::EPSILON);
        assert!((practice.max_difficulty() - 0.05).abs() < f64::EPSILON);
        let calibration = TaskConfig::new(TaskMode::Calibrate);
        assert!((calibration.initial_difficulty() - 0.125).abs() < f64::EPSILON);
    }

    #[test]
    fn schedule_lookup_reports_exhaustion() {
        let schedule = ScaleSchedule::new(vec![0.5, 0.4]).expect("valid schedule");
        assert_eq!(schedule.factor(1), Ok(0.4));
        assert_eq!(
            schedule.factor(2),
            Err(ConfigError::ScheduleExhausted {
                failures: 2,
                schedule_len: 2,
            })
        );
    }

    #[test]
    fn schedule_rejects_out_of_range_factors() {
        assert!(matches!(
            ScaleSchedule::new(vec![0.5, 1.5]),
            Err(ConfigError::InvalidValue {
                field: "scale_schedule",
                ..
            })
        ));
        assert_eq!(ScaleSchedule::new(Vec::new()), Err(ConfigError::EmptySchedule));
    }

    #[test]
    fn setters_reject_non_finite_values() {
        let error = TaskConfig::new(TaskMode::Practice)
            .with_tick_rate_hz(f64::NAN)
            .expect_err("NaN rate must be rejected");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                field: "tick_rate_hz",
                ..
            }
        ));
    }

    #[test]
    fn overrides_merge_only_present_fields() {
        let overrides: TaskConfigOverrides = toml::from_str(
            r#"
            max_seconds = 120.0
            required_failures = 4
            scale_schedule = [0.5, 0.5, 0.4, 0.4]
            "#,
        )
        .expect("overrides parse");

        let config = TaskConfig::new(TaskMode::Calibrate)
            .apply_overrides(&overrides)
            .expect("overrides validate");

        assert!((config.max_seconds() - 120.0).abs() < f64::EPSILON);
        assert_eq!(config.required_failures(), 4);
        assert_eq!(config.scale_schedule().len(), 4);
        assert!((config.max_bounds() - DEFAULT_MAX_BOUNDS).abs() < f64::EPSILON);
    }

    #[test]
    fn oversized_pauses_and_schedules_are_rejected() {
        let overrides: TaskConfigOverrides =
            toml::from_str("crash_display_seconds = 1e300").expect("overrides parse");
        assert!(matches!(
            TaskConfig::new(TaskMode::Calibrate).apply_overrides(&overrides),
            Err(ConfigError::InvalidValue {
                field: "crash_display",
                ..
            })
        ));

        assert!(TaskConfig::new(TaskMode::Calibrate)
            .with_tick_rate_hz(1e9)
            .is_err());

        let overrides: TaskConfigOverrides =
            toml::from_str("max_seconds = 1e12").expect("overrides parse");
        assert!(matches!(
            TaskConfig::new(TaskMode::Assessment).apply_overrides(&overrides),
            Err(ConfigError::InvalidValue {
                field: "max_seconds",
                ..
            })
        ));

        let config = TaskConfig::new(TaskMode::Calibrate);
        assert_eq!(config.onset_count(), Ok(630 * 30));
    }

    #[test]
    fn overrides_reject_unknown_keys() {
        let parsed: Result<TaskConfigOverrides, _> = toml::from_str("lambda = 3.0");
        assert!(parsed.is_err());
    }
}
