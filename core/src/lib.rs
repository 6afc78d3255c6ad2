#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the compensatory tracking engine.
//!
//! This crate defines the typed surface that connects the pure systems
//! (plant model, calibration feedback), the tick scheduler that drives them,
//! and the session orchestrator that owns the per-phase state. Systems read an
//! immutable [`TaskConfig`], mutate an exclusively borrowed [`SessionState`]
//! and leave behind an append-only [`TrialLog`] of [`TrialRecord`] rows.

mod config;
mod record;
mod state;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{
    OnsetHorizon, ScaleSchedule, TaskConfig, TaskConfigOverrides, DEFAULT_SCALE_SCHEDULE,
    MAX_SCHEDULED_ONSETS, SCHEDULE_PADDING_SECONDS,
};
pub use record::{CalibrationOutcome, TrialLog, TrialRecord, TRIAL_COLUMNS, TRIAL_UNITS};
pub use state::SessionState;

/// Number of best calibration failures averaged to derive the assessment ceiling.
pub const TOP_FAILURES: usize = 3;

/// Describes which phase of the experiment a configuration drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskMode {
    /// Low-difficulty familiarisation run; failures never stop the phase.
    Practice,
    /// Adaptive run that lowers difficulty on every failure until enough failures accrue.
    Calibrate,
    /// Fixed-ceiling run parameterised by the calibration outcome.
    #[serde(alias = "CPT")]
    Assessment,
}

impl TaskMode {
    /// Upper-case tag used in telemetry labels and log messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Practice => "PRACTICE",
            Self::Calibrate => "CALIBRATE",
            Self::Assessment => "ASSESSMENT",
        }
    }

    /// Task label embedded in persisted file names.
    #[must_use]
    pub const fn file_label(self) -> &'static str {
        match self {
            Self::Practice => "CPTPractice",
            Self::Calibrate => "CPTCalibrate",
            Self::Assessment => "CPT",
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete events forwarded to telemetry sinks alongside the per-tick samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Marker {
    /// Announces that a phase began ticking.
    PhaseOnset {
        /// Mode of the phase that started.
        mode: TaskMode,
    },
    /// Announces that the stimulus left the permitted bounds.
    Crashed {
        /// Last realized flip time when the failure was detected, in seconds.
        at: f64,
    },
    /// Announces that a phase stopped and is being torn down.
    PhaseEnded {
        /// Mode of the phase that ended.
        mode: TaskMode,
    },
}

impl Marker {
    /// Human-readable label written to marker streams.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::PhaseOnset { mode } => format!("Onset {mode}"),
            Self::Crashed { at } => format!("Crashed:{at:.4}"),
            Self::PhaseEnded { mode } => format!("TaskEnded {mode}"),
        }
    }

    /// Byte written to hardware trigger ports for this marker.
    #[must_use]
    pub const fn port_code(&self) -> u8 {
        match self {
            Self::PhaseOnset { .. } | Self::PhaseEnded { .. } => 255,
            Self::Crashed { .. } => 128,
        }
    }
}

/// Configuration problems that stop a phase before or while it runs.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A phase was started before task parameters were bound.
    #[error("task and state parameters must be bound before running a phase")]
    ParametersUnbound,
    /// More failures occurred than the difficulty-reduction schedule covers.
    #[error("scale schedule exhausted: failure {failures} has no entry (schedule length {schedule_len})")]
    ScheduleExhausted {
        /// Failure count that was used as the schedule index.
        failures: u32,
        /// Number of entries available in the schedule.
        schedule_len: usize,
    },
    /// Too few calibration failures were observed to derive an assessment ceiling.
    #[error("calibration produced {observed} failures but {required} are needed to derive the assessment ceiling")]
    InsufficientFailures {
        /// Number of failures recorded by the calibration phase.
        observed: usize,
        /// Number of failures the derivation averages.
        required: usize,
    },
    /// A numeric parameter failed validation.
    #[error("invalid {field} = {value}: {reason}")]
    InvalidValue {
        /// Name of the rejected parameter.
        field: &'static str,
        /// Rejected value.
        value: f64,
        /// Constraint the value violated.
        reason: &'static str,
    },
    /// The difficulty-reduction schedule contained no entries.
    #[error("scale schedule must contain at least one entry")]
    EmptySchedule,
    /// A configuration was bound to a phase of another mode.
    #[error("{found} configuration bound to the {expected} phase")]
    ModeMismatch {
        /// Mode of the phase slot.
        expected: TaskMode,
        /// Mode carried by the configuration.
        found: TaskMode,
    },
}

#[cfg(test)]
mod tests {
    use super::{Marker, TaskMode};

    #[test]
    fn marker_labels_match_stream_conventions() {
        let onset = Marker::PhaseOnset {
            mode: TaskMode::Calibrate,
        };
        assert_eq!(onset.label(), "Onset CALIBRATE");
        assert_eq!(onset.port_code(), 255);

        let crash = Marker::Crashed { at: 12.5 };
        assert_eq!(crash.label(), "Crashed:12.5000");
        assert_eq!(crash.port_code(), 128);
    }

    #[test]
    fn assessment_mode_accepts_legacy_tag() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            mode: TaskMode,
        }

        let parsed: Wrapper = toml::from_str("mode = \"CPT\"").expect("legacy tag parses");
        assert_eq!(parsed.mode, TaskMode::Assessment);
    }
}
