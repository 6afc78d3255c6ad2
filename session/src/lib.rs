#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session orchestration for the compensatory tracking task.
//!
//! A [`SessionOrchestrator`] owns the bound [`SessionPlan`], runs each phase
//! through the tick scheduler and hands the resulting trial logs to a
//! [`PhaseRecorder`]. A full session runs practice, then calibration, derives
//! the assessment ceiling from the calibration failures and finishes with the
//! assessment phase.

mod output;

use cst_core::{
    CalibrationOutcome, ConfigError, SessionState, TaskConfig, TaskMode, TrialLog, TOP_FAILURES,
};
use cst_io::{Collaborators, DeviceError};
use cst_system_calibration::{derive_assessment_ceiling, CalibrationFeedback};
use cst_system_scheduler::{SchedulerError, StopReason, TickScheduler};
use thiserror::Error;
use tracing::{info, info_span, warn};

pub use output::{
    non_clobbering_path, CsvRecorder, PhaseRecorder, SessionIds, CALIBRATION_SUMMARY_FILE,
};

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The bound parameters cannot drive the requested phase.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A collaborator that cannot be replaced failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
    /// Writing a tabular log failed.
    #[error("failed to write log")]
    Log(#[from] csv::Error),
    /// Creating output directories or files failed.
    #[error("output i/o failed")]
    Io(#[from] std::io::Error),
}

impl From<SchedulerError> for SessionError {
    fn from(error: SchedulerError) -> Self {
        match error {
            SchedulerError::Config(error) => Self::Config(error),
            SchedulerError::Render(error) => Self::Device(error),
        }
    }
}

/// Validated configurations for the three phases of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPlan {
    practice: TaskConfig,
    calibration: TaskConfig,
    assessment: TaskConfig,
}

impl SessionPlan {
    /// Binds one configuration per phase.
    ///
    /// The calibration phase must require enough failures to derive the
    /// assessment ceiling, and its schedule must cover every one of them.
    pub fn new(
        practice: TaskConfig,
        calibration: TaskConfig,
        assessment: TaskConfig,
    ) -> Result<Self, ConfigError> {
        expect_mode(&practice, TaskMode::Practice)?;
        expect_mode(&calibration, TaskMode::Calibrate)?;
        expect_mode(&assessment, TaskMode::Assessment)?;

        let required = calibration.required_failures();
        if (required as usize) < TOP_FAILURES {
            return Err(ConfigError::InsufficientFailures {
                observed: required as usize,
                required: TOP_FAILURES,
            });
        }
        let _ = calibration
            .scale_schedule()
            .factor(required - 1)
            .map_err(|_| ConfigError::ScheduleExhausted {
                failures: required,
                schedule_len: calibration.scale_schedule().len(),
            })?;

        Ok(Self {
            practice,
            calibration,
            assessment,
        })
    }

    /// Configuration driving the phase of `mode`.
    #[must_use]
    pub fn config(&self, mode: TaskMode) -> &TaskConfig {
        match mode {
            TaskMode::Practice => &self.practice,
            TaskMode::Calibrate => &self.calibration,
            TaskMode::Assessment => &self.assessment,
        }
    }
}

impl Default for SessionPlan {
    fn default() -> Self {
        Self {
            practice: TaskConfig::new(TaskMode::Practice),
            calibration: TaskConfig::new(TaskMode::Calibrate),
            assessment: TaskConfig::new(TaskMode::Assessment),
        }
    }
}

fn expect_mode(config: &TaskConfig, expected: TaskMode) -> Result<(), ConfigError> {
    if config.mode() == expected {
        Ok(())
    } else {
        Err(ConfigError::ModeMismatch {
            expected,
            found: config.mode(),
        })
    }
}

/// Pages shown to the participant between phases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instructions {
    /// Shown before the practice phase.
    pub practice: Vec<String>,
    /// Shown before the calibration phase.
    pub calibration: Vec<String>,
    /// Shown before the assessment phase.
    pub assessment: Vec<String>,
    /// Shown after every phase.
    pub closing: String,
}

impl Default for Instructions {
    fn default() -> Self {
        let pages = |pages: &[&str]| -> Vec<String> {
            pages.iter().map(|page| (*page).to_owned()).collect()
        };
        Self {
            practice: pages(&[
                "Next activity starting soon",
                "In this task, you will be asked to control\na circle on the screen using this\ndevice.",
                "The circle will drift to the left or right.\nYour job will be to keep it at the center\nof the screen by tilting the device in\nthe opposite direction.",
                "Before we start the task, we will give you a\nchance to practice.",
            ]),
            calibration: pages(&[
                "This part of the task will start out just like the\npractice session. But it will become harder to keep\nthe circle in the middle of the screen.",
                "You will eventually lose control and 'crash'.\nThis is OK. In this part of the task, we want\nto see how long you can keep the circle on the screen.",
                "Just do your best, and keep the circle on the screen\nfor as long as you can.",
            ]),
            assessment: pages(&[
                "This part of the task will be much easier.\nTry to keep the circles as close to\nthe center of the screen as you can.",
            ]),
            closing: "Great Job!".to_owned(),
        }
    }
}

/// Everything a finished phase produced.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseResult {
    /// Phase that ran.
    pub mode: TaskMode,
    /// Per-tick records in order.
    pub log: TrialLog,
    /// Failure difficulties observed during the phase.
    pub outcome: CalibrationOutcome,
    /// State at the end of the last tick.
    pub final_state: SessionState,
    /// Why the phase stopped.
    pub stop_reason: StopReason,
}

/// Results of a complete practice, calibration and assessment sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    /// Practice phase result.
    pub practice: PhaseResult,
    /// Calibration phase result.
    pub calibration: PhaseResult,
    /// Difficulty ceiling derived for the assessment.
    pub assessment_ceiling: f64,
    /// Assessment phase result.
    pub assessment: PhaseResult,
}

/// Sequences phases and owns their state between runs.
#[derive(Debug)]
pub struct SessionOrchestrator<R> {
    plan: Option<SessionPlan>,
    instructions: Instructions,
    scheduler: TickScheduler,
    recorder: R,
}

impl<R: PhaseRecorder> SessionOrchestrator<R> {
    /// Creates an unbound orchestrator persisting through `recorder`.
    #[must_use]
    pub fn new(recorder: R, seed: u64) -> Self {
        Self {
            plan: None,
            instructions: Instructions::default(),
            scheduler: TickScheduler::new(seed),
            recorder,
        }
    }

    /// Replaces the instruction pages.
    #[must_use]
    pub fn with_instructions(mut self, instructions: Instructions) -> Self {
        self.instructions = instructions;
        self
    }

    /// Binds the phase configurations.
    pub fn bind(&mut self, plan: SessionPlan) {
        self.plan = Some(plan);
    }

    /// Bound plan, if any.
    #[must_use]
    pub fn plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    /// Recorder receiving the phase artefacts.
    #[must_use]
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Runs one phase from `state` with the bound configuration for `mode`.
    ///
    /// The trial log is persisted even when a configuration error ends the
    /// phase early; the error is returned afterwards.
    pub fn run_phase(
        &mut self,
        mode: TaskMode,
        mut state: SessionState,
        io: &mut Collaborators<'_>,
    ) -> Result<PhaseResult, SessionError> {
        let config = self
            .plan
            .as_ref()
            .ok_or(ConfigError::ParametersUnbound)?
            .config(mode)
            .clone();

        let span = info_span!("phase", mode = %mode);
        let _entered = span.enter();

        let mut feedback = CalibrationFeedback::new();
        let mut log = TrialLog::new();
        let ticked = self
            .scheduler
            .run(&config, &mut state, &mut feedback, io, &mut log);

        let outcome = match ticked {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, rows = log.len(), "phase ended by an error");
                self.recorder.record_phase(mode, &log)?;
                return Err(error.into());
            }
        };

        self.recorder.record_phase(mode, &log)?;
        if mode == TaskMode::Calibrate {
            self.recorder.record_calibration(feedback.outcome())?;
        }
        io.renderer.show_message(&self.instructions.closing)?;

        info!(
            ticks = outcome.ticks,
            failures = state.failure_count,
            score = state.score,
            "phase finished"
        );

        Ok(PhaseResult {
            mode,
            log,
            outcome: feedback.into_outcome(),
            final_state: state,
            stop_reason: outcome.reason,
        })
    }

    /// Runs practice, calibration and assessment in order.
    pub fn run_session(
        &mut self,
        io: &mut Collaborators<'_>,
    ) -> Result<SessionSummary, SessionError> {
        let plan = self.plan.clone().ok_or(ConfigError::ParametersUnbound)?;

        self.show_pages(TaskMode::Practice, io)?;
        let practice = self.run_phase(
            TaskMode::Practice,
            SessionState::seeded(plan.config(TaskMode::Practice)),
            io,
        )?;

        self.show_pages(TaskMode::Calibrate, io)?;
        let calibration = self.run_phase(
            TaskMode::Calibrate,
            SessionState::seeded(plan.config(TaskMode::Calibrate)),
            io,
        )?;

        let assessment_config = plan.config(TaskMode::Assessment);
        let assessment_ceiling = derive_assessment_ceiling(
            &calibration.outcome,
            assessment_config.assessment_proportion(),
        )?;
        info!(
            ceiling = assessment_ceiling,
            failures = calibration.outcome.len(),
            "assessment ceiling derived"
        );

        self.show_pages(TaskMode::Assessment, io)?;
        let assessment_state = SessionState::seeded(assessment_config)
            .with_ceiling(assessment_ceiling)
            .with_score(calibration.final_state.score);
        let assessment = self.run_phase(TaskMode::Assessment, assessment_state, io)?;

        io.input.shutdown();

        Ok(SessionSummary {
            practice,
            calibration,
            assessment_ceiling,
            assessment,
        })
    }

    fn show_pages(&self, mode: TaskMode, io: &mut Collaborators<'_>) -> Result<(), SessionError> {
        let pages = match mode {
            TaskMode::Practice => &self.instructions.practice,
            TaskMode::Calibrate => &self.instructions.calibration,
            TaskMode::Assessment => &self.instructions.assessment,
        };
        for page in pages {
            io.renderer.show_message(page)?;
        }
        Ok(())
    }
}
