#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-tick scheduler that drives one phase against an absolute onset schedule.
//!
//! Each tick polls the input, lets [`CalibrationFeedback`] adapt, commits the
//! plant update, flips at the scheduled time and appends a [`TrialRecord`].
//! Crash-recovery pauses are measured and added to every remaining onset;
//! ordinary lateness is absorbed without compensation.

mod onsets;

use cst_core::{ConfigError, Marker, SessionState, TaskConfig, TrialLog, TrialRecord};
use cst_io::{ButtonState, Collaborators, DeviceError, Overlay};
use cst_system_calibration::{reached_failure_target, CalibrationFeedback};
use cst_system_plant::advance;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

pub use onsets::OnsetSchedule;

/// Lifecycle of the scheduler within one phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulerState {
    /// No phase has started yet.
    #[default]
    Idle,
    /// Ticks are being processed.
    Running,
    /// A crash pause is in progress.
    CrashRecovery,
    /// The phase finished.
    Stopped,
}

/// Why a phase stopped ticking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The calibration phase accrued its required failures.
    FailureTarget,
    /// The realized flip time reached the duration bound.
    DurationElapsed,
    /// The operator pressed the abort button.
    Aborted,
    /// Every scheduled onset was consumed.
    ScheduleEnded,
}

/// Summary of a finished phase.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutcome {
    /// Cause of the stop.
    pub reason: StopReason,
    /// Ticks processed, one per logged record.
    pub ticks: usize,
    /// Crash pauses taken.
    pub recoveries: u32,
    /// Onsets after every crash shift.
    pub onsets: OnsetSchedule,
}

/// Errors that end a phase early.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The phase configuration cannot be honoured.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The renderer failed to present a frame.
    #[error("renderer failed")]
    Render(#[from] DeviceError),
}

/// Drives the tick loop of one phase at a time.
#[derive(Debug)]
pub struct TickScheduler {
    state: SchedulerState,
    rng: ChaCha8Rng,
}

impl TickScheduler {
    /// Creates an idle scheduler whose stimulus resets draw from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: SchedulerState::Idle,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Runs a phase until it stops and returns why it stopped.
    ///
    /// The state's stop flag is honoured at the end of a tick, so the tick in
    /// flight is always logged before the phase ends.
    pub fn run(
        &mut self,
        config: &TaskConfig,
        state: &mut SessionState,
        feedback: &mut CalibrationFeedback,
        io: &mut Collaborators<'_>,
        log: &mut TrialLog,
    ) -> Result<TickOutcome, SchedulerError> {
        let _ = config.onset_count()?;
        self.transition(SchedulerState::Running);
        io.clock.reset();

        let mut onsets = OnsetSchedule::generate(
            config.lead_in_seconds(),
            config.tick_rate_hz(),
            config.horizon().horizon_seconds(config.max_seconds()),
        );
        info!(
            mode = %config.mode(),
            onsets = onsets.len(),
            max_seconds = config.max_seconds(),
            "phase started"
        );

        self.reset_stimulus(state, config, io);
        io.telemetry.mark_event(
            &Marker::PhaseOnset {
                mode: config.mode(),
            },
            io.clock.now(),
        );

        let mut recoveries = 0;
        let mut aborted = false;
        let mut index = 0;
        let reason = loop {
            let Some(mut target) = onsets.get(index) else {
                break StopReason::ScheduleEnded;
            };
            state.tick_index = index as u64;

            state.user_pos = io.input.position();
            if io.input.button() == ButtonState::Abort {
                info!(tick = index, "abort requested");
                state.stop = true;
                aborted = true;
            }

            let _ = feedback.on_tick(state, config)?;
            if state.out_of_bounds {
                let pause = self.recover(state, config, io)?;
                onsets.shift_from(index, pause);
                target = onsets.get(index).unwrap_or(target + pause);
                recoveries += 1;
            }

            advance(state, config).commit(state);

            io.renderer.draw(state, Overlay::None)?;
            let flip_time = io
                .renderer
                .flip_no_earlier_than(io.clock, target - config.flip_margin_seconds())?;
            state.flip_time = flip_time;
            state.expected_time = target;

            let record = TrialRecord::capture(state);
            log.append(record);
            io.telemetry.push_sample(&record.values(), flip_time);
            state.did_crash = false;

            if state.flip_time >= config.max_seconds() {
                break StopReason::DurationElapsed;
            }
            if state.stop {
                break if aborted {
                    StopReason::Aborted
                } else if reached_failure_target(state, config) {
                    StopReason::FailureTarget
                } else {
                    StopReason::DurationElapsed
                };
            }
            index += 1;
        };

        state.stop = true;
        io.telemetry.mark_event(
            &Marker::PhaseEnded {
                mode: config.mode(),
            },
            io.clock.now(),
        );
        self.transition(SchedulerState::Stopped);
        info!(
            mode = %config.mode(),
            ?reason,
            ticks = log.len(),
            failures = state.failure_count,
            "phase stopped"
        );

        Ok(TickOutcome {
            reason,
            ticks: log.len(),
            recoveries,
            onsets,
        })
    }

    /// Shows the crash and reset overlays, re-centres the stimulus and
    /// returns the measured pause in seconds.
    fn recover(
        &mut self,
        state: &mut SessionState,
        config: &TaskConfig,
        io: &mut Collaborators<'_>,
    ) -> Result<f64, SchedulerError> {
        self.transition(SchedulerState::CrashRecovery);
        let started = io.clock.now();
        io.telemetry
            .mark_event(&Marker::Crashed { at: state.flip_time }, started);

        io.renderer.draw(state, Overlay::Crash)?;
        let _ = io.renderer.flip_no_earlier_than(io.clock, started)?;
        io.clock.sleep(config.crash_display());

        self.reset_stimulus(state, config, io);
        io.renderer.draw(state, Overlay::Reset)?;
        let _ = io.renderer.flip_no_earlier_than(io.clock, io.clock.now())?;
        io.clock.sleep(config.reset_pause());

        let pause = io.clock.now() - started;
        debug!(
            pause,
            failures = state.failure_count,
            "crash recovery finished"
        );

        state.did_crash = true;
        state.out_of_bounds = false;
        self.transition(SchedulerState::Running);
        Ok(pause)
    }

    fn reset_stimulus(
        &mut self,
        state: &mut SessionState,
        config: &TaskConfig,
        io: &mut Collaborators<'_>,
    ) {
        let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        state.stim_pos = direction * config.reset_offset();
        state.user_pos = 0.0;
        io.input.recentre();
    }

    fn transition(&mut self, next: SchedulerState) {
        debug!(from = ?self.state, to = ?next, "scheduler transition");
        self.state = next;
    }
}
