#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line launcher that runs a full compensatory tracking session.
//!
//! Practice, calibration and assessment run back to back. Per-phase logs land
//! under `<output-dir>/sub-<id>/ses-<visit>/raw/` and every calibration appends
//! its failure difficulties to `<output-dir>/calibration_lambdas.csv`.

mod settings;
mod wiring;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use cst_core::TaskConfigOverrides;
use cst_devices::{AxisMapping, ConsoleRenderer, SCANNER_TRIGGER};
use cst_io::{
    Clock, Collaborators, HeadlessRenderer, ManualClock, MonotonicClock, Renderer, StimulusLink,
};
use cst_session::{non_clobbering_path, CsvRecorder, SessionIds, SessionOrchestrator};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::settings::{build_plan, Settings};

/// Source of the participant's corrective input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputMode {
    /// Serial inertial sensor found under `/dev/ttyACM*`.
    Accel,
    /// Proportional controller reacting to the drawn stimulus.
    Simulated,
    /// No input; the stimulus drifts freely.
    None,
}

/// Compensatory tracking task: practice, calibration and assessment.
#[derive(Parser, Debug)]
#[command(name = "cst-task", version)]
struct Args {
    /// Participant identifier.
    #[arg(long)]
    subid: String,

    /// Visit identifier.
    #[arg(long, default_value = "1")]
    visit: String,

    /// Run identifier.
    #[arg(long, default_value = "1")]
    run: String,

    /// Calibration failures to collect [default: 10].
    #[arg(long)]
    num_cal_trials: Option<u32>,

    /// Assessment duration in seconds [default: 600].
    #[arg(long)]
    cpt_secs_dur: Option<f64>,

    /// Input backend.
    #[arg(long, value_enum, default_value_t = InputMode::Accel)]
    input_mode: InputMode,

    /// Initial difficulty intercept of calibration and assessment [default: 0.1].
    #[arg(long)]
    lambda_init_value: Option<f64>,

    /// Share of the calibrated difficulty used during assessment [default: 0.3].
    #[arg(long)]
    cpt_prop_of_max: Option<f64>,

    /// Tick rate of every phase in Hz [default: 30].
    #[arg(long)]
    task_refresh_hz: Option<f64>,

    /// Practice duration in seconds [default: assessment duration].
    #[arg(long)]
    practice_secs: Option<f64>,

    /// Mirror the sensor axes.
    #[arg(long)]
    reverse_x: bool,

    /// Exchange the sensor axes.
    #[arg(long)]
    swap_axes: bool,

    /// Send marker codes to a parallel trigger port.
    #[arg(long)]
    eeg: bool,

    /// Trigger port written when `--eeg` is set.
    #[arg(long, default_value = "/dev/parport0")]
    eeg_port: PathBuf,

    /// Wait for a scanner trigger pulse instead of a key press on message screens.
    #[arg(long)]
    mri: bool,

    /// Serial line carrying scanner trigger pulses when `--mri` is set.
    #[arg(long, default_value = "/dev/ttyUSB0")]
    mri_port: PathBuf,

    /// Write an eye-tracker style marker log next to the phase logs.
    #[arg(long)]
    tracker: bool,

    /// Root directory of all output files.
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// TOML settings with `[practice]`, `[calibration]` and `[assessment]` tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for stimulus resets and simulated input [default: current time].
    #[arg(long)]
    seed: Option<u64>,

    /// Skip drawing and acknowledge every message automatically.
    #[arg(long)]
    headless: bool,

    /// Run on virtual time; sleeps return immediately.
    #[arg(long)]
    simulate_time: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Settings {
        let tick_rate = TaskConfigOverrides {
            tick_rate_hz: self.task_refresh_hz,
            ..TaskConfigOverrides::default()
        };
        Settings {
            practice: TaskConfigOverrides {
                max_seconds: self.practice_secs,
                ..tick_rate.clone()
            },
            calibration: TaskConfigOverrides {
                required_failures: self.num_cal_trials,
                initial_difficulty: self.lambda_init_value,
                ..tick_rate.clone()
            },
            assessment: TaskConfigOverrides {
                max_seconds: self.cpt_secs_dur,
                initial_difficulty: self.lambda_init_value,
                assessment_proportion: self.cpt_prop_of_max,
                ..tick_rate
            },
        }
    }

    fn mapping(&self) -> AxisMapping {
        AxisMapping {
            reverse: self.reverse_x,
            swap: self.swap_axes,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let file = Settings::load(args.config.as_deref())?;
    let plan = build_plan(&file, &args.overrides())?;
    let seed = args
        .seed
        .unwrap_or_else(|| Local::now().timestamp_millis().unsigned_abs());
    info!(subject = %args.subid, visit = %args.visit, run = %args.run, seed, "starting session");

    let ids = SessionIds::new(args.subid.as_str(), args.visit.as_str(), args.run.as_str());
    let recorder = CsvRecorder::new(args.output_dir.clone(), ids);
    let marker_log = if args.tracker {
        let preferred = recorder.raw_dir().join(format!(
            "sub-{}_ses-{}_run-{}_markers.log",
            args.subid, args.visit, args.run
        ));
        Some(non_clobbering_path(&preferred)?)
    } else {
        None
    };

    let link = StimulusLink::new();
    let mut input = wiring::input(args.input_mode, args.mapping(), &link, seed);
    let mut renderer: Box<dyn Renderer> = if args.headless {
        Box::new(HeadlessRenderer::new().with_link(link.clone()))
    } else if args.mri {
        let pulses = wiring::scanner_pulses(&args.mri_port)?;
        Box::new(
            ConsoleRenderer::pulse_gated(io::stdout(), pulses, SCANNER_TRIGGER)
                .with_link(link.clone()),
        )
    } else {
        Box::new(ConsoleRenderer::new(io::stdout(), io::stdin().lock()).with_link(link.clone()))
    };
    let trigger_port = args.eeg.then_some(args.eeg_port.as_path());
    let mut telemetry = wiring::telemetry(trigger_port, marker_log.as_deref())?;
    let clock: Box<dyn Clock> = if args.simulate_time {
        Box::new(ManualClock::new())
    } else {
        Box::new(MonotonicClock::new())
    };

    let mut io = Collaborators {
        input: &mut input,
        renderer: renderer.as_mut(),
        telemetry: &mut telemetry,
        clock: clock.as_ref(),
    };

    let mut orchestrator = SessionOrchestrator::new(recorder, seed);
    orchestrator.bind(plan);
    let summary = orchestrator
        .run_session(&mut io)
        .context("session did not complete")?;

    info!(
        practice_ticks = summary.practice.log.len(),
        calibration_failures = summary.calibration.outcome.len(),
        assessment_ceiling = summary.assessment_ceiling,
        assessment_failures = summary.assessment.final_state.failure_count,
        score = summary.assessment.final_state.score,
        "session complete"
    );
    Ok(())
}
