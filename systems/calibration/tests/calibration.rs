use cst_core::{
    CalibrationOutcome, ConfigError, ScaleSchedule, SessionState, TaskConfig, TaskMode,
};
use cst_system_calibration::{derive_assessment_ceiling, CalibrationFeedback};
use cst_system_plant::{advance, compute_distance};

fn calibration_config(required_failures: u32) -> TaskConfig {
    TaskConfig::new(TaskMode::Calibrate)
        .with_required_failures(required_failures)
        .expect("valid failure target")
}

fn force_failure(state: &mut SessionState) {
    state.distance_to_center = 1.0;
}

fn clear_failure(state: &mut SessionState) {
    state.distance_to_center = 0.0;
    state.out_of_bounds = false;
}

#[test]
fn trigger_uses_literal_boundary() {
    let config = calibration_config(10);
    let mut feedback = CalibrationFeedback::new();

    let mut above = SessionState::seeded(&config);
    above.distance_to_center = compute_distance(0.70001, 0.1);
    let result = feedback.on_tick(&mut above, &config).expect("schedule covers");
    assert!(result.applied);
    assert!(above.out_of_bounds);

    let mut below = SessionState::seeded(&config);
    below.distance_to_center = compute_distance(0.69999, 0.1);
    let result = feedback.on_tick(&mut below, &config).expect("schedule covers");
    assert!(!result.applied);
    assert!(!below.out_of_bounds);
    assert_eq!(below.failure_count, 0);
}

#[test]
fn intercept_never_increases_across_failures() {
    let config = calibration_config(16);
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);

    let difficulties = [0.125, 0.4, 0.9, 0.2, 1.5, 0.05, 0.7, 2.0];
    let mut previous = state.difficulty_intercept;
    for difficulty in difficulties {
        state.difficulty = difficulty;
        force_failure(&mut state);
        let _ = feedback.on_tick(&mut state, &config).expect("schedule covers");
        assert!(
            state.difficulty_intercept <= previous,
            "intercept rose from {previous} to {}",
            state.difficulty_intercept
        );
        previous = state.difficulty_intercept;
        clear_failure(&mut state);
    }
}

#[test]
fn slope_decays_and_failures_are_recorded() {
    let config = calibration_config(10);
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);
    state.difficulty = 0.3;

    force_failure(&mut state);
    let result = feedback.on_tick(&mut state, &config).expect("schedule covers");

    assert_eq!(result.failed_at_difficulty, Some(0.3));
    assert!((state.difficulty_slope - 20.0 * 0.95).abs() < 1e-12);
    assert_eq!(feedback.outcome().failure_difficulties(), &[0.3]);
}

#[test]
fn calibration_stops_on_required_failure_count() {
    let config = calibration_config(3);
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);

    for expected in 1..=3 {
        force_failure(&mut state);
        let result = feedback.on_tick(&mut state, &config).expect("schedule covers");
        assert!(result.applied);
        assert_eq!(state.failure_count, expected);
        assert_eq!(state.stop, expected == 3, "stop flag after failure {expected}");
        clear_failure(&mut state);
    }

    force_failure(&mut state);
    let result = feedback.on_tick(&mut state, &config).expect("stopped phase");
    assert!(!result.applied, "no failure is processed after stopping");
    assert_eq!(state.failure_count, 3);
}

#[test]
fn failures_do_not_stop_other_modes() {
    let config = TaskConfig::new(TaskMode::Assessment)
        .with_required_failures(1)
        .expect("valid failure target");
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);

    force_failure(&mut state);
    let result = feedback.on_tick(&mut state, &config).expect("schedule covers");

    assert!(result.applied);
    assert!(!state.stop);
}

#[test]
fn elapsed_time_is_left_to_the_tick_loop() {
    let config = calibration_config(10)
        .with_max_seconds(30.0)
        .expect("valid bound");
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);

    state.flip_time = 30.01;
    let result = feedback.on_tick(&mut state, &config).expect("no failure");
    assert!(!result.applied);
    assert!(!state.stop);
}

#[test]
fn short_schedule_is_a_configuration_error() {
    let schedule = ScaleSchedule::new(vec![0.5]).expect("valid schedule");
    let config = TaskConfig::new(TaskMode::Assessment).with_scale_schedule(schedule);
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);

    force_failure(&mut state);
    let _ = feedback.on_tick(&mut state, &config).expect("first entry exists");
    clear_failure(&mut state);

    force_failure(&mut state);
    let error = feedback
        .on_tick(&mut state, &config)
        .expect_err("second failure has no schedule entry");

    assert_eq!(
        error,
        ConfigError::ScheduleExhausted {
            failures: 1,
            schedule_len: 1,
        }
    );
    assert_eq!(state.failure_count, 1, "failed adaptation leaves state untouched");
}

#[test]
fn drifting_stimulus_fails_once_and_lowers_intercept() {
    let config = calibration_config(10)
        .with_slope(0.0)
        .expect("zero slope is valid");
    let mut feedback = CalibrationFeedback::new();
    let mut state = SessionState::seeded(&config);
    state.stim_pos = 0.005;

    let factor = 1.0 + 0.125 / 10.0;
    let mut ticks = 0;
    loop {
        let result = feedback.on_tick(&mut state, &config).expect("schedule covers");
        if result.applied {
            break;
        }
        let before = state.stim_pos;
        let step = advance(&state, &config);
        step.commit(&mut state);
        assert!((state.stim_pos - before * factor).abs() < 1e-12);
        ticks += 1;
        assert!(ticks < 1_000, "stimulus never left the bounds");
    }

    assert!(state.distance_to_center > 0.8);
    assert_eq!(state.failure_count, 1);
    assert!((state.difficulty_intercept - (0.125 - 0.0625)).abs() < 1e-12);
    assert_eq!(feedback.outcome().failure_difficulties(), &[0.125]);
}

#[test]
fn ceiling_averages_three_best_failures() {
    let outcome = CalibrationOutcome::from_difficulties(vec![0.10, 0.12, 0.15, 0.09]);
    let ceiling = derive_assessment_ceiling(&outcome, 0.5).expect("enough failures");

    let expected = (0.15 + 0.12 + 0.10) / 3.0 * 0.5;
    assert!((ceiling - expected).abs() < 1e-12);
    assert!((ceiling - 0.0617).abs() < 1e-4);
}

#[test]
fn ceiling_requires_three_failures() {
    let outcome = CalibrationOutcome::from_difficulties(vec![0.10, 0.12]);
    assert_eq!(
        derive_assessment_ceiling(&outcome, 0.5),
        Err(ConfigError::InsufficientFailures {
            observed: 2,
            required: 3,
        })
    );
}
