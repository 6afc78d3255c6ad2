use cst_core::{SessionState, TaskConfig, TaskMode};
use cst_system_plant::{advance, score_increment, update_difficulty};

#[test]
fn difficulty_never_exceeds_ceiling() {
    let intercepts = [-1.0, 0.0, 0.05, 0.125, 2.0, 50.0];
    let slopes = [0.0, 0.5, 15.0, 20.0, 1_000.0];
    let elapsed = [0.0, 0.033, 1.0, 60.0, 600.0, 10_000.0];
    let ceilings = [0.05, 0.125, 10.0];

    for &intercept in &intercepts {
        for &slope in &slopes {
            for &time in &elapsed {
                for &ceiling in &ceilings {
                    let value = update_difficulty(intercept, slope, time, ceiling);
                    assert!(
                        value <= ceiling,
                        "difficulty {value} exceeded ceiling {ceiling} \
                         (intercept {intercept}, slope {slope}, elapsed {time})"
                    );
                }
            }
        }
    }
}

#[test]
fn stimulus_grows_geometrically_without_input() {
    let config = TaskConfig::new(TaskMode::Calibrate)
        .with_slope(0.0)
        .expect("zero slope is valid");
    let mut state = SessionState::seeded(&config);
    state.stim_pos = 0.005;

    let factor = 1.0 + state.difficulty / 10.0;
    let mut expected = 0.005;
    for _ in 0..50 {
        let step = advance(&state, &config);
        expected *= factor;
        assert!(
            (step.next_stim_pos - expected).abs() < 1e-12,
            "expected {expected}, got {}",
            step.next_stim_pos
        );
        step.commit(&mut state);
    }
}

#[test]
fn advance_reports_pre_drift_distance() {
    let config = TaskConfig::new(TaskMode::Practice);
    let mut state = SessionState::seeded(&config);
    state.stim_pos = 0.4;
    state.user_pos = 0.1;
    state.difficulty = 1.0;

    let step = advance(&state, &config);

    assert!((step.distance - 0.5).abs() < 1e-12);
    assert!((step.change_rate - 0.05).abs() < 1e-12);
    assert!((step.next_stim_pos - 0.45).abs() < 1e-12);
}

#[test]
fn corrective_input_cancels_drift() {
    let config = TaskConfig::new(TaskMode::Practice);
    let mut state = SessionState::seeded(&config);
    state.stim_pos = 0.3;
    state.user_pos = -0.3;
    state.difficulty = 5.0;

    let step = advance(&state, &config);

    assert!(step.change_rate.abs() < 1e-12);
    assert!((step.next_stim_pos - 0.3).abs() < 1e-12);
}

#[test]
fn score_accrues_only_near_center() {
    let config = TaskConfig::new(TaskMode::Assessment);
    let inside = score_increment(0.01, &config);
    let outside = score_increment(0.2, &config);

    assert!((inside - 1.25 / 30.0).abs() < 1e-12);
    assert!(outside.abs() < f64::EPSILON);
}
