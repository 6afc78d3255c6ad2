use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use cst_core::{TaskConfig, TaskConfigOverrides, TaskMode};
use cst_session::SessionPlan;
use serde::Deserialize;
use tracing::info;

const INITIAL_DIFFICULTY: f64 = 0.100;
const ASSESSMENT_PROPORTION: f64 = 0.3;

/// Per-phase override tables, as read from a settings file or the command line.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) practice: TaskConfigOverrides,
    pub(crate) calibration: TaskConfigOverrides,
    pub(crate) assessment: TaskConfigOverrides,
}

impl Settings {
    /// Reads a TOML settings file. No path or a missing file yields empty overrides.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("malformed settings file {}", path.display())),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "settings file not found; using defaults");
                Ok(Self::default())
            }
            Err(error) => {
                Err(error).with_context(|| format!("failed to read settings file {}", path.display()))
            }
        }
    }

    /// Defaults of the session launcher, layered over the per-mode task defaults.
    ///
    /// Calibration and assessment start from the same difficulty intercept.
    fn launcher_defaults() -> Self {
        Self {
            practice: TaskConfigOverrides::default(),
            calibration: TaskConfigOverrides {
                initial_difficulty: Some(INITIAL_DIFFICULTY),
                ..TaskConfigOverrides::default()
            },
            assessment: TaskConfigOverrides {
                initial_difficulty: Some(INITIAL_DIFFICULTY),
                assessment_proportion: Some(ASSESSMENT_PROPORTION),
                ..TaskConfigOverrides::default()
            },
        }
    }

    fn overrides(&self, mode: TaskMode) -> &TaskConfigOverrides {
        match mode {
            TaskMode::Practice => &self.practice,
            TaskMode::Calibrate => &self.calibration,
            TaskMode::Assessment => &self.assessment,
        }
    }
}

/// Builds the session plan from launcher defaults, then `file`, then `cli`.
///
/// Practice lasts as long as the assessment unless either layer sets its
/// duration explicitly.
pub(crate) fn build_plan(file: &Settings, cli: &Settings) -> Result<SessionPlan> {
    let defaults = Settings::launcher_defaults();
    let layered = |mode: TaskMode| -> Result<TaskConfig> {
        let mut config = TaskConfig::new(mode);
        for layer in [&defaults, file, cli] {
            config = config
                .apply_overrides(layer.overrides(mode))
                .with_context(|| format!("invalid {mode} settings"))?;
        }
        Ok(config)
    };

    let assessment = layered(TaskMode::Assessment)?;
    let mut practice = layered(TaskMode::Practice)?;
    if file.practice.max_seconds.is_none() && cli.practice.max_seconds.is_none() {
        practice = practice.with_max_seconds(assessment.max_seconds())?;
    }
    let calibration = layered(TaskMode::Calibrate)?;

    SessionPlan::new(practice, calibration, assessment).context("session plan rejected")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_defaults_shape_the_plan() {
        let plan = build_plan(&Settings::default(), &Settings::default()).expect("valid plan");

        let calibration = plan.config(TaskMode::Calibrate);
        assert_eq!(calibration.initial_difficulty(), 0.100);
        assert_eq!(calibration.required_failures(), 10);
        assert_eq!(calibration.max_seconds(), 600.0);

        let assessment = plan.config(TaskMode::Assessment);
        assert_eq!(assessment.assessment_proportion(), 0.3);
        assert_eq!(assessment.initial_difficulty(), 0.100);
        assert_eq!(plan.config(TaskMode::Practice).max_seconds(), 600.0);
        assert_eq!(plan.config(TaskMode::Practice).initial_difficulty(), 0.01);
    }

    #[test]
    fn command_line_wins_over_settings_file() {
        let file: Settings = toml::from_str(
            "[calibration]\ninitial_difficulty = 0.2\nslope = 40.0\n\n[assessment]\nmax_seconds = 90.0\n",
        )
        .expect("valid settings");
        let cli = Settings {
            calibration: TaskConfigOverrides {
                initial_difficulty: Some(0.15),
                ..TaskConfigOverrides::default()
            },
            ..Settings::default()
        };

        let plan = build_plan(&file, &cli).expect("valid plan");
        let calibration = plan.config(TaskMode::Calibrate);
        assert_eq!(calibration.initial_difficulty(), 0.15);
        assert_eq!(calibration.slope(), 40.0);
        assert_eq!(plan.config(TaskMode::Practice).max_seconds(), 90.0);
    }

    #[test]
    fn explicit_practice_duration_is_kept() {
        let cli = Settings {
            practice: TaskConfigOverrides {
                max_seconds: Some(45.0),
                ..TaskConfigOverrides::default()
            },
            ..Settings::default()
        };
        let plan = build_plan(&Settings::default(), &cli).expect("valid plan");
        assert_eq!(plan.config(TaskMode::Practice).max_seconds(), 45.0);
    }

    #[test]
    fn unknown_keys_and_invalid_values_are_rejected() {
        assert!(toml::from_str::<Settings>("[calibration]\nlambda = 1.0\n").is_err());
        assert!(toml::from_str::<Settings>("[scheduler]\n").is_err());

        let file: Settings =
            toml::from_str("[calibration]\nrequired_failures = 2\n").expect("parses");
        assert!(build_plan(&file, &Settings::default()).is_err());
    }

    #[test]
    fn missing_settings_file_means_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).expect("defaults");
        assert_eq!(settings, Settings::default());

        let path = dir.path().join("settings.toml");
        fs::write(&path, "[practice]\nmax_seconds = 12.5\n").expect("write settings");
        let settings = Settings::load(Some(&path)).expect("valid file");
        assert_eq!(settings.practice.max_seconds, Some(12.5));

        fs::write(&path, "[practice\n").expect("write settings");
        assert!(Settings::load(Some(&path)).is_err());
    }
}
