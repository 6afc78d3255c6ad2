use std::collections::VecDeque;

use cst_io::{ButtonState, DeviceError, InputDevice, StimulusLink};
use glam::DVec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const DEVICE: &str = "simulated-subject";

/// Behaviour of a simulated participant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubjectProfile {
    /// Fraction of the observed displacement the subject counters.
    pub gain: f64,
    /// Polls between seeing the stimulus and acting on it.
    pub reaction_delay_ticks: usize,
    /// Standard deviation of the motor noise added to every response.
    pub noise_sd: f64,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            gain: 0.9,
            reaction_delay_ticks: 6,
            noise_sd: 0.01,
        }
    }
}

/// Proportional controller standing in for a participant.
///
/// The subject reads the presented stimulus through a [`StimulusLink`] and
/// answers with the opposite displacement, late and noisy.
#[derive(Debug)]
pub struct SimulatedSubject {
    link: StimulusLink,
    profile: SubjectProfile,
    noise: Normal<f64>,
    rng: ChaCha8Rng,
    seen: VecDeque<f64>,
}

impl SimulatedSubject {
    /// Creates a subject watching `link`.
    ///
    /// Fails when `noise_sd` is negative or not finite.
    pub fn new(link: StimulusLink, profile: SubjectProfile, seed: u64) -> Result<Self, DeviceError> {
        let unavailable = |reason: String| DeviceError::Unavailable {
            device: DEVICE.to_owned(),
            reason,
        };
        if !(profile.noise_sd.is_finite() && profile.noise_sd >= 0.0) {
            return Err(unavailable(format!(
                "noise standard deviation must be finite and non-negative, got {}",
                profile.noise_sd
            )));
        }
        let noise =
            Normal::new(0.0, profile.noise_sd).map_err(|error| unavailable(error.to_string()))?;
        Ok(Self {
            link,
            profile,
            noise,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seen: VecDeque::with_capacity(profile.reaction_delay_ticks + 1),
        })
    }
}

impl InputDevice for SimulatedSubject {
    fn name(&self) -> &str {
        DEVICE
    }

    fn get_position(&mut self) -> Result<DVec2, DeviceError> {
        self.seen.push_back(self.link.latest());
        let acted_on = if self.seen.len() > self.profile.reaction_delay_ticks {
            self.seen.pop_front().unwrap_or_default()
        } else {
            0.0
        };
        let x = -self.profile.gain * acted_on + self.noise.sample(&mut self.rng);
        Ok(DVec2::new(x, 0.0))
    }

    fn reset_position(&mut self, _origin: DVec2) -> Result<(), DeviceError> {
        self.seen.clear();
        Ok(())
    }

    fn get_button_state(&mut self) -> Result<ButtonState, DeviceError> {
        Ok(ButtonState::Released)
    }
}
