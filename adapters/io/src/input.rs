use glam::DVec2;
use tracing::{debug, warn};

use crate::DeviceError;

/// State of the auxiliary button on the input device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ButtonState {
    /// No button is held.
    #[default]
    Released,
    /// The response button is held.
    Pressed,
    /// The operator requested the phase to stop.
    Abort,
}

/// Provider of the corrective position.
///
/// Backends are selected once at configuration time and are never rebound
/// while a phase runs.
pub trait InputDevice {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Current corrective position. Only `x` drives the tracked axis.
    fn get_position(&mut self) -> Result<DVec2, DeviceError>;

    /// Re-centres the device so that it reports `origin` from now on.
    fn reset_position(&mut self, origin: DVec2) -> Result<(), DeviceError>;

    /// Current button state.
    fn get_button_state(&mut self) -> Result<ButtonState, DeviceError>;

    /// Releases the device at the end of the session.
    fn shutdown(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Stand-in used when no input backend is bound or the bound one failed.
#[derive(Debug)]
pub struct NullDevice {
    name: String,
}

impl NullDevice {
    /// Creates a stand-in reporting under the provided name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::named("null-input")
    }
}

impl InputDevice for NullDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_position(&mut self) -> Result<DVec2, DeviceError> {
        Ok(DVec2::ZERO)
    }

    fn reset_position(&mut self, origin: DVec2) -> Result<(), DeviceError> {
        debug!(device = %self.name, ?origin, "reset ignored by null input");
        Ok(())
    }

    fn get_button_state(&mut self) -> Result<ButtonState, DeviceError> {
        Ok(ButtonState::Released)
    }
}

/// Input wrapper that degrades to a [`NullDevice`] after the first failure.
///
/// The tick loop never sees a device error: the failing backend is shut down
/// once, a warning is emitted, and the phase continues with zero input.
pub struct FallbackInput {
    device: Box<dyn InputDevice>,
    degraded: bool,
}

impl FallbackInput {
    /// Wraps the provided backend.
    #[must_use]
    pub fn new(device: Box<dyn InputDevice>) -> Self {
        Self {
            device,
            degraded: false,
        }
    }

    /// Wraps a [`NullDevice`] from the start.
    #[must_use]
    pub fn null() -> Self {
        Self::new(Box::new(NullDevice::default()))
    }

    /// Name of the backend currently answering.
    #[must_use]
    pub fn name(&self) -> &str {
        self.device.name()
    }

    /// Reports whether the original backend has been replaced.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Corrective position on the tracked axis.
    pub fn position(&mut self) -> f64 {
        match self.device.get_position() {
            Ok(position) => position.x,
            Err(error) => {
                self.degrade(&error);
                0.0
            }
        }
    }

    /// Re-centres the device on the origin.
    pub fn recentre(&mut self) {
        if let Err(error) = self.device.reset_position(DVec2::ZERO) {
            self.degrade(&error);
        }
    }

    /// Current button state; a failing device reports [`ButtonState::Released`].
    pub fn button(&mut self) -> ButtonState {
        match self.device.get_button_state() {
            Ok(state) => state,
            Err(error) => {
                self.degrade(&error);
                ButtonState::Released
            }
        }
    }

    /// Shuts the backend down, logging any failure.
    pub fn shutdown(&mut self) {
        if let Err(error) = self.device.shutdown() {
            warn!(device = %self.device.name(), %error, "input shutdown failed");
        }
    }

    fn degrade(&mut self, error: &DeviceError) {
        let name = self.device.name().to_owned();
        warn!(device = %name, %error, "input device failed; continuing without input");
        if let Err(shutdown_error) = self.device.shutdown() {
            debug!(device = %name, error = %shutdown_error, "shutdown after failure also failed");
        }
        self.device = Box::new(NullDevice::named(format!("{name} (disconnected)")));
        self.degraded = true;
    }
}

impl std::fmt::Debug for FallbackInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackInput")
            .field("device", &self.device.name())
            .field("degraded", &self.degraded)
            .finish()
    }
}
