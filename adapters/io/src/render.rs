use std::{cell::Cell, rc::Rc};

use cst_core::SessionState;
use tracing::info;

use crate::{Clock, DeviceError};

/// Full-screen overlay drawn over the track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overlay {
    /// Plain tracking frame.
    #[default]
    None,
    /// Shown right after the stimulus left the bounds.
    Crash,
    /// Shown while the stimulus is placed back near the centre.
    Reset,
}

/// Shared view of the last stimulus position a renderer presented.
///
/// Simulated subjects read it to react to what is on screen.
#[derive(Clone, Debug, Default)]
pub struct StimulusLink {
    latest: Rc<Cell<f64>>,
}

impl StimulusLink {
    /// Creates a link reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a presented position.
    pub fn publish(&self, stim_pos: f64) {
        self.latest.set(stim_pos);
    }

    /// Last presented position.
    #[must_use]
    pub fn latest(&self) -> f64 {
        self.latest.get()
    }
}

/// Presents the stimulus and synchronises flips with the onset schedule.
pub trait Renderer {
    /// Prepares the next frame from the current state.
    fn draw(&mut self, state: &SessionState, overlay: Overlay) -> Result<(), DeviceError>;

    /// Presents the prepared frame no earlier than `at` and returns the realized time.
    fn flip_no_earlier_than(&mut self, clock: &dyn Clock, at: f64) -> Result<f64, DeviceError> {
        clock.sleep_until(at);
        Ok(clock.now())
    }

    /// Shows a message and blocks until it is acknowledged.
    fn show_message(&mut self, text: &str) -> Result<(), DeviceError>;
}

/// Renderer that draws nothing and acknowledges every message immediately.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    link: Option<StimulusLink>,
    frames: u64,
    messages: Vec<String>,
}

impl HeadlessRenderer {
    /// Creates a renderer without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes every drawn stimulus position to `link`.
    #[must_use]
    pub fn with_link(mut self, link: StimulusLink) -> Self {
        self.link = Some(link);
        self
    }

    /// Frames drawn so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Messages shown so far, in order.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, state: &SessionState, _overlay: Overlay) -> Result<(), DeviceError> {
        if let Some(link) = &self.link {
            link.publish(state.stim_pos);
        }
        self.frames += 1;
        Ok(())
    }

    fn show_message(&mut self, text: &str) -> Result<(), DeviceError> {
        info!(lines = text.lines().count(), "message acknowledged");
        self.messages.push(text.to_owned());
        Ok(())
    }
}
