#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Collaborator contracts consumed by the tick loop.
//!
//! The scheduler never talks to hardware directly. It polls an
//! [`InputDevice`] through a [`FallbackInput`], draws through a [`Renderer`],
//! forwards markers and samples to a [`TelemetryHub`] and reads time from a
//! [`Clock`]. Every contract ships with a stand-in (`NullDevice`, `NullSink`,
//! `HeadlessRenderer`, `ManualClock`) so phases can run without devices.

mod clock;
mod input;
mod render;
mod telemetry;

use thiserror::Error;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use input::{ButtonState, FallbackInput, InputDevice, NullDevice};
pub use render::{HeadlessRenderer, Overlay, Renderer, StimulusLink};
pub use telemetry::{NullSink, TelemetryHub, TelemetrySink};

/// Failures reported by device backends.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The backend could not be found or connected to.
    #[error("{device} is unavailable: {reason}")]
    Unavailable {
        /// Name of the backend.
        device: String,
        /// Human-readable cause.
        reason: String,
    },
    /// Reading from or writing to the backend failed.
    #[error("{device} i/o failed")]
    Io {
        /// Name of the backend.
        device: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The backend answered with data that could not be understood.
    #[error("{device} sent an unexpected reply: {detail}")]
    Protocol {
        /// Name of the backend.
        device: String,
        /// Description of the malformed reply.
        detail: String,
    },
}

impl DeviceError {
    /// Wraps an I/O failure raised by the named backend.
    #[must_use]
    pub fn io(device: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            device: device.into(),
            source,
        }
    }
}

/// Borrowed collaborators handed to a running phase.
pub struct Collaborators<'a> {
    /// Corrective input provider.
    pub input: &'a mut FallbackInput,
    /// Stimulus renderer.
    pub renderer: &'a mut dyn Renderer,
    /// Marker and sample fan-out.
    pub telemetry: &'a mut TelemetryHub,
    /// Experiment clock.
    pub clock: &'a dyn Clock,
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("input", &self.input.name())
            .field("sinks", &self.telemetry.len())
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
