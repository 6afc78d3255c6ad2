#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Concrete device backends for the tracking task.
//!
//! Everything here implements one of the collaborator contracts from
//! `cst-io`: the serial [`Accelerometer`] and the [`SimulatedSubject`] are
//! input devices, [`ConsoleRenderer`] draws the track on a terminal and gates its
//! message screens on a key press or a scanner trigger pulse, and
//! [`MarkerLogSink`] / [`TriggerPortSink`] receive phase markers. Backends
//! that cannot connect report a `DeviceError` so callers can bind a null
//! stand-in instead.

mod accelerometer;
mod console;
mod markers;
mod simulated;

pub use accelerometer::{
    discover_ports, Accelerometer, AxisMapping, SerialCommand, ACCELEROMETER_PORT_PREFIX,
};
pub use console::{ConsoleRenderer, SCANNER_TRIGGER};
pub use markers::{MarkerLogSink, TriggerPortSink};
pub use simulated::{SimulatedSubject, SubjectProfile};
