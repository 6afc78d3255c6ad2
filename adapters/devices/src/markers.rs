use std::io::Write;

use cst_core::Marker;
use cst_io::{DeviceError, TelemetrySink};

/// Appends `time,code,label` lines for every marker.
#[derive(Debug)]
pub struct MarkerLogSink<W> {
    name: String,
    out: W,
}

impl<W: Write> MarkerLogSink<W> {
    /// Creates a sink writing to `out`.
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out,
        }
    }

    /// Destination written so far.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> TelemetrySink for MarkerLogSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn mark_event(&mut self, marker: &Marker, at: f64) -> Result<(), DeviceError> {
        writeln!(self.out, "{at:.4},{},{}", marker.port_code(), marker.label())
            .and_then(|()| self.out.flush())
            .map_err(|error| DeviceError::io(&self.name, error))
    }

    fn push_sample(&mut self, _values: &[f64], _at: f64) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Writes marker codes to a trigger port and clears it on every sample.
#[derive(Debug)]
pub struct TriggerPortSink<W> {
    name: String,
    port: W,
}

impl<W: Write> TriggerPortSink<W> {
    /// Creates a sink writing codes to `port`.
    pub fn new(name: impl Into<String>, port: W) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    /// Underlying port.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.port
    }

    fn set_data(&mut self, code: u8) -> Result<(), DeviceError> {
        self.port
            .write_all(&[code])
            .and_then(|()| self.port.flush())
            .map_err(|error| DeviceError::io(&self.name, error))
    }
}

impl<W: Write> TelemetrySink for TriggerPortSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn mark_event(&mut self, marker: &Marker, _at: f64) -> Result<(), DeviceError> {
        self.set_data(marker.port_code())
    }

    fn push_sample(&mut self, _values: &[f64], _at: f64) -> Result<(), DeviceError> {
        self.set_data(0)
    }
}
