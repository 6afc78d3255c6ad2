use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use cst_io::{ButtonState, DeviceError, InputDevice};
use glam::DVec2;
use tracing::{debug, info, warn};

/// File name prefix of USB serial devices scanned during discovery.
pub const ACCELEROMETER_PORT_PREFIX: &str = "ttyACM";

/// Requests understood by the inertial sensor's ASCII protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialCommand {
    /// Makes the current orientation the zero point.
    Tare,
    /// Reads the tared orientation as Euler angles.
    TaredEuler,
    /// Reads the button state with a response header.
    ButtonState,
    /// Switches the status light to green.
    LightGreen,
}

impl SerialCommand {
    /// Wire bytes of the command, newline terminated.
    #[must_use]
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Self::Tare => b":96\n",
            Self::TaredEuler => b":01\n",
            Self::ButtonState => b";250\n",
            Self::LightGreen => b":238,0.25,1.0,25.0\n",
        }
    }

    const fn expects_reply(self) -> bool {
        matches!(self, Self::TaredEuler | Self::ButtonState)
    }
}

/// Orientation of the sensor relative to the participant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisMapping {
    /// Mirrors both axes.
    pub reverse: bool,
    /// Exchanges the two axes.
    pub swap: bool,
}

impl AxisMapping {
    /// Maps a raw `(pitch, roll)` reading onto task coordinates.
    #[must_use]
    pub fn apply(self, raw: DVec2) -> DVec2 {
        let mirrored = if self.reverse { -raw } else { raw };
        if self.swap {
            DVec2::new(mirrored.y, mirrored.x)
        } else {
            mirrored
        }
    }
}

/// Wired inertial sensor polled over a serial line.
#[derive(Debug)]
pub struct Accelerometer<P> {
    name: String,
    port: BufReader<P>,
    mapping: AxisMapping,
}

impl<P: Read + Write> Accelerometer<P> {
    /// Wraps an open port.
    pub fn new(name: impl Into<String>, port: P, mapping: AxisMapping) -> Self {
        Self {
            name: name.into(),
            port: BufReader::new(port),
            mapping,
        }
    }

    /// Underlying port.
    #[must_use]
    pub fn get_ref(&self) -> &P {
        self.port.get_ref()
    }

    /// Sends a command and, for queries, returns the comma-separated reply fields.
    pub fn send(&mut self, command: SerialCommand) -> Result<Vec<f64>, DeviceError> {
        let writer = self.port.get_mut();
        writer
            .write_all(command.bytes())
            .and_then(|()| writer.flush())
            .map_err(|error| DeviceError::io(&self.name, error))?;

        if !command.expects_reply() {
            return Ok(Vec::new());
        }

        let mut line = String::new();
        let read = self
            .port
            .read_line(&mut line)
            .map_err(|error| DeviceError::io(&self.name, error))?;
        if read == 0 {
            return Err(DeviceError::Protocol {
                device: self.name.clone(),
                detail: format!("no reply to {command:?}"),
            });
        }
        parse_reply(&self.name, &line)
    }
}

impl Accelerometer<File> {
    /// Opens the first candidate port that accepts a read-write handle.
    pub fn connect(candidates: &[PathBuf], mapping: AxisMapping) -> Result<Self, DeviceError> {
        for path in candidates {
            match OpenOptions::new().read(true).write(true).open(path) {
                Ok(file) => {
                    info!(port = %path.display(), "accelerometer connected");
                    return Ok(Self::new(
                        format!("accelerometer:{}", path.display()),
                        file,
                        mapping,
                    ));
                }
                Err(error) => {
                    warn!(port = %path.display(), %error, "accelerometer port did not connect");
                }
            }
        }
        Err(DeviceError::Unavailable {
            device: "accelerometer".to_owned(),
            reason: format!("none of {} candidate ports connected", candidates.len()),
        })
    }
}

impl<P: Read + Write> InputDevice for Accelerometer<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_position(&mut self) -> Result<DVec2, DeviceError> {
        let fields = self.send(SerialCommand::TaredEuler)?;
        match (fields.first(), fields.get(2)) {
            (Some(&pitch), Some(&roll)) => Ok(self.mapping.apply(DVec2::new(pitch, roll))),
            _ => Err(DeviceError::Protocol {
                device: self.name.clone(),
                detail: format!("expected three euler angles, got {}", fields.len()),
            }),
        }
    }

    fn reset_position(&mut self, origin: DVec2) -> Result<(), DeviceError> {
        debug!(device = %self.name, ?origin, "taring accelerometer");
        let _ = self.send(SerialCommand::Tare)?;
        Ok(())
    }

    /// The last reply field is a button bitmask: the first button responds,
    /// the second one aborts the phase.
    fn get_button_state(&mut self) -> Result<ButtonState, DeviceError> {
        let fields = self.send(SerialCommand::ButtonState)?;
        let mask = fields.last().copied().unwrap_or_default() as u32;
        Ok(if mask & 0b10 != 0 {
            ButtonState::Abort
        } else if mask & 0b01 != 0 {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        })
    }

    fn shutdown(&mut self) -> Result<(), DeviceError> {
        let _ = self.send(SerialCommand::LightGreen)?;
        Ok(())
    }
}

fn parse_reply(device: &str, line: &str) -> Result<Vec<f64>, DeviceError> {
    let payload = line.split(|c: char| c == '\r' || c == '\n').next().unwrap_or_default();
    payload
        .split(',')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|_| DeviceError::Protocol {
                device: device.to_owned(),
                detail: format!("unparsable field {field:?} in {payload:?}"),
            })
        })
        .collect()
}

/// Lists `/dev`-style entries starting with `prefix` inside `dir`, sorted by name.
pub fn discover_ports(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut ports: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .collect();
    ports.sort();
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_reverses_then_swaps() {
        let raw = DVec2::new(0.2, -0.4);
        let both = AxisMapping {
            reverse: true,
            swap: true,
        };
        assert_eq!(both.apply(raw), DVec2::new(0.4, -0.2));
        assert_eq!(AxisMapping::default().apply(raw), raw);
    }

    #[test]
    fn reply_parsing_stops_at_carriage_return() {
        let fields = parse_reply("test", "0.5,1.5,-2.0\r\n").expect("valid reply");
        assert_eq!(fields, vec![0.5, 1.5, -2.0]);
        assert!(parse_reply("test", "0.5,abc\r\n").is_err());
    }
}
