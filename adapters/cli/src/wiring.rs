use std::{
    fs::{self, File, OpenOptions},
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use cst_devices::{
    discover_ports, Accelerometer, AxisMapping, MarkerLogSink, SimulatedSubject, SubjectProfile,
    TriggerPortSink, ACCELEROMETER_PORT_PREFIX,
};
use cst_io::{FallbackInput, NullSink, StimulusLink, TelemetryHub};
use tracing::{info, warn};

use crate::InputMode;

const DEVICE_DIR: &str = "/dev";

/// Connects the requested input backend, standing in a null device when it is unavailable.
pub(crate) fn input(
    mode: InputMode,
    mapping: AxisMapping,
    link: &StimulusLink,
    seed: u64,
) -> FallbackInput {
    let connected = match mode {
        InputMode::None => {
            info!("running without input device");
            return FallbackInput::null();
        }
        InputMode::Accel => {
            let ports = discover_ports(Path::new(DEVICE_DIR), ACCELEROMETER_PORT_PREFIX);
            Accelerometer::connect(&ports, mapping).map(|device| FallbackInput::new(Box::new(device)))
        }
        InputMode::Simulated => SimulatedSubject::new(link.clone(), SubjectProfile::default(), seed)
            .map(|subject| FallbackInput::new(Box::new(subject))),
    };

    connected.unwrap_or_else(|error| {
        warn!(%error, "input device unavailable; continuing without input");
        FallbackInput::null()
    })
}

/// Opens the serial line that carries scanner trigger pulses.
pub(crate) fn scanner_pulses(port: &Path) -> Result<BufReader<File>> {
    let file = File::open(port)
        .with_context(|| format!("failed to open scanner trigger line {}", port.display()))?;
    info!(port = %port.display(), "message screens wait for scanner trigger");
    Ok(BufReader::new(file))
}

/// Attaches the requested marker sinks.
///
/// An unreachable trigger port is replaced by a null sink; the marker log is
/// local output, so failing to create it is an error.
pub(crate) fn telemetry(trigger_port: Option<&Path>, marker_log: Option<&Path>) -> Result<TelemetryHub> {
    let mut hub = TelemetryHub::new();

    if let Some(port) = trigger_port {
        match OpenOptions::new().write(true).open(port) {
            Ok(file) => hub.attach(Box::new(TriggerPortSink::new("eeg", file))),
            Err(error) => {
                warn!(port = %port.display(), %error, "trigger port unavailable; eeg markers disabled");
                hub.attach(Box::new(NullSink::named("eeg")));
            }
        }
    }

    if let Some(path) = marker_log {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create marker log {}", path.display()))?;
        info!(path = %path.display(), "writing tracker markers");
        hub.attach(Box::new(MarkerLogSink::new("tracker", file)));
    }

    Ok(hub)
}
