use cst_core::Marker;
use tracing::{debug, warn};

use crate::DeviceError;

/// Destination for phase markers and per-tick samples.
///
/// Calls are best-effort: the [`TelemetryHub`] swaps a failing sink for a
/// [`NullSink`] and the tick loop keeps running.
pub trait TelemetrySink {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Records a discrete event at experiment time `at`.
    fn mark_event(&mut self, marker: &Marker, at: f64) -> Result<(), DeviceError>;

    /// Records one row of tick values at experiment time `at`.
    fn push_sample(&mut self, values: &[f64], at: f64) -> Result<(), DeviceError>;
}

/// No-op sink that only emits diagnostics.
#[derive(Debug)]
pub struct NullSink {
    name: String,
}

impl NullSink {
    /// Creates a no-op sink reporting under the provided name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TelemetrySink for NullSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn mark_event(&mut self, marker: &Marker, at: f64) -> Result<(), DeviceError> {
        debug!(sink = %self.name, label = %marker.label(), at, "marker dropped");
        Ok(())
    }

    fn push_sample(&mut self, _values: &[f64], _at: f64) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Fan-out over every enabled telemetry sink.
#[derive(Default)]
pub struct TelemetryHub {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl TelemetryHub {
    /// Creates a hub without sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink to the fan-out.
    pub fn attach(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    /// Number of attached sinks, including stand-ins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Reports whether no sink is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Names of the attached sinks.
    #[must_use]
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Forwards a marker to every sink.
    pub fn mark_event(&mut self, marker: &Marker, at: f64) {
        for sink in &mut self.sinks {
            if let Err(error) = sink.mark_event(marker, at) {
                replace_failed(sink, &error);
            }
        }
    }

    /// Forwards a sample to every sink.
    pub fn push_sample(&mut self, values: &[f64], at: f64) {
        for sink in &mut self.sinks {
            if let Err(error) = sink.push_sample(values, at) {
                replace_failed(sink, &error);
            }
        }
    }
}

impl std::fmt::Debug for TelemetryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHub")
            .field("sinks", &self.sink_names())
            .finish()
    }
}

fn replace_failed(sink: &mut Box<dyn TelemetrySink>, error: &DeviceError) {
    let name = sink.name().to_owned();
    warn!(sink = %name, %error, "telemetry sink failed; replacing with a no-op");
    *sink = Box::new(NullSink::named(format!("{name} (disconnected)")));
}
