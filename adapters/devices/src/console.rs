use std::io::{BufRead, Read, Write};

use cst_core::SessionState;
use cst_io::{DeviceError, Overlay, Renderer, StimulusLink};
use tracing::debug;

const DEVICE: &str = "console";
const TRACK_WIDTH: usize = 61;

/// Byte the scanner sends on its trigger line at every volume.
pub const SCANNER_TRIGGER: u8 = b'T';

/// How a message screen is dismissed.
#[derive(Debug)]
enum Acknowledgement {
    /// A line from the operator's keyboard.
    Enter,
    /// The first occurrence of the trigger byte on the scanner line.
    Pulse(u8),
}

/// Terminal renderer drawing the track as a single rewritten line.
#[derive(Debug)]
pub struct ConsoleRenderer<W, I> {
    out: W,
    input: I,
    acknowledgement: Acknowledgement,
    link: Option<StimulusLink>,
}

impl<W: Write, I: BufRead> ConsoleRenderer<W, I> {
    /// Creates a renderer writing to `out` and reading acknowledgements from `input`.
    pub fn new(out: W, input: I) -> Self {
        Self {
            out,
            input,
            acknowledgement: Acknowledgement::Enter,
            link: None,
        }
    }

    /// Creates a renderer whose message screens wait for `trigger` on `pulses`.
    ///
    /// Bytes other than `trigger` are discarded. A line that closes before the
    /// trigger arrives is reported as unavailable.
    pub fn pulse_gated(out: W, pulses: I, trigger: u8) -> Self {
        Self {
            out,
            input: pulses,
            acknowledgement: Acknowledgement::Pulse(trigger),
            link: None,
        }
    }

    /// Publishes every drawn stimulus position to `link`.
    #[must_use]
    pub fn with_link(mut self, link: StimulusLink) -> Self {
        self.link = Some(link);
        self
    }

    /// Output written so far.
    #[must_use]
    pub fn output(&self) -> &W {
        &self.out
    }

    fn write(&mut self, text: &str) -> Result<(), DeviceError> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|error| DeviceError::io(DEVICE, error))
    }
}

impl<W: Write, I: BufRead> Renderer for ConsoleRenderer<W, I> {
    fn draw(&mut self, state: &SessionState, overlay: Overlay) -> Result<(), DeviceError> {
        if let Some(link) = &self.link {
            link.publish(state.stim_pos);
        }
        let line = match overlay {
            Overlay::None => track_line(state.stim_pos, state.user_pos),
            Overlay::Crash => format!("{:^TRACK_WIDTH$}", "*** CRASH ***"),
            Overlay::Reset => format!("{:^TRACK_WIDTH$}", "resetting"),
        };
        self.write(&format!("\r[{line}] {:>3} ", state.failure_count))
    }

    fn show_message(&mut self, text: &str) -> Result<(), DeviceError> {
        match self.acknowledgement {
            Acknowledgement::Enter => {
                self.write(&format!("\n\n{text}\n\n(press Enter to continue)\n"))?;
                let mut reply = String::new();
                let _ = self
                    .input
                    .read_line(&mut reply)
                    .map_err(|error| DeviceError::io(DEVICE, error))?;
                Ok(())
            }
            Acknowledgement::Pulse(trigger) => {
                self.write(&format!("\n\n{text}\n\n(waiting for scanner trigger)\n"))?;
                wait_for_pulse(&mut self.input, trigger)
            }
        }
    }
}

fn wait_for_pulse<P: Read>(pulses: &mut P, trigger: u8) -> Result<(), DeviceError> {
    for byte in pulses.bytes() {
        if byte.map_err(|error| DeviceError::io(DEVICE, error))? == trigger {
            debug!("scanner trigger received");
            return Ok(());
        }
    }
    Err(DeviceError::Unavailable {
        device: DEVICE.to_owned(),
        reason: "scanner trigger line closed before a pulse arrived".to_owned(),
    })
}

/// Renders the stimulus (`o`) and the combined displacement (`x`) on a fixed-width track.
fn track_line(stim_pos: f64, user_pos: f64) -> String {
    let centre = TRACK_WIDTH / 2;
    let column = |position: f64| {
        let offset = (position.clamp(-1.0, 1.0) * centre as f64).round() as isize;
        (centre as isize + offset).clamp(0, TRACK_WIDTH as isize - 1) as usize
    };

    let mut cells = vec![' '; TRACK_WIDTH];
    cells[centre] = '|';
    cells[column(stim_pos + user_pos)] = 'x';
    cells[column(stim_pos)] = 'o';
    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::track_line;

    #[test]
    fn centred_stimulus_covers_the_midline() {
        let line = track_line(0.0, 0.0);
        assert_eq!(line.chars().count(), 61);
        assert_eq!(line.chars().nth(30), Some('o'));
    }

    #[test]
    fn positions_beyond_the_track_are_pinned_to_its_edge() {
        let line = track_line(2.0, 0.0);
        assert_eq!(line.chars().last(), Some('o'));
        assert_eq!(line.chars().nth(30), Some('|'));
    }
}
