use std::{cell::RefCell, rc::Rc};

use cst_core::{Marker, SessionState, TaskConfig, TaskMode};
use cst_io::{
    ButtonState, Clock, DeviceError, FallbackInput, HeadlessRenderer, InputDevice, ManualClock,
    Overlay, Renderer, StimulusLink, TelemetryHub, TelemetrySink,
};
use glam::DVec2;

struct FlakyDevice {
    readings: Vec<f64>,
    shutdowns: Rc<RefCell<u32>>,
}

impl InputDevice for FlakyDevice {
    fn name(&self) -> &str {
        "flaky"
    }

    fn get_position(&mut self) -> Result<DVec2, DeviceError> {
        match self.readings.pop() {
            Some(x) => Ok(DVec2::new(x, 0.0)),
            None => Err(DeviceError::Protocol {
                device: "flaky".to_owned(),
                detail: "empty reply".to_owned(),
            }),
        }
    }

    fn reset_position(&mut self, _origin: DVec2) -> Result<(), DeviceError> {
        Ok(())
    }

    fn get_button_state(&mut self) -> Result<ButtonState, DeviceError> {
        Ok(ButtonState::Pressed)
    }

    fn shutdown(&mut self) -> Result<(), DeviceError> {
        *self.shutdowns.borrow_mut() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Rc<RefCell<Vec<String>>>,
    fail_samples: bool,
}

impl TelemetrySink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn mark_event(&mut self, marker: &Marker, _at: f64) -> Result<(), DeviceError> {
        self.events.borrow_mut().push(marker.label());
        Ok(())
    }

    fn push_sample(&mut self, values: &[f64], _at: f64) -> Result<(), DeviceError> {
        if self.fail_samples {
            return Err(DeviceError::Unavailable {
                device: "recording".to_owned(),
                reason: "outlet closed".to_owned(),
            });
        }
        self.events.borrow_mut().push(format!("sample:{}", values.len()));
        Ok(())
    }
}

#[test]
fn failing_input_degrades_to_zero_position() {
    let shutdowns = Rc::new(RefCell::new(0));
    let mut input = FallbackInput::new(Box::new(FlakyDevice {
        readings: vec![0.25],
        shutdowns: Rc::clone(&shutdowns),
    }));

    assert!((input.position() - 0.25).abs() < f64::EPSILON);
    assert_eq!(input.button(), ButtonState::Pressed);
    assert!(!input.is_degraded());

    assert!(input.position().abs() < f64::EPSILON);
    assert!(input.is_degraded());
    assert_eq!(*shutdowns.borrow(), 1);
    assert_eq!(input.name(), "flaky (disconnected)");

    assert_eq!(input.button(), ButtonState::Released);
    assert!(input.position().abs() < f64::EPSILON);
}

#[test]
fn failing_sink_is_replaced_without_affecting_others() {
    let healthy_events = Rc::new(RefCell::new(Vec::new()));
    let failing_events = Rc::new(RefCell::new(Vec::new()));

    let mut hub = TelemetryHub::new();
    hub.attach(Box::new(RecordingSink {
        events: Rc::clone(&healthy_events),
        fail_samples: false,
    }));
    hub.attach(Box::new(RecordingSink {
        events: Rc::clone(&failing_events),
        fail_samples: true,
    }));

    hub.mark_event(
        &Marker::PhaseOnset {
            mode: TaskMode::Practice,
        },
        0.0,
    );
    hub.push_sample(&[1.0, 2.0], 1.0);
    hub.push_sample(&[1.0, 2.0, 3.0], 1.1);
    hub.mark_event(
        &Marker::PhaseEnded {
            mode: TaskMode::Practice,
        },
        2.0,
    );

    assert_eq!(
        *healthy_events.borrow(),
        vec![
            "Onset PRACTICE".to_owned(),
            "sample:2".to_owned(),
            "sample:3".to_owned(),
            "TaskEnded PRACTICE".to_owned(),
        ]
    );
    assert_eq!(*failing_events.borrow(), vec!["Onset PRACTICE".to_owned()]);
    assert_eq!(hub.len(), 2);
    assert_eq!(hub.sink_names(), vec!["recording", "recording (disconnected)"]);
}

#[test]
fn headless_renderer_publishes_and_flips_on_time() {
    let link = StimulusLink::new();
    let mut renderer = HeadlessRenderer::new().with_link(link.clone());
    let clock = ManualClock::new();

    let mut state = SessionState::seeded(&TaskConfig::new(TaskMode::Assessment));
    state.stim_pos = -0.3;
    renderer.draw(&state, Overlay::None).expect("headless draw");
    let flipped = renderer
        .flip_no_earlier_than(&clock, 1.0)
        .expect("headless flip");

    assert!((link.latest() + 0.3).abs() < f64::EPSILON);
    assert!((flipped - 1.0).abs() < 1e-12);
    assert!((clock.now() - 1.0).abs() < 1e-12);
    assert_eq!(renderer.frames(), 1);

    renderer.show_message("Press enter").expect("auto acknowledge");
    assert_eq!(renderer.messages(), ["Press enter".to_owned()]);
}
