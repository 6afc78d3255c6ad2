use std::{
    cell::Cell,
    time::{Duration, Instant},
};

/// Experiment clock measuring seconds since its last reset.
pub trait Clock {
    /// Restarts the clock at zero.
    fn reset(&self);

    /// Seconds elapsed since the last reset.
    fn now(&self) -> f64;

    /// Blocks for the provided duration.
    fn sleep(&self, duration: Duration);

    /// Blocks until the clock reads at least `at`; returns immediately when it already does.
    fn sleep_until(&self, at: f64) {
        let remaining = at - self.now();
        if remaining > 0.0 {
            self.sleep(Duration::from_secs_f64(remaining));
        }
    }
}

/// Wall-time clock backed by [`Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Cell<Instant>,
}

impl MonotonicClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Cell::new(Instant::now()),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn reset(&self) {
        self.origin.set(Instant::now());
    }

    fn now(&self) -> f64 {
        self.origin.get().elapsed().as_secs_f64()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock where sleeping advances time instantly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward without anyone sleeping, e.g. to simulate slow work.
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds.max(0.0));
    }
}

impl Clock for ManualClock {
    fn reset(&self) {
        self.now.set(0.0);
    }

    fn now(&self) -> f64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}
