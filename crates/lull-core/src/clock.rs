use std::cell::Cell;
use std::rc::Rc;

use web_time::{Duration, Instant};

/// Source of "now" for a timer host.
pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock you drive by hand. Clones share the same reading.
#[derive(Clone)]
pub struct ManualClock {
    t: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            t: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, t: Instant) {
        // never runs backwards
        if t > self.t.get() {
            self.t.set(t);
        }
    }

    /// Moves forward by `by`. A step past the end of representable time is
    /// ignored.
    pub fn advance(&self, by: Duration) {
        if let Some(t) = self.t.get().checked_add(by) {
            self.t.set(t);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}
