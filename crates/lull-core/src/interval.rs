//! Repeating ticks for polling and clocks.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_time::{Duration, Instant};

use crate::effects::Dispose;
use crate::error::{Result, TimingError};
use crate::scope::ScopeLink;
use crate::slot::TimerSlot;
use crate::spec::IntervalSpec;
use crate::timer::SharedHost;

type Tick = Rc<RefCell<dyn FnMut(u64)>>;

struct IntervalState {
    period: Duration,
    slot: TimerSlot,
    next_deadline: Option<Instant>,
    ticks: u64,
    skipped: u64,
    paused: bool,
    torn_down: bool,
    scope: Option<ScopeLink>,
    tick: Tick,
}

/// Calls `tick(n)` every period, `n` counting from 1.
///
/// Deadlines advance from the previous deadline, not from when the host got
/// around to firing, so lateness does not accumulate. If the host falls more
/// than a whole period behind, the missed ticks are skipped rather than
/// delivered in a burst.
pub struct Interval {
    state: Rc<RefCell<IntervalState>>,
}

impl Interval {
    pub fn new(
        host: SharedHost,
        spec: IntervalSpec,
        tick: impl FnMut(u64) + 'static,
    ) -> Result<Self> {
        if spec.period.is_zero() {
            return Err(TimingError::ZeroPeriod { field: "period" });
        }

        let tick: Tick = Rc::new(RefCell::new(tick));
        let state = Rc::new(RefCell::new(IntervalState {
            period: spec.period,
            slot: TimerSlot::new(host),
            next_deadline: None,
            ticks: 0,
            skipped: 0,
            paused: false,
            torn_down: false,
            scope: None,
            tick,
        }));

        let first = if spec.immediate {
            Duration::ZERO
        } else {
            spec.period
        };
        schedule(&state, first);

        let weak = Rc::downgrade(&state);
        state.borrow_mut().scope = ScopeLink::register(move || {
            if let Some(state) = weak.upgrade() {
                teardown(&state);
            }
        });

        log::debug!("interval: started (period {:?})", spec.period);
        Ok(Self { state })
    }

    pub fn period(&self) -> Duration {
        self.state.borrow().period
    }

    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    /// Ticks dropped because the host was more than a period late.
    pub fn skipped(&self) -> u64 {
        self.state.borrow().skipped
    }

    pub fn is_running(&self) -> bool {
        let s = self.state.borrow();
        !s.paused && !s.torn_down
    }

    pub fn pause(&self) {
        let mut s = self.state.borrow_mut();
        if s.paused || s.torn_down {
            return;
        }
        s.paused = true;
        s.next_deadline = None;
        s.slot.disarm();
        log::trace!("interval: paused after {} ticks", s.ticks);
    }

    /// Resumes with a full period before the next tick.
    pub fn resume(&self) {
        let period = {
            let mut s = self.state.borrow_mut();
            if !s.paused || s.torn_down {
                return;
            }
            s.paused = false;
            s.period
        };
        schedule(&self.state, period);
        log::trace!("interval: resumed");
    }

    /// Stops ticking for good. Idempotent.
    pub fn teardown(&self) {
        teardown(&self.state);
    }

    pub fn dispose_guard(&self) -> Dispose {
        let weak = Rc::downgrade(&self.state);
        Dispose::new(move || {
            if let Some(state) = weak.upgrade() {
                teardown(&state);
            }
        })
    }
}

fn schedule(state: &Rc<RefCell<IntervalState>>, delay: Duration) {
    let mut s = state.borrow_mut();
    let now = s.slot.now();
    s.next_deadline = now.checked_add(delay);
    let weak = Rc::downgrade(state);
    s.slot.arm(delay, move |epoch| fire(weak, epoch));
}

fn fire(weak: Weak<RefCell<IntervalState>>, epoch: u64) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    let (tick, n) = {
        let mut s = state.borrow_mut();
        if s.torn_down || !s.slot.fired(epoch) {
            return;
        }
        let now = s.slot.now();
        s.ticks += 1;

        let period = s.period;
        let mut next = s.next_deadline.unwrap_or(now).checked_add(period);
        let mut missed = 0;
        while let Some(due) = next.filter(|d| *d <= now) {
            next = due.checked_add(period);
            missed += 1;
        }
        if missed > 0 {
            s.skipped += missed;
            log::warn!("interval: host {missed} period(s) late, skipping");
        }
        s.next_deadline = next;

        // Re-arm before ticking so the tick can pause or tear down.
        let delay = next.map_or(Duration::MAX, |d| d.saturating_duration_since(now));
        let again = weak.clone();
        s.slot.arm(delay, move |epoch| fire(again, epoch));
        (s.tick.clone(), s.ticks)
    };
    (&mut *tick.borrow_mut())(n);
}

fn teardown(state: &Rc<RefCell<IntervalState>>) {
    let mut s = state.borrow_mut();
    if s.torn_down {
        return;
    }
    s.torn_down = true;
    s.scope = None;
    s.next_deadline = None;
    s.slot.disarm();
    log::debug!("interval: torn down after {} ticks", s.ticks);
}

impl Drop for Interval {
    fn drop(&mut self) {
        teardown(&self.state);
    }
}
