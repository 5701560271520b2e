//! Debounced values.
//!
//! [`Debounced`] turns a fast-changing input into an output that only moves
//! once the input has been quiet for the configured delay:
//!
//! ```rust
//! use std::rc::Rc;
//! use lull_core::*;
//! use std::time::Duration;
//!
//! let timers = Rc::new(Timers::manual());
//! let query = Debounced::new(timers.clone(), String::new(), DebounceSpec::search());
//!
//! query.observe("r".into());
//! query.observe("ru".into());
//! query.observe("rust".into());
//! assert_eq!(query.current(), "");
//!
//! timers.advance(Duration::from_millis(300));
//! assert_eq!(query.current(), "rust");
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::effects::Dispose;
use crate::scope::ScopeLink;
use crate::signal::{Signal, SubId};
use crate::slot::TimerSlot;
use crate::spec::DebounceSpec;
use crate::timer::SharedHost;

struct DebounceState<T> {
    latest: T,
    delay: Duration,
    slot: TimerSlot,
    torn_down: bool,
    scope: Option<ScopeLink>,
}

/// Last-write-wins projection of a value onto a quiet period.
///
/// Dropping it tears it down. When created inside a [`Scope`](crate::Scope)
/// it is also torn down with that scope.
pub struct Debounced<T: Clone + 'static> {
    state: Rc<RefCell<DebounceState<T>>>,
    output: Signal<T>,
}

impl<T: Clone + 'static> Debounced<T> {
    pub fn new(host: SharedHost, initial: T, spec: DebounceSpec) -> Self {
        let state = Rc::new(RefCell::new(DebounceState {
            latest: initial.clone(),
            delay: spec.delay,
            slot: TimerSlot::new(host),
            torn_down: false,
            scope: None,
        }));

        let weak = Rc::downgrade(&state);
        state.borrow_mut().scope = ScopeLink::register(move || {
            if let Some(state) = weak.upgrade() {
                teardown(&state);
            }
        });

        log::debug!("debounce: created (delay {:?})", spec.delay);
        Self {
            state,
            output: Signal::new(initial),
        }
    }

    /// Records `value` and restarts the quiet period.
    pub fn observe(&self, value: T) {
        let mut s = self.state.borrow_mut();
        if s.torn_down {
            log::trace!("debounce: observe after teardown ignored");
            return;
        }
        s.latest = value;
        let delay = s.delay;
        let weak = Rc::downgrade(&self.state);
        let output = self.output.clone();
        s.slot.arm(delay, move |epoch| settle(&weak, &output, epoch));
    }

    /// The settled output.
    pub fn current(&self) -> T {
        self.output.get()
    }

    /// The most recently observed input, settled or not.
    pub fn latest(&self) -> T {
        self.state.borrow().latest.clone()
    }

    pub fn delay(&self) -> Duration {
        self.state.borrow().delay
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().slot.is_armed()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.borrow().torn_down
    }

    /// Subscribes to output changes. Called once per settled quiet period.
    pub fn on_change(&self, f: impl Fn(&T) + 'static) -> SubId {
        self.output.subscribe(f)
    }

    pub fn output(&self) -> Signal<T> {
        self.output.clone()
    }

    /// Emits the pending value now. Returns `false` if nothing was pending.
    pub fn flush(&self) -> bool {
        let value = {
            let mut s = self.state.borrow_mut();
            if s.torn_down || !s.slot.disarm() {
                return false;
            }
            s.latest.clone()
        };
        log::trace!("debounce: flushed");
        self.output.set(value);
        true
    }

    /// Drops the pending emission without emitting it.
    pub fn cancel(&self) -> bool {
        self.state.borrow_mut().slot.disarm()
    }

    /// Cancels any pending emission and stops accepting input. Idempotent.
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

fn settle<T: Clone + 'static>(
    state: &Weak<RefCell<DebounceState<T>>>,
    output: &Signal<T>,
    epoch: u64,
) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let value = {
        let mut s = state.borrow_mut();
        if s.torn_down || !s.slot.fired(epoch) {
            return;
        }
        s.latest.clone()
    };
    log::trace!("debounce: settled");
    output.set(value);
}

fn teardown<T>(state: &Rc<RefCell<DebounceState<T>>>) {
    let mut s = state.borrow_mut();
    if s.torn_down {
        return;
    }
    s.torn_down = true;
    s.scope = None;
    let cancelled = s.slot.disarm();
    log::debug!("debounce: torn down (pending emission cancelled: {cancelled})");
}

impl<T: Clone + 'static> Drop for Debounced<T> {
    fn drop(&mut self) {
        teardown(&self.state);
    }
}
