//! Throttled invokers.
//!
//! A [`Throttled`] wraps an action so it runs at most once per window. The
//! first request of a window runs immediately (leading edge). With
//! [`TrailingPolicy::Coalesce`] the last request made while the window was
//! open runs once more at the boundary (trailing edge), which opens the next
//! window; with [`TrailingPolicy::Drop`] such requests are discarded.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_time::{Duration, Instant};

use crate::effects::Dispose;
use crate::scope::ScopeLink;
use crate::slot::TimerSlot;
use crate::spec::{ThrottleSpec, TrailingPolicy};
use crate::timer::SharedHost;

struct ThrottleState<A> {
    action: Rc<dyn Fn(A)>,
    interval: Duration,
    trailing: TrailingPolicy,
    last_fire: Option<Instant>,
    queued: Option<A>,
    slot: TimerSlot,
    executions: u64,
    torn_down: bool,
    scope: Option<ScopeLink>,
}

impl<A> ThrottleState<A> {
    /// Time left in the current window, if one is open at `now`.
    fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fire?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.interval).then(|| self.interval - elapsed)
    }

    fn record_fire(&mut self, now: Instant) -> Rc<dyn Fn(A)> {
        self.last_fire = Some(now);
        self.executions += 1;
        self.action.clone()
    }
}

pub struct Throttled<A: 'static> {
    state: Rc<RefCell<ThrottleState<A>>>,
}

impl<A: 'static> Throttled<A> {
    pub fn new(host: SharedHost, spec: ThrottleSpec, action: impl Fn(A) + 'static) -> Self {
        let state = Rc::new(RefCell::new(ThrottleState {
            action: Rc::new(action),
            interval: spec.interval,
            trailing: spec.trailing,
            last_fire: None,
            queued: None,
            slot: TimerSlot::new(host),
            executions: 0,
            torn_down: false,
            scope: None,
        }));

        let weak = Rc::downgrade(&state);
        state.borrow_mut().scope = ScopeLink::register(move || {
            if let Some(state) = weak.upgrade() {
                teardown(&state);
            }
        });

        log::debug!(
            "throttle: created (interval {:?}, trailing {:?})",
            spec.interval,
            spec.trailing
        );
        Self { state }
    }

    /// Runs the action now if no window is open, otherwise applies the
    /// trailing policy. The action runs on the caller's stack for leading
    /// executions and on the timer host's for trailing ones; panics are not
    /// caught.
    pub fn request(&self, arg: A) {
        let action = {
            let mut s = self.state.borrow_mut();
            if s.torn_down {
                log::trace!("throttle: request after teardown ignored");
                return;
            }
            let now = s.slot.now();
            if let Some(remaining) = s.remaining(now) {
                let trailing = s.trailing;
                match trailing {
                    TrailingPolicy::Drop => {
                        log::trace!("throttle: dropped request ({remaining:?} left in window)");
                    }
                    TrailingPolicy::Coalesce => {
                        s.queued = Some(arg);
                        if !s.slot.is_armed() {
                            let weak = Rc::downgrade(&self.state);
                            s.slot
                                .arm(remaining, move |epoch| fire_trailing(&weak, epoch));
                        }
                    }
                }
                return;
            }
            // The host has not yet run a trailing call that is already due;
            // this request is newer and takes its place.
            if s.slot.disarm() {
                s.queued = None;
                log::trace!("throttle: overdue trailing call superseded");
            }
            s.record_fire(now)
        };
        action(arg);
    }

    pub fn interval(&self) -> Duration {
        self.state.borrow().interval
    }

    /// Effective executions so far, leading and trailing.
    pub fn executions(&self) -> u64 {
        self.state.borrow().executions
    }

    pub fn last_fire(&self) -> Option<Instant> {
        self.state.borrow().last_fire
    }

    /// Whether a trailing execution is scheduled.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().slot.is_armed()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.borrow().torn_down
    }

    /// Discards the queued trailing execution. The current window stays open.
    pub fn cancel(&self) -> bool {
        let mut s = self.state.borrow_mut();
        s.queued = None;
        s.slot.disarm()
    }

    /// Cancels any trailing execution and stops accepting requests.
    /// Idempotent.
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

fn fire_trailing<A: 'static>(state: &Weak<RefCell<ThrottleState<A>>>, epoch: u64) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let (action, arg) = {
        let mut s = state.borrow_mut();
        if s.torn_down || !s.slot.fired(epoch) {
            return;
        }
        let Some(arg) = s.queued.take() else {
            return;
        };
        let now = s.slot.now();
        (s.record_fire(now), arg)
    };
    log::trace!("throttle: trailing execution");
    action(arg);
}

fn teardown<A>(state: &Rc<RefCell<ThrottleState<A>>>) {
    let mut s = state.borrow_mut();
    if s.torn_down {
        return;
    }
    s.torn_down = true;
    s.scope = None;
    s.queued = None;
    let cancelled = s.slot.disarm();
    log::debug!("throttle: torn down (trailing call cancelled: {cancelled})");
}

impl<A: 'static> Drop for Throttled<A> {
    fn drop(&mut self) {
        teardown(&self.state);
    }
}
