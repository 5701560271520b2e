//! Host timer facility.
//!
//! Schedulers never talk to an OS timer directly. They hold an
//! `Rc<dyn TimerHost>` and own at most one [`TimerHandle`] from it at a time.
//! [`Timers`] is the cooperative host used by loop drivers and tests; platform
//! crates provide others.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

use crate::clock::{Clock, ManualClock, SystemClock};

new_key_type! {
    /// Slot key behind a [`TimerHandle`].
    pub struct TimerKey;
}

/// An owned, cancelable pending callback.
///
/// Not `Clone`: the holder is the only party able to cancel it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a TimerHandle does not cancel the timer"]
pub struct TimerHandle(TimerKey);

impl TimerHandle {
    /// For [`TimerHost`] implementations minting handles from their own slots.
    pub fn from_key(key: TimerKey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> TimerKey {
        self.0
    }
}

pub trait TimerHost {
    fn now(&self) -> Instant;

    /// Runs `callback` once, no earlier than `delay` from now.
    fn schedule_after(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle;

    /// Cancels a pending timer. A handle that already fired is ignored.
    fn cancel(&self, handle: TimerHandle);

    /// Whether `handle` is still waiting to fire. `false` once it has fired,
    /// been cancelled, or if the host could not arm it at all.
    fn is_scheduled(&self, handle: &TimerHandle) -> bool;
}

pub type SharedHost = Rc<dyn TimerHost>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub cancelled: u64,
}

impl TimerStats {
    /// Timers that were scheduled but neither fired nor cancelled.
    pub fn outstanding(&self) -> u64 {
        self.scheduled - self.fired - self.cancelled
    }
}

struct Entry {
    // `None` when the delay is past the end of representable time: such a
    // timer never fires but can still be cancelled.
    deadline: Option<Instant>,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct TimerQueue {
    entries: SlotMap<TimerKey, Entry>,
    next_seq: u64,
    stats: TimerStats,
}

/// Cooperative single-threaded timer host.
///
/// Nothing fires on its own: the owner calls [`Timers::run_due`] from its
/// loop, or [`Timers::advance`] when running on a [`ManualClock`].
pub struct Timers {
    clock: Box<dyn Clock>,
    manual: Option<ManualClock>,
    queue: RefCell<TimerQueue>,
}

impl Timers {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock) -> Self {
        Self {
            clock: Box::new(clock),
            manual: None,
            queue: RefCell::new(TimerQueue::default()),
        }
    }

    /// Timers on a hand-driven clock, for tests and replays.
    pub fn manual() -> Self {
        Self::manual_from(Instant::now())
    }

    pub fn manual_from(start: Instant) -> Self {
        let clock = ManualClock::new(start);
        Self {
            clock: Box::new(clock.clone()),
            manual: Some(clock),
            queue: RefCell::new(TimerQueue::default()),
        }
    }

    pub fn manual_clock(&self) -> Option<&ManualClock> {
        self.manual.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().entries.len()
    }

    pub fn stats(&self) -> TimerStats {
        self.queue.borrow().stats
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue
            .borrow()
            .entries
            .values()
            .filter_map(|e| e.deadline)
            .min()
    }

    /// Runs one turn: every timer that is due now and was scheduled before
    /// the turn began, in deadline order. Timers scheduled by these callbacks
    /// wait for the next turn. Returns how many fired.
    pub fn run_due(&self) -> usize {
        let now = self.clock.now();
        let horizon = self.queue.borrow().next_seq;
        let mut fired = 0;
        while let Some(callback) = self.take_next_due(now, horizon) {
            callback();
            fired += 1;
        }
        if fired > 0 {
            log::trace!("timers: turn fired {fired}");
        }
        fired
    }

    /// Moves a manual clock forward by `by`, stopping at every deadline on the
    /// way so each callback sees `now()` equal to its own deadline.
    pub fn advance(&self, by: Duration) -> usize {
        let Some(clock) = self.manual.as_ref() else {
            log::warn!("timers: advance() needs a manual clock; running due timers instead");
            return self.run_due();
        };
        // an unrepresentable target runs every timer that has a deadline
        let target = clock.now().checked_add(by);
        let mut fired = 0;
        while let Some(deadline) = self
            .next_deadline()
            .filter(|d| target.is_none_or(|t| *d <= t))
        {
            clock.set(deadline);
            fired += self.run_due();
        }
        if let Some(target) = target {
            clock.set(target);
        }
        fired
    }

    pub fn advance_to(&self, t: Instant) -> usize {
        let now = self.clock.now();
        self.advance(t.saturating_duration_since(now))
    }

    fn take_next_due(&self, now: Instant, horizon: u64) -> Option<Box<dyn FnOnce()>> {
        let mut q = self.queue.borrow_mut();
        let key = q
            .entries
            .iter()
            .filter(|(_, e)| e.deadline.is_some_and(|d| d <= now) && e.seq < horizon)
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(k, _)| k)?;
        let entry = q.entries.remove(key)?;
        q.stats.fired += 1;
        Some(entry.callback)
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerHost for Timers {
    fn now(&self) -> Instant {
        self.clock.now()
    }

    fn schedule_after(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let deadline = self.clock.now().checked_add(delay);
        if deadline.is_none() {
            log::debug!("timers: {delay:?} is past the end of time; timer will never fire");
        }
        let mut q = self.queue.borrow_mut();
        let seq = q.next_seq;
        q.next_seq += 1;
        q.stats.scheduled += 1;
        let key = q.entries.insert(Entry {
            deadline,
            seq,
            callback,
        });
        log::trace!("timers: scheduled {key:?} in {delay:?}");
        TimerHandle(key)
    }

    fn cancel(&self, handle: TimerHandle) {
        // The callback is dropped outside the borrow: its captures may reach
        // back into this host.
        let removed = {
            let mut q = self.queue.borrow_mut();
            let removed = q.entries.remove(handle.0);
            if removed.is_some() {
                q.stats.cancelled += 1;
            }
            removed
        };
        if removed.is_some() {
            log::trace!("timers: cancelled {:?}", handle.0);
        }
        drop(removed);
    }

    fn is_scheduled(&self, handle: &TimerHandle) -> bool {
        self.queue.borrow().entries.contains_key(handle.0)
    }
}
