use web_time::{Duration, Instant};

use crate::timer::{SharedHost, TimerHandle};

/// The single timer a scheduler may have outstanding.
///
/// Every `arm` and `disarm` bumps the epoch. A callback only acts if it
/// presents the epoch it was armed with.
pub(crate) struct TimerSlot {
    host: SharedHost,
    handle: Option<TimerHandle>,
    epoch: u64,
}

impl TimerSlot {
    pub(crate) fn new(host: SharedHost) -> Self {
        Self {
            host,
            handle: None,
            epoch: 0,
        }
    }

    pub(crate) fn now(&self) -> Instant {
        self.host.now()
    }

    /// Whether a timer is outstanding and the host still holds it.
    pub(crate) fn is_armed(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| self.host.is_scheduled(h))
    }

    /// Cancels whatever is pending and schedules `fire(epoch)` after `delay`.
    pub(crate) fn arm(&mut self, delay: Duration, fire: impl FnOnce(u64) + 'static) {
        self.disarm();
        let epoch = self.epoch;
        let handle = self
            .host
            .schedule_after(delay, Box::new(move || fire(epoch)));
        self.handle = Some(handle);
    }

    /// Cancels the pending timer. Returns whether one was pending.
    pub(crate) fn disarm(&mut self) -> bool {
        self.epoch = self.epoch.wrapping_add(1);
        match self.handle.take() {
            Some(handle) => {
                self.host.cancel(handle);
                true
            }
            None => false,
        }
    }

    /// Called from a timer callback. Consumes the handle if `epoch` is
    /// current and reports whether the callback should act.
    pub(crate) fn fired(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.handle.is_none() {
            return false;
        }
        // spent; the host already dropped its entry
        self.handle = None;
        true
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.disarm();
    }
}
