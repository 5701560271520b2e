//! Browser timer host backed by `setTimeout`.
//!
//! The browser owns the loop here: callbacks run as macrotasks, so there is
//! nothing to pump. Each pending timer keeps its JS closure alive in a slot
//! until it fires or is cancelled.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use anyhow::anyhow;
use lull_core::{TimerHandle, TimerHost, TimerKey};
use slotmap::SlotMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Window;
use web_time::{Duration, Instant};

type JsCallback = Closure<dyn FnMut()>;

enum Slot {
    Reserved,
    Armed {
        id: i32,
        deadline: Instant,
        closure: JsCallback,
    },
    // deadline past the end of representable time
    Parked,
    // fired; freed on a later schedule or cancel, never while it runs
    Spent(JsCallback),
}

struct Inner {
    window: Window,
    slots: SlotMap<TimerKey, Slot>,
    running: Option<TimerKey>,
}

impl Inner {
    fn sweep(&mut self) -> Vec<Slot> {
        let running = self.running;
        let spent: Vec<TimerKey> = self
            .slots
            .iter()
            .filter(|(k, s)| matches!(s, Slot::Spent(_)) && Some(*k) != running)
            .map(|(k, _)| k)
            .collect();
        spent
            .into_iter()
            .filter_map(|k| self.slots.remove(k))
            .collect()
    }
}

/// `setTimeout` takes a signed 32-bit millisecond delay; longer waits are
/// chained.
fn set_timeout(window: &Window, closure: &JsCallback, delay: Duration) -> Result<i32, JsValue> {
    let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    window.set_timeout_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), ms)
}

pub struct WebTimers {
    inner: Rc<RefCell<Inner>>,
}

/// Routes panics to the console and `log` to `console.*`.
pub fn init_logging(level: log::Level) {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    let _ = console_log::init_with_level(level);
}

impl WebTimers {
    pub fn new() -> anyhow::Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no global `window`"))?;
        Ok(Self {
            inner: Rc::new(RefCell::new(Inner {
                window,
                slots: SlotMap::with_key(),
                running: None,
            })),
        })
    }

    /// Timers armed in the browser and not yet fired.
    pub fn pending(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .values()
            .filter(|s| matches!(s, Slot::Armed { .. } | Slot::Parked))
            .count()
    }
}

fn fire(inner: &Weak<RefCell<Inner>>, key: TimerKey, callback: &mut Option<Box<dyn FnOnce()>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    {
        let mut guard = inner.borrow_mut();
        let i = &mut *guard;
        let Some(slot) = i.slots.get_mut(key) else {
            return;
        };
        let Slot::Armed {
            id,
            deadline,
            closure,
        } = slot
        else {
            return;
        };

        let now = Instant::now();
        if now < *deadline {
            match set_timeout(&i.window, closure, *deadline - now) {
                Ok(next) => {
                    *id = next;
                    return;
                }
                Err(e) => {
                    log::error!("web timers: re-arming {key:?} failed: {e:?}");
                    if let Slot::Armed { closure, .. } = std::mem::replace(slot, Slot::Reserved) {
                        *slot = Slot::Spent(closure);
                    }
                    drop(guard);
                    drop(callback.take());
                    return;
                }
            }
        }

        if let Slot::Armed { closure, .. } = std::mem::replace(slot, Slot::Reserved) {
            *slot = Slot::Spent(closure);
        }
        i.running = Some(key);
    }

    if let Some(cb) = callback.take() {
        cb();
    }

    let mut i = inner.borrow_mut();
    i.running = None;
    if Rc::strong_count(&inner) == 1 {
        // The host went away during the callback; this closure is still on
        // the stack and must outlive the slot map.
        if let Some(Slot::Spent(closure)) = i.slots.remove(key) {
            closure.forget();
        }
    }
}

impl TimerHost for WebTimers {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_after(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let now = Instant::now();
        let (key, swept) = {
            let mut i = self.inner.borrow_mut();
            let swept = i.sweep();
            (i.slots.insert(Slot::Reserved), swept)
        };
        drop(swept);

        let Some(deadline) = now.checked_add(delay) else {
            log::debug!("web timers: {delay:?} is past the end of time; {key:?} will never fire");
            if let Some(slot) = self.inner.borrow_mut().slots.get_mut(key) {
                *slot = Slot::Parked;
            }
            drop(callback);
            return TimerHandle::from_key(key);
        };

        let weak = Rc::downgrade(&self.inner);
        let mut callback = Some(callback);
        let closure: JsCallback = Closure::new(move || fire(&weak, key, &mut callback));

        let armed = set_timeout(&self.inner.borrow().window, &closure, delay);
        match armed {
            Ok(id) => {
                if let Some(slot) = self.inner.borrow_mut().slots.get_mut(key) {
                    *slot = Slot::Armed {
                        id,
                        deadline,
                        closure,
                    };
                }
                log::trace!("web timers: scheduled {key:?} in {delay:?}");
            }
            Err(e) => {
                // the slot is gone, so `is_scheduled` reports the loss
                log::error!("web timers: setTimeout failed for {key:?}: {e:?}");
                let removed = self.inner.borrow_mut().slots.remove(key);
                drop(removed);
                drop(closure);
            }
        }
        TimerHandle::from_key(key)
    }

    fn cancel(&self, handle: TimerHandle) {
        let key = handle.key();
        let (removed, swept) = {
            let mut i = self.inner.borrow_mut();
            let removed = match i.slots.get(key) {
                Some(Slot::Armed { .. } | Slot::Parked | Slot::Reserved) => i.slots.remove(key),
                _ => None,
            };
            if let Some(Slot::Armed { id, .. }) = &removed {
                i.window.clear_timeout_with_handle(*id);
            }
            (removed, i.sweep())
        };
        if removed.is_some() {
            log::trace!("web timers: cancelled {key:?}");
        }
        drop(removed);
        drop(swept);
    }

    fn is_scheduled(&self, handle: &TimerHandle) -> bool {
        matches!(
            self.inner.borrow().slots.get(handle.key()),
            Some(Slot::Armed { .. } | Slot::Parked)
        )
    }
}

impl Drop for WebTimers {
    fn drop(&mut self) {
        let i = self.inner.borrow();
        for slot in i.slots.values() {
            if let Slot::Armed { id, .. } = slot {
                i.window.clear_timeout_with_handle(*id);
            }
        }
    }
}
