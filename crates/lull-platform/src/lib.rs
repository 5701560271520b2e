//! Platform runners: a native cooperative event loop (and, on wasm32 with the
//! `web` feature, a `setTimeout` timer host).
//!
//! lull's schedulers are single-threaded. Input produced on other threads
//! (a file watcher, a socket reader, a terminal) reaches them through a
//! [`LoopProxy`], which queues events onto the loop thread.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use lull_core::{SharedHost, Timers};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use web_time::Instant;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub mod web;

/// The loop is gone; the event is handed back.
#[derive(Debug, Error)]
#[error("event loop closed")]
pub struct EventLoopClosed<E>(pub E);

struct Inbox<E> {
    events: VecDeque<E>,
    exit: bool,
    exit_when_idle: bool,
    closed: bool,
}

struct Shared<E> {
    inbox: Mutex<Inbox<E>>,
    wake: Condvar,
}

/// `Send` handle for feeding events into an [`EventLoop`] from any thread.
pub struct LoopProxy<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for LoopProxy<E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<E: Send + 'static> LoopProxy<E> {
    pub fn send(&self, event: E) -> Result<(), EventLoopClosed<E>> {
        let mut inbox = self.shared.inbox.lock();
        if inbox.closed {
            return Err(EventLoopClosed(event));
        }
        inbox.events.push_back(event);
        drop(inbox);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Stops the loop after the events already queued have been handled.
    /// Pending timers are abandoned.
    pub fn exit(&self) {
        self.shared.inbox.lock().exit = true;
        self.shared.wake.notify_one();
    }

    /// Stops the loop once the inbox is empty and no timer is pending, so
    /// trailing debounce and throttle calls still land.
    pub fn exit_when_idle(&self) {
        self.shared.inbox.lock().exit_when_idle = true;
        self.shared.wake.notify_one();
    }
}

/// Passed to the handler; lets it stop the loop from the loop thread.
#[derive(Default)]
pub struct LoopControl {
    exit: Cell<bool>,
}

impl LoopControl {
    pub fn exit(&self) {
        self.exit.set(true);
    }

    pub fn exiting(&self) -> bool {
        self.exit.get()
    }
}

/// Single-threaded loop owning a [`Timers`] host on the system clock.
///
/// Each iteration drains queued events into the handler, runs one turn of due
/// timers, and then sleeps until the next deadline or the next event.
pub struct EventLoop<E> {
    timers: Rc<Timers>,
    shared: Arc<Shared<E>>,
}

impl<E: Send + 'static> EventLoop<E> {
    pub fn new() -> Self {
        Self {
            timers: Rc::new(Timers::new()),
            shared: Arc::new(Shared {
                inbox: Mutex::new(Inbox {
                    events: VecDeque::new(),
                    exit: false,
                    exit_when_idle: false,
                    closed: false,
                }),
                wake: Condvar::new(),
            }),
        }
    }

    pub fn timers(&self) -> Rc<Timers> {
        self.timers.clone()
    }

    pub fn host(&self) -> SharedHost {
        self.timers.clone()
    }

    pub fn proxy(&self) -> LoopProxy<E> {
        LoopProxy {
            shared: self.shared.clone(),
        }
    }

    pub fn run(&self, mut handler: impl FnMut(E, &LoopControl)) -> anyhow::Result<()> {
        let control = LoopControl::default();
        log::debug!("event loop: running");

        loop {
            let (batch, exit) = {
                let mut inbox = self.shared.inbox.lock();
                (std::mem::take(&mut inbox.events), inbox.exit)
            };
            for event in batch {
                handler(event, &control);
            }
            if exit || control.exiting() {
                break;
            }

            self.timers.run_due();
            if control.exiting() {
                break;
            }

            let mut inbox = self.shared.inbox.lock();
            if !inbox.events.is_empty() || inbox.exit {
                continue;
            }
            match self.timers.next_deadline() {
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline > now {
                        self.shared.wake.wait_for(&mut inbox, deadline - now);
                    }
                }
                None if inbox.exit_when_idle => break,
                None => self.shared.wake.wait(&mut inbox),
            }
        }

        let mut inbox = self.shared.inbox.lock();
        inbox.closed = true;
        let dropped = inbox.events.len();
        inbox.events.clear();
        if dropped > 0 {
            log::warn!("event loop: exiting with {dropped} unhandled event(s)");
        }
        log::debug!(
            "event loop: stopped ({} timer(s) abandoned)",
            self.timers.pending()
        );
        Ok(())
    }
}

impl<E: Send + 'static> Default for EventLoop<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lull_core::{DebounceSpec, Debounced, ThrottleSpec, Throttled};
    use std::cell::RefCell;
    use std::thread;
    use web_time::Duration;

    #[derive(Debug)]
    enum Input {
        Key(char),
        Scroll(u32),
        Done,
    }

    #[test]
    fn test_events_from_another_thread_reach_debounce() {
        let el = EventLoop::<Input>::new();
        let query = Debounced::new(
            el.host(),
            String::new(),
            DebounceSpec::new(Duration::from_millis(50)),
        );
        let settled = Rc::new(RefCell::new(Vec::new()));
        query.on_change({
            let settled = settled.clone();
            move |q: &String| settled.borrow_mut().push(q.clone())
        });

        let proxy = el.proxy();
        let feeder = thread::spawn(move || {
            for c in "rust".chars() {
                proxy.send(Input::Key(c)).expect("loop alive");
                thread::sleep(Duration::from_millis(2));
            }
            proxy.send(Input::Done).expect("loop alive");
        });

        let mut typed = String::new();
        el.run(|event, _| match event {
            Input::Key(c) => {
                typed.push(c);
                query.observe(typed.clone());
            }
            Input::Done => el.proxy().exit_when_idle(),
            Input::Scroll(_) => {}
        })
        .expect("loop runs");
        feeder.join().expect("feeder");

        assert_eq!(*settled.borrow(), vec!["rust".to_string()]);
        assert_eq!(el.timers().pending(), 0);
    }

    #[test]
    fn test_throttle_on_system_clock_keeps_window() {
        let el = EventLoop::<Input>::new();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let window = ThrottleSpec::new(Duration::from_millis(40));
        let on_scroll = Throttled::new(el.host(), window, {
            let fired = fired.clone();
            move |y: u32| fired.borrow_mut().push((Instant::now(), y))
        });

        let proxy = el.proxy();
        let feeder = thread::spawn(move || {
            for y in 0..10 {
                proxy.send(Input::Scroll(y)).expect("loop alive");
                thread::sleep(Duration::from_millis(1));
            }
            proxy.send(Input::Done).expect("loop alive");
        });

        el.run(|event, _| match event {
            Input::Scroll(y) => on_scroll.request(y),
            Input::Done => el.proxy().exit_when_idle(),
            Input::Key(_) => {}
        })
        .expect("loop runs");
        feeder.join().expect("feeder");

        let fired = fired.borrow();
        assert_eq!(fired.first().map(|f| f.1), Some(0));
        assert_eq!(fired.last().map(|f| f.1), Some(9));
        // timestamps are taken inside the action, a little after the window opened
        for pair in fired.windows(2) {
            assert!(pair[1].0.duration_since(pair[0].0) >= Duration::from_millis(39));
        }
    }

    #[test]
    fn test_send_after_exit_is_rejected() {
        let el = EventLoop::<u32>::new();
        let proxy = el.proxy();
        proxy.send(1).expect("loop alive");
        proxy.exit();

        let mut seen = Vec::new();
        el.run(|n, _| seen.push(n)).expect("loop runs");

        assert_eq!(seen, vec![1]);
        assert!(matches!(proxy.send(2), Err(EventLoopClosed(2))));
    }

    #[test]
    fn test_handler_can_exit() {
        let el = EventLoop::<u32>::new();
        let proxy = el.proxy();
        for n in 0..3 {
            proxy.send(n).expect("loop alive");
        }

        let mut seen = Vec::new();
        el.run(|n, control| {
            seen.push(n);
            if n == 0 {
                control.exit();
            }
        })
        .expect("loop runs");

        // the batch already taken is finished before the loop stops
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
