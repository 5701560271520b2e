//! # Timers, Debounce, and Throttle
//!
//! lull turns bursts of input (keystrokes, scroll and resize events, sensor
//! samples) into rate-limited outputs, on a single thread, driven by whatever
//! event loop already owns the UI.
//!
//! - [`Debounced<T>`]: an output that only moves after the input has been
//!   quiet for a while.
//! - [`Throttled<A>`]: an action that runs at most once per window, on the
//!   leading edge, with an optional trailing call.
//! - [`Interval`] and [`Tween`]: repeating ticks and eased animation built
//!   on the same timer plumbing.
//!
//! ## Hosts
//!
//! Nothing here owns a thread or an OS timer. Schedulers are handed an
//! `Rc<dyn TimerHost>` and keep at most one [`TimerHandle`] from it at a time.
//! [`Timers`] is a cooperative host: the loop calls [`Timers::run_due`] and
//! sleeps until [`Timers::next_deadline`]. On a manual clock, tests step time
//! with [`Timers::advance`]:
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use lull_core::*;
//!
//! let timers = Rc::new(Timers::manual());
//! let hits = Rc::new(RefCell::new(Vec::new()));
//!
//! let on_scroll = Throttled::new(timers.clone(), ThrottleSpec::scroll(), {
//!     let hits = hits.clone();
//!     move |y: u32| hits.borrow_mut().push(y)
//! });
//!
//! for y in [0, 10, 20, 30] {
//!     on_scroll.request(y);
//!     timers.advance(Duration::from_millis(10));
//! }
//! timers.advance(Duration::from_millis(100));
//!
//! assert_eq!(*hits.borrow(), vec![0, 30]);
//! ```
//!
//! ## Teardown
//!
//! Every scheduler cancels its pending timer when torn down: explicitly with
//! `teardown()`, by dropping it, or by disposing the [`Scope`] it was created
//! in. Teardown is idempotent, and calls made afterwards are ignored.
//!
//! ```rust
//! use std::rc::Rc;
//! use lull_core::*;
//!
//! let timers = Rc::new(Timers::manual());
//! let scope = Scope::new();
//! let search = scope.run(|| Debounced::new(timers.clone(), 0u32, DebounceSpec::search()));
//!
//! search.observe(7);
//! assert_eq!(timers.pending(), 1);
//!
//! scope.dispose();
//! assert_eq!(timers.pending(), 0);
//! assert!(search.is_torn_down());
//! ```

pub mod clock;
pub mod debounce;
pub mod effects;
pub mod error;
pub mod interval;
pub mod prelude;
pub mod scope;
pub mod signal;
mod slot;
pub mod spec;
pub mod throttle;
pub mod timer;
pub mod tween;

pub use clock::*;
pub use debounce::*;
pub use effects::*;
pub use error::TimingError;
pub use interval::*;
pub use scope::*;
pub use signal::*;
pub use spec::*;
pub use throttle::*;
pub use timer::*;
pub use tween::*;
