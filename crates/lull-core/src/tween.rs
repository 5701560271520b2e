//! Time-based value animation sampled by an [`Interval`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use web_time::Instant;

use crate::effects::Dispose;
use crate::error::{Result, TimingError};
use crate::interval::Interval;
use crate::scope::ScopeLink;
use crate::signal::Signal;
use crate::spec::{IntervalSpec, TweenSpec};
use crate::timer::SharedHost;

/// Cubic easing curves over `t` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
        }
    }
}

struct TweenState {
    host: SharedHost,
    spec: TweenSpec,
    from: f32,
    to: f32,
    started_at: Instant,
    progress: f32,
    frames: Option<Interval>,
    finished: bool,
    torn_down: bool,
    scope: Option<ScopeLink>,
}

/// Drives a `Signal<f32>` from one value to another over `spec.duration`.
///
/// The last sample is exactly the target; after it the tween stops sampling
/// on its own.
pub struct Tween {
    state: Rc<RefCell<TweenState>>,
    value: Signal<f32>,
}

impl Tween {
    pub fn start(host: SharedHost, spec: TweenSpec, from: f32, to: f32) -> Result<Self> {
        if spec.frame.is_zero() {
            return Err(TimingError::ZeroPeriod { field: "frame" });
        }

        let started_at = host.now();
        let state = Rc::new(RefCell::new(TweenState {
            host,
            spec,
            from,
            to,
            started_at,
            progress: 0.0,
            frames: None,
            finished: false,
            torn_down: false,
            scope: None,
        }));
        let value = Signal::new(from);

        let weak = Rc::downgrade(&state);
        state.borrow_mut().scope = ScopeLink::register(move || {
            if let Some(state) = weak.upgrade() {
                teardown(&state);
            }
        });

        begin(&state, &value)?;
        log::debug!("tween: {from} -> {to} over {:?}", spec.duration);
        Ok(Self { state, value })
    }

    pub fn value(&self) -> Signal<f32> {
        self.value.clone()
    }

    pub fn get(&self) -> f32 {
        self.value.get()
    }

    pub fn target(&self) -> f32 {
        self.state.borrow().to
    }

    /// Fraction of the duration covered by the last sample.
    pub fn progress(&self) -> f32 {
        self.state.borrow().progress
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// Heads for `to`, starting over from the current value.
    pub fn retarget(&self, to: f32) -> Result<()> {
        let idle = {
            let mut s = self.state.borrow_mut();
            if s.torn_down {
                log::trace!("tween: retarget after teardown ignored");
                return Ok(());
            }
            s.from = self.value.get();
            s.to = to;
            s.started_at = s.host.now();
            s.progress = 0.0;
            s.finished = false;
            s.frames.is_none()
        };
        if idle {
            begin(&self.state, &self.value)?;
        }
        Ok(())
    }

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

fn begin(state: &Rc<RefCell<TweenState>>, value: &Signal<f32>) -> Result<()> {
    let (host, spec, to) = {
        let s = state.borrow();
        (s.host.clone(), s.spec, s.to)
    };

    if spec.duration.is_zero() {
        {
            let mut s = state.borrow_mut();
            s.progress = 1.0;
            s.finished = true;
        }
        value.set(to);
        return Ok(());
    }

    let weak = Rc::downgrade(state);
    let value = value.clone();
    let frames = Interval::new(host, IntervalSpec::new(spec.frame), move |_| {
        sample(&weak, &value)
    })?;
    state.borrow_mut().frames = Some(frames);
    Ok(())
}

fn sample(state: &Weak<RefCell<TweenState>>, value: &Signal<f32>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let (v, spent) = {
        let mut s = state.borrow_mut();
        if s.finished || s.torn_down {
            return;
        }
        let elapsed = s.host.now().saturating_duration_since(s.started_at);
        let t = (elapsed.as_secs_f32() / s.spec.duration.as_secs_f32()).min(1.0);
        s.progress = t;
        if t >= 1.0 {
            s.finished = true;
            (s.to, s.frames.take())
        } else {
            let eased = s.spec.easing.apply(t);
            (s.from + (s.to - s.from) * eased, None)
        }
    };
    // dropping the interval stops sampling
    drop(spent);
    value.set(v);
}

fn teardown(state: &Rc<RefCell<TweenState>>) {
    let frames = {
        let mut s = state.borrow_mut();
        if s.torn_down {
            return;
        }
        s.torn_down = true;
        s.scope = None;
        s.frames.take()
    };
    drop(frames);
    log::debug!("tween: torn down");
}

impl Drop for Tween {
    fn drop(&mut self) {
        teardown(&self.state);
    }
}
