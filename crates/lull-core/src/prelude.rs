pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::debounce::Debounced;
pub use crate::effects::{Dispose, effect};
pub use crate::error::TimingError;
pub use crate::interval::Interval;
pub use crate::scope::{Scope, current_scope};
pub use crate::signal::{Signal, SubId, signal};
pub use crate::spec::{DebounceSpec, IntervalSpec, ThrottleSpec, TrailingPolicy, TweenSpec};
pub use crate::throttle::Throttled;
pub use crate::timer::{SharedHost, TimerHandle, TimerHost, TimerStats, Timers};
pub use crate::tween::{Easing, Tween};
