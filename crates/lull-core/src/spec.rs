//! Scheduler configuration.
//!
//! Durations are `Duration` and cannot be negative; the `from_millis`
//! constructors exist for configuration coming from signed sources (settings
//! files, JS interop) and reject negatives instead of clamping them.

use web_time::Duration;

use crate::error::{Result, TimingError};
use crate::tween::Easing;

pub fn delay_from_millis(field: &'static str, millis: i64) -> Result<Duration> {
    u64::try_from(millis)
        .map(Duration::from_millis)
        .map_err(|_| TimingError::NegativeDelay { field, millis })
}

fn period_from_millis(field: &'static str, millis: i64) -> Result<Duration> {
    let d = delay_from_millis(field, millis)?;
    if d.is_zero() {
        return Err(TimingError::ZeroPeriod { field });
    }
    Ok(d)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DebounceSpec {
    #[cfg_attr(feature = "serde", serde(rename = "delay_ms", with = "delay_ms"))]
    pub delay: Duration,
}

impl Default for DebounceSpec {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(250),
        }
    }
}

impl DebounceSpec {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: i64) -> Result<Self> {
        Ok(Self::new(delay_from_millis("delay", millis)?))
    }

    /// Search-as-you-type.
    pub fn search() -> Self {
        Self::new(Duration::from_millis(300))
    }

    /// Field validation and autosave.
    pub fn input() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

/// What a throttle does with requests that land inside an open window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrailingPolicy {
    /// Keep the latest request and run it once at the window boundary.
    #[default]
    Coalesce,
    /// Discard it.
    Drop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ThrottleSpec {
    #[cfg_attr(feature = "serde", serde(rename = "interval_ms", with = "interval_ms"))]
    pub interval: Duration,
    pub trailing: TrailingPolicy,
}

impl Default for ThrottleSpec {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            trailing: TrailingPolicy::Coalesce,
        }
    }
}

impl ThrottleSpec {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn from_millis(millis: i64) -> Result<Self> {
        Ok(Self::new(delay_from_millis("interval", millis)?))
    }

    pub fn scroll() -> Self {
        Self::new(Duration::from_millis(100))
    }

    pub fn resize() -> Self {
        Self::new(Duration::from_millis(200))
    }

    pub fn leading_only(mut self) -> Self {
        self.trailing = TrailingPolicy::Drop;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IntervalSpec {
    #[cfg_attr(feature = "serde", serde(rename = "period_ms", with = "period_ms"))]
    pub period: Duration,
    /// Fire the first tick on the next turn instead of one period in.
    pub immediate: bool,
}

impl Default for IntervalSpec {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            immediate: false,
        }
    }
}

impl IntervalSpec {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            immediate: false,
        }
    }

    pub fn from_millis(millis: i64) -> Result<Self> {
        Ok(Self::new(period_from_millis("period", millis)?))
    }

    pub fn poll() -> Self {
        Self {
            period: Duration::from_secs(5),
            immediate: true,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TweenSpec {
    #[cfg_attr(feature = "serde", serde(rename = "duration_ms", with = "duration_ms"))]
    pub duration: Duration,
    pub easing: Easing,
    /// Sampling interval.
    #[cfg_attr(feature = "serde", serde(rename = "frame_ms", with = "frame_ms"))]
    pub frame: Duration,
}

impl Default for TweenSpec {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(300),
            easing: Easing::EaseInOut,
            frame: Duration::from_millis(16),
        }
    }
}

impl TweenSpec {
    pub fn new(duration: Duration, easing: Easing) -> Self {
        Self {
            duration,
            easing,
            ..Self::default()
        }
    }

    pub fn from_millis(millis: i64, easing: Easing) -> Result<Self> {
        Ok(Self::new(delay_from_millis("duration", millis)?, easing))
    }

    pub fn fast() -> Self {
        Self::new(Duration::from_millis(150), Easing::EaseOut)
    }

    pub fn slow() -> Self {
        Self::new(Duration::from_millis(600), Easing::EaseInOut)
    }

    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame;
        self
    }
}

/// One serde `with` module per duration field, so validation errors name
/// the field that failed.
#[cfg(feature = "serde")]
macro_rules! millis_field {
    ($module:ident, $field:literal, $parse:path) => {
        mod $module {
            use serde::de::Error as _;
            use serde::{Deserialize, Deserializer, Serializer};
            use web_time::Duration;

            pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
                let millis = i64::deserialize(d)?;
                $parse($field, millis).map_err(D::Error::custom)
            }
        }
    };
}

#[cfg(feature = "serde")]
millis_field!(delay_ms, "delay", super::delay_from_millis);
#[cfg(feature = "serde")]
millis_field!(interval_ms, "interval", super::delay_from_millis);
#[cfg(feature = "serde")]
millis_field!(period_ms, "period", super::period_from_millis);
#[cfg(feature = "serde")]
millis_field!(duration_ms, "duration", super::delay_from_millis);
#[cfg(feature = "serde")]
millis_field!(frame_ms, "frame", super::period_from_millis);
