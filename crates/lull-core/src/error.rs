use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    /// Delays are rejected, never clamped to zero.
    #[error("{field} must be non-negative, got {millis} ms")]
    NegativeDelay { field: &'static str, millis: i64 },

    #[error("{field} must be greater than zero")]
    ZeroPeriod { field: &'static str },
}

pub type Result<T> = std::result::Result<T, TimingError>;
