use chrono::{DateTime, Utc};
use std::fmt;
use tokio::time::Instant;

/// Source of wall-clock timestamps for status and log entries
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock that follows the tokio runtime's time source.
///
/// It records a wall-clock anchor at construction and advances it by the
/// elapsed runtime time. In a normal runtime this tracks real time; with a
/// paused test runtime timestamps move with `tokio::time::advance`, so uptimes
/// and log times agree with the virtual timers.
#[derive(Debug)]
pub struct RuntimeClock {
    wall_anchor: DateTime<Utc>,
    instant_anchor: Instant,
}

impl RuntimeClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Clock whose current time is `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            wall_anchor: start,
            instant_anchor: Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.instant_anchor);
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero());
        self.wall_anchor + elapsed
    }
}
