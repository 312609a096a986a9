use chrono::{DateTime, Local};

/// Remaining time of the running session, recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Whole seconds left, rounded up. Zero or negative once the end time is reached.
    pub total: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn is_expired(&self) -> bool {
        self.total <= 0
    }
}

/// Time left between `now` and `end_time`.
///
/// Rounding up means `total <= 0` exactly when `now >= end_time`, so a session
/// is never reported as finished before its end time.
pub fn time_remaining(now: DateTime<Local>, end_time: DateTime<Local>) -> Countdown {
    let millis = (end_time - now).num_milliseconds();
    let total = if millis > 0 {
        (millis + 999) / 1000
    } else {
        millis / 1000
    };
    let left = total.max(0);

    Countdown {
        total,
        hours: (left / 3600) % 24,
        minutes: (left / 60) % 60,
        seconds: left % 60,
    }
}
