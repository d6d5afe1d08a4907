use std::{fmt, time::Duration};

/// Time left before the next allowed action, split for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Remaining {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Remaining {
    pub fn from_secs(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

/// Seconds elapsed since `last`, never negative even if the clock went back.
fn elapsed(now: i64, last: i64) -> u64 {
    now.saturating_sub(last).max(0) as u64
}

/// A draw is allowed iff `now - last_draw_time >= window`.
pub fn can_draw(now: i64, last_draw_time: i64, window: Duration) -> bool {
    elapsed(now, last_draw_time) >= window.as_secs()
}

/// Gate an action on the time since `last` (unix seconds). `None` means the
/// user never did it. On refusal returns the exact time still to wait.
pub fn check_cooldown(now: i64, last: Option<i64>, window: Duration) -> Result<(), Remaining> {
    let Some(last) = last else {
        return Ok(());
    };
    if can_draw(now, last, window) {
        return Ok(());
    }
    let left = window.as_secs() - elapsed(now, last);
    Err(Remaining::from_secs(left))
}
