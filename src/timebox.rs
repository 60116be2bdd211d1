//! Time-threshold policy for a recording session.
//!
//! Pure functions of elapsed seconds. The controller re-derives the warning
//! on every tick; nothing here keeps history.

use std::fmt;

/// Hard cutoff in seconds (6 minutes)
pub const LIMIT: u32 = 360;

/// Elapsed seconds at which the one-minute warning is shown
pub const WARN_AT: u32 = 300;

/// Length of the final count-down window before `LIMIT`
pub const FINAL_WINDOW: u32 = 15;

pub const ONE_MINUTE_WARNING: &str = "You have 1 minute left. Please wrap up your story.";

/// Warning left in place once the session was cut off at `LIMIT`
pub const TIME_UP_MESSAGE: &str = "Time is up. You’ve reached the 6-minute limit.";

/// Timer value shown next to the recording indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDisplay {
    /// `mm:ss` elapsed
    Clock { minutes: u32, seconds: u32 },
    /// Bare seconds remaining inside the final window
    Countdown(u32),
}

impl fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerDisplay::Clock { minutes, seconds } => write!(f, "{}:{:02}", minutes, seconds),
            TimerDisplay::Countdown(remaining) => write!(f, "{}", remaining),
        }
    }
}

fn in_final_window(t: u32) -> bool {
    (LIMIT - FINAL_WINDOW..LIMIT).contains(&t)
}

pub fn display(t: u32) -> TimerDisplay {
    if in_final_window(t) {
        return TimerDisplay::Countdown(LIMIT - t);
    }
    TimerDisplay::Clock {
        minutes: t / 60,
        seconds: t % 60,
    }
}

/// Warning for the current tick, `None` when nothing should be shown
pub fn message(t: u32) -> Option<String> {
    if t == WARN_AT {
        Some(ONE_MINUTE_WARNING.to_string())
    } else if in_final_window(t) {
        Some(format!("Only {} seconds remaining!", LIMIT - t))
    } else {
        None
    }
}

pub fn must_stop(t: u32) -> bool {
    t >= LIMIT
}
