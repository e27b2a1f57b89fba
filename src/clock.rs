//! Wall-clock time and the `HH:MM` display string.
//!
//! ## Rust concepts
//! - Traits as seams: the scheduler asks a `WallClock` for the time instead of
//!   reading the system clock directly, so tests can pin it.
//! - `format!` width/fill specifiers (`{:02}`) for zero padding

use chrono::{Local, Timelike};

/// Hour and minute of the local wall clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeOfDay {
    /// 0-23
    pub hour: u32,
    /// 0-59
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }
}

/// Source of the current time of day.
///
/// `Send` so the render thread can own a boxed clock.
pub trait WallClock: Send {
    fn now(&self) -> TimeOfDay;
}

/// Reads the host's local time via chrono.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> TimeOfDay {
        let now = Local::now();
        TimeOfDay::new(now.hour(), now.minute())
    }
}

/// A clock stuck at one time. Used by tests and the headless demo.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub TimeOfDay);

impl WallClock for FixedClock {
    fn now(&self) -> TimeOfDay {
        self.0
    }
}

/// Format a time of day as a 24-hour, zero-padded `HH:MM` string.
///
/// No locale, no seconds. Always 5 characters for valid input.
pub fn format_time(hour: u32, minute: u32) -> String {
    format!("{hour:02}:{minute:02}")
}

/// Convenience wrapper over [`format_time`].
pub fn format_time_of_day(time: TimeOfDay) -> String {
    format_time(time.hour, time.minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(9, 5, "09:05")]
    #[case(0, 0, "00:00")]
    #[case(23, 59, "23:59")]
    #[case(12, 30, "12:30")]
    #[case(7, 0, "07:00")]
    fn test_format_time(#[case] hour: u32, #[case] minute: u32, #[case] expected: &str) {
        assert_eq!(format_time(hour, minute), expected);
    }

    #[test]
    fn format_time_is_always_five_chars_hh_mm() {
        for hour in 0..24 {
            for minute in 0..60 {
                let text = format_time(hour, minute);
                let bytes = text.as_bytes();
                assert_eq!(text.len(), 5, "{text}");
                assert_eq!(bytes[2], b':');
                assert!(bytes[..2].iter().all(u8::is_ascii_digit));
                assert!(bytes[3..].iter().all(u8::is_ascii_digit));
                assert_eq!(text[..2].parse::<u32>().unwrap(), hour);
                assert_eq!(text[3..].parse::<u32>().unwrap(), minute);
            }
        }
    }

    #[test]
    fn fixed_clock_returns_its_time() {
        let clock = FixedClock(TimeOfDay::new(6, 45));
        assert_eq!(format_time_of_day(clock.now()), "06:45");
    }

    #[test]
    fn system_clock_is_in_range() {
        let now = SystemClock.now();
        assert!(now.hour < 24);
        assert!(now.minute < 60);
    }
}
