use std::fmt::Write;

use chrono::Local;

use super::buffer::MessageBuffer;

/// Default pattern for [`LocalClock`]: a human-readable time of day.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// # Time Source
///
/// Supplies the "current date/time" text placed in front of timestamped messages.
/// The returned string is treated as opaque.
pub trait TimeSource: Send + Sync {
    fn human_date(&self) -> String;
}

/// Local wall-clock time rendered with a `chrono` format pattern.
#[derive(Debug, Clone)]
pub struct LocalClock {
    format: String,
}

impl LocalClock {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

impl TimeSource for LocalClock {
    /// Falls back to [`DEFAULT_TIME_FORMAT`] when the configured pattern is invalid.
    fn human_date(&self) -> String {
        let now = Local::now();
        let mut text = String::new();
        if write!(text, "{}", now.format(&self.format)).is_err() {
            text.clear();
            let _ = write!(text, "{}", now.format(DEFAULT_TIME_FORMAT));
        }
        text
    }
}

/// A clock frozen on a fixed string. Handy when asserting on exact output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedClock(pub String);

impl TimeSource for FixedClock {
    fn human_date(&self) -> String {
        self.0.clone()
    }
}

/// Writes the `"[<time>] "` prefix into a freshly created buffer.
pub fn prime(buffer: &mut MessageBuffer, clock: &dyn TimeSource) {
    buffer.append('[').append(clock.human_date()).append("] ");
}
