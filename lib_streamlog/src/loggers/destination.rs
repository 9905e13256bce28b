use std::fmt::{self, Display};
use std::sync::Arc;

use log::Level;

use super::buffer::MessageBuffer;
use super::sinks::LogSink;

/// # Destination
///
/// The closed set of places a message can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The process console stream.
    Console,
    /// The tracker process.
    Tracker,
    /// The `log` facade at the given level.
    Leveled(Level),
}

impl Destination {
    /// Console and tracker messages carry the timestamp prefix; leveled records
    /// are stamped by whatever backend the host installed for `log`.
    pub fn is_timestamped(self) -> bool {
        matches!(self, Destination::Console | Destination::Tracker)
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Console => f.write_str("CONSOLE"),
            Destination::Tracker => f.write_str("TRACKER"),
            Destination::Leveled(level) => write!(f, "{}", level),
        }
    }
}

/// # Log Message
///
/// A short-lived logger bound to one destination. Values appended to it are
/// buffered, and the whole text is handed to the bound sink exactly once when
/// the value is dropped.
///
/// ```
/// use lib_streamlog::{Destination, Router, LoggingConfig};
///
/// let router = Router::new(LoggingConfig::default());
/// router.route(Destination::Console).append("value=").append(42);
/// ```
#[must_use = "the message is delivered when this value is dropped"]
pub struct LogMessage {
    destination: Destination,
    buffer: MessageBuffer,
    sink: Arc<dyn LogSink>,
}

impl LogMessage {
    pub(crate) fn open(destination: Destination, buffer: MessageBuffer, sink: Arc<dyn LogSink>) -> Self {
        Self {
            destination,
            buffer,
            sink,
        }
    }

    /// Where this message will be delivered.
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// The text accumulated so far, including any timestamp prefix.
    pub fn text(&self) -> &str {
        self.buffer.as_str()
    }

    /// Appends the textual form of `value` and returns the message for chaining.
    ///
    /// # Arguments
    /// * `value` - Anything implementing `Display`; rendered immediately.
    ///
    /// # Returns
    /// The same message, so calls can be chained in one statement.
    pub fn append<T: Display>(&mut self, value: T) -> &mut Self {
        self.buffer.append(value);
        self
    }

    /// Appends pre-formatted arguments, as produced by `format_args!`.
    pub fn append_args(&mut self, args: fmt::Arguments<'_>) -> &mut Self {
        self.buffer.append_args(args);
        self
    }

    /// Delivers the message now instead of at the end of the enclosing scope.
    pub fn flush(self) {}
}

impl fmt::Write for LogMessage {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.append(s);
        Ok(())
    }
}

impl fmt::Debug for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogMessage")
            .field("destination", &self.destination)
            .field("text", &self.buffer.as_str())
            .finish()
    }
}

impl Drop for LogMessage {
    fn drop(&mut self) {
        let text = std::mem::take(&mut self.buffer).into_string();
        self.sink.deliver(self.destination, &text);
    }
}
