use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::destination::Destination;

/// Line terminator appended by the console sink.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
/// Line terminator appended by the console sink.
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// # Log Sink
///
/// Receives a completed message. Implementations own delivery: they serialize
/// their own writes and decide what a failed delivery means.
pub trait LogSink: Send + Sync {
    fn deliver(&self, destination: Destination, message: &str);
}

/// # Diagnostic Sink
///
/// Receives raw text from the `ods_log!` channel, with any terminator already
/// applied.
pub trait DiagnosticSink: Send + Sync {
    fn write_raw(&self, text: &str);
}

/// Which process stream the console sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
}

impl FromStr for ConsoleStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(ConsoleStream::Stdout),
            "stderr" => Ok(ConsoleStream::Stderr),
            other => Err(format!("expected stdout or stderr, got {:?}", other)),
        }
    }
}

/// Writes `message` and the line terminator with a single `write_all`, so
/// concurrent writers on a locked stream never split a line.
pub(crate) fn write_line<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    let mut line = String::with_capacity(message.len() + LINE_ENDING.len());
    line.push_str(message);
    line.push_str(LINE_ENDING);
    out.write_all(line.as_bytes())?;
    out.flush()
}

/// Console destination: one line per message on stdout or stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    stream: ConsoleStream,
}

impl ConsoleSink {
    pub fn new(stream: ConsoleStream) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> ConsoleStream {
        self.stream
    }
}

impl LogSink for ConsoleSink {
    fn deliver(&self, _destination: Destination, message: &str) {
        // A console that cannot be written to has nowhere to report the failure.
        let _ = match self.stream {
            ConsoleStream::Stdout => write_line(&mut io::stdout().lock(), message),
            ConsoleStream::Stderr => write_line(&mut io::stderr().lock(), message),
        };
    }
}

/// Forwards leveled messages to the `log` facade.
///
/// A router only binds the leveled destinations here. A console or tracker
/// message that still arrives (a host wiring its own router) is logged as a
/// warning that names the destination it was meant for.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeveledSink;

impl LeveledSink {
    /// Level a message for `destination` is logged at.
    ///
    /// # Returns
    /// `None` for `CONSOLE` and `TRACKER`, which have no level of their own.
    pub fn level_of(destination: Destination) -> Option<log::Level> {
        match destination {
            Destination::Leveled(level) => Some(level),
            Destination::Console | Destination::Tracker => None,
        }
    }
}

impl LogSink for LeveledSink {
    fn deliver(&self, destination: Destination, message: &str) {
        match Self::level_of(destination) {
            Some(level) => log::log!(target: "streamlog", level, "{}", message),
            None => log::warn!(
                target: "streamlog",
                "{} message delivered to the leveled sink: {}",
                destination,
                message
            ),
        }
    }
}

/// Raw stderr writer behind `ods_log!` / `ods_lognlf!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl DiagnosticSink for StderrDiagnostics {
    fn write_raw(&self, text: &str) {
        let mut err = io::stderr().lock();
        let _ = err.write_all(text.as_bytes()).and_then(|_| err.flush());
    }
}

/// A message captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub destination: Destination,
    pub message: String,
}

/// # Memory Sink
///
/// Records everything it receives. Used to observe routing in tests and by
/// hosts that want to inspect output instead of printing it.
#[derive(Debug, Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<Delivery>>,
    raw: Mutex<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.deliveries).clone()
    }

    /// Message texts only, in delivery order.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.deliveries)
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    /// Everything written through [`DiagnosticSink::write_raw`].
    pub fn raw(&self) -> String {
        lock(&self.raw).clone()
    }

    /// Drains the recorded deliveries.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *lock(&self.deliveries))
    }
}

impl LogSink for MemorySink {
    fn deliver(&self, destination: Destination, message: &str) {
        lock(&self.deliveries).push(Delivery {
            destination,
            message: message.to_string(),
        });
    }
}

impl DiagnosticSink for MemorySink {
    fn write_raw(&self, text: &str) {
        lock(&self.raw).push_str(text);
    }
}
