//! # lib_streamlog
//!
//! A small logging facade. Call sites pick a destination by token and stream
//! values into a short-lived message that is delivered, exactly once, when it
//! goes out of scope:
//!
//! ```
//! use lib_streamlog::log_at;
//!
//! log_at!(CONSOLE).append("value=").append(42);
//! ```
//!
//! `CONSOLE` writes a line on the console stream, `TRACKER` ships the message
//! to the tracker process, and `INFO`/`WARNING`/`ERROR`/`DEBUG` hand it to the
//! `log` facade. Timestamps and the `ods_log!` diagnostic channel are switched
//! through [`LoggingConfig`].

pub mod configs;
pub mod loggers;

// Re-export the public surface
pub use configs::config_log::{LoggingConfig, LoggingConfigError};
pub use loggers::buffer::MessageBuffer;
pub use loggers::destination::{Destination, LogMessage};
pub use loggers::router::{init, init_from_env, install, router, Router};
pub use loggers::sinks::{ConsoleSink, ConsoleStream, DiagnosticSink, LogSink, MemorySink};
pub use loggers::timestamp::{FixedClock, LocalClock, TimeSource};
pub use loggers::tracker::{LocalTracker, TcpTracker, TrackerError};

pub use log::Level;
