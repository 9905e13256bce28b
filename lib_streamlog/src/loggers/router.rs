use std::fmt;
use std::sync::{Arc, RwLock};

use static_init::dynamic;

use super::buffer::MessageBuffer;
use super::destination::{Destination, LogMessage};
use super::sinks::{ConsoleSink, DiagnosticSink, LeveledSink, LogSink, StderrDiagnostics};
use super::timestamp::{self, LocalClock, TimeSource};
use super::tracker::{LocalTracker, TcpTracker};
use crate::configs::config_log::{LoggingConfig, LoggingConfigError};

/// # Router
///
/// Binds every [`Destination`] to its sink and hands out one [`LogMessage`]
/// per log call. The bindings are fixed once the router is built.
pub struct Router {
    config: LoggingConfig,
    clock: Arc<dyn TimeSource>,
    console: Arc<dyn LogSink>,
    tracker: Arc<dyn LogSink>,
    leveled: Arc<dyn LogSink>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Router {
    /// Builds a router with the standard sinks for `config`: the console
    /// stream it names, a TCP tracker when `tracker_uri` is set (a local echo
    /// otherwise), and the `log` facade for leveled messages.
    pub fn new(config: LoggingConfig) -> Self {
        let tracker: Arc<dyn LogSink> = match &config.tracker_uri {
            Some(uri) => Arc::new(TcpTracker::new(uri.clone()).with_timeout(config.tracker_timeout())),
            None => Arc::new(LocalTracker),
        };
        Self {
            clock: Arc::new(LocalClock::new(config.time_format.clone())),
            console: Arc::new(ConsoleSink::new(config.console_stream)),
            tracker,
            leveled: Arc::new(LeveledSink),
            diagnostics: Arc::new(StderrDiagnostics),
            config,
        }
    }

    /// Router for the configuration found in the environment.
    pub fn from_env() -> Result<Self, LoggingConfigError> {
        Ok(Self::new(LoggingConfig::from_env()?))
    }

    /// Rebinds the `CONSOLE` destination.
    ///
    /// # Arguments
    /// * `sink` - Receives every console message opened on this router.
    pub fn with_console_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.console = sink;
        self
    }

    /// Rebinds the `TRACKER` destination.
    pub fn with_tracker_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.tracker = sink;
        self
    }

    /// Rebinds the leveled destinations (`INFO`, `WARNING`, `ERROR`, `DEBUG`).
    pub fn with_leveled_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.leveled = sink;
        self
    }

    /// Replaces the writer behind `ods_log!` / `ods_lognlf!`.
    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Replaces the clock used for the timestamp prefix.
    pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration this router was built from.
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Whether the `ods_log!` channel is switched on.
    pub fn diagnostics_enabled(&self) -> bool {
        self.config.ods_log_enabled
    }

    /// Opens a message for `destination`, primed with the timestamp prefix
    /// when enabled for it.
    pub fn route(&self, destination: Destination) -> LogMessage {
        let sink = match destination {
            Destination::Console => Arc::clone(&self.console),
            Destination::Tracker => Arc::clone(&self.tracker),
            Destination::Leveled(_) => Arc::clone(&self.leveled),
        };

        let mut buffer = MessageBuffer::new();
        if self.config.with_time && destination.is_timestamped() {
            timestamp::prime(&mut buffer, self.clock.as_ref());
        }
        LogMessage::open(destination, buffer, sink)
    }

    /// Shorthand for `route(Destination::Console)`.
    pub fn console(&self) -> LogMessage {
        self.route(Destination::Console)
    }

    /// Shorthand for `route(Destination::Tracker)`.
    pub fn tracker(&self) -> LogMessage {
        self.route(Destination::Tracker)
    }

    /// Writes straight to the diagnostic sink when the channel is enabled,
    /// optionally followed by a line terminator. Does nothing otherwise.
    pub fn diagnostic(&self, args: fmt::Arguments<'_>, line_feed: bool) {
        if !self.diagnostics_enabled() {
            return;
        }
        let mut text = fmt::format(args);
        if line_feed {
            text.push('\n');
        }
        self.diagnostics.write_raw(&text);
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(LoggingConfig::default())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Process-wide router used by the `log_at!` and `ods_log!` macros.
#[dynamic]
static GLOBAL_ROUTER: RwLock<Arc<Router>> = RwLock::new(Arc::new(Router::default()));

fn global() -> &'static RwLock<Arc<Router>> {
    &GLOBAL_ROUTER
}

/// The router currently installed for the process.
pub fn router() -> Arc<Router> {
    let guard = global().read().unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(&guard)
}

/// Replaces the process-wide router. Messages already opened keep the sink
/// they were created with.
pub fn install(router: Router) {
    let mut guard = global().write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Arc::new(router);
}

/// Installs a router built from `config`.
pub fn init(config: LoggingConfig) {
    install(Router::new(config));
}

/// Resolves the configuration from the environment and installs it.
pub fn init_from_env() -> Result<(), LoggingConfigError> {
    install(Router::from_env()?);
    Ok(())
}
