use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loggers::sinks::ConsoleStream;
use crate::loggers::timestamp::DEFAULT_TIME_FORMAT;
use crate::loggers::tracker::DEFAULT_TRACKER_TIMEOUT;

/// Environment variable naming an optional JSON configuration file.
pub const ENV_CONFIG_FILE: &str = "STREAMLOG_CONFIG";
/// Overrides `with_time` (`true`/`false`, `1`/`0`).
pub const ENV_WITH_TIME: &str = "STREAMLOG_WITH_TIME";
/// Overrides `ods_log_enabled`.
pub const ENV_ODS_LOG: &str = "STREAMLOG_ODS_LOG";
/// chrono pattern for the timestamp prefix.
pub const ENV_TIME_FORMAT: &str = "STREAMLOG_TIME_FORMAT";
/// Console stream: `stdout` or `stderr`.
pub const ENV_CONSOLE: &str = "STREAMLOG_CONSOLE";
/// `host:port` of the tracker process; unset means local echo.
pub const ENV_TRACKER_URI: &str = "STREAMLOG_TRACKER_URI";
/// Tracker connect/write timeout in milliseconds.
pub const ENV_TRACKER_TIMEOUT_MS: &str = "STREAMLOG_TRACKER_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum LoggingConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// # Logging Config
///
/// Settings resolved once at process start. Missing fields in a config file
/// keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Prefix console and tracker messages with `"[<time>] "`.
    pub with_time: bool,
    /// Enable the `ods_log!` / `ods_lognlf!` diagnostic channel.
    pub ods_log_enabled: bool,
    /// `chrono` pattern used for the timestamp prefix.
    pub time_format: String,
    /// Stream used by the console destination.
    pub console_stream: ConsoleStream,
    /// `host:port` of the tracker process. Without it tracker messages are
    /// echoed locally on stdout.
    pub tracker_uri: Option<String>,
    /// Connect and write timeout for the tracker connection.
    pub tracker_timeout_ms: u64,
}

impl Default for LoggingConfig {
    /// Build-time defaults: the `with-time` and `ods-log` cargo features decide
    /// the two switches.
    fn default() -> Self {
        Self {
            with_time: cfg!(feature = "with-time"),
            ods_log_enabled: cfg!(feature = "ods-log"),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            console_stream: ConsoleStream::default(),
            tracker_uri: None,
            tracker_timeout_ms: DEFAULT_TRACKER_TIMEOUT.as_millis() as u64,
        }
    }
}

impl fmt::Display for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LoggingConfig
    With time: {},
    Diagnostics: {},
    Time format: {},
    Console stream: {:?},
    Tracker: {},
    Tracker timeout: {}ms
",
            self.with_time,
            self.ods_log_enabled,
            self.time_format,
            self.console_stream,
            self.tracker_uri.as_deref().unwrap_or("<local>"),
            self.tracker_timeout_ms
        )
    }
}

impl LoggingConfig {
    /// Defaults, then the file named by `STREAMLOG_CONFIG`, then the
    /// `STREAMLOG_*` environment variables.
    pub fn from_env() -> Result<Self, LoggingConfigError> {
        Self::resolve(|key| env::var(key).ok())
    }

    /// Same layering as [`LoggingConfig::from_env`] with an explicit variable lookup.
    pub fn resolve<F>(lookup: F) -> Result<Self, LoggingConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_file(path.trim())?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Reads a JSON file; fields it leaves out keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoggingConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoggingConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LoggingConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies every `STREAMLOG_*` variable that `lookup` returns.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), LoggingConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_WITH_TIME) {
            self.with_time = parse_bool(ENV_WITH_TIME, &value)?;
        }
        if let Some(value) = lookup(ENV_ODS_LOG) {
            self.ods_log_enabled = parse_bool(ENV_ODS_LOG, &value)?;
        }
        if let Some(value) = lookup(ENV_TIME_FORMAT) {
            self.time_format = value;
        }
        if let Some(value) = lookup(ENV_CONSOLE) {
            self.console_stream = value
                .parse()
                .map_err(|reason| invalid(ENV_CONSOLE, &value, reason))?;
        }
        if let Some(value) = lookup(ENV_TRACKER_URI) {
            let value = value.trim();
            self.tracker_uri = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
        }
        if let Some(value) = lookup(ENV_TRACKER_TIMEOUT_MS) {
            self.tracker_timeout_ms = value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    invalid(ENV_TRACKER_TIMEOUT_MS, &value, e.to_string())
                })?;
        }
        Ok(())
    }

    pub fn tracker_timeout(&self) -> Duration {
        Duration::from_millis(self.tracker_timeout_ms)
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> LoggingConfigError {
    LoggingConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, LoggingConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_follow_features() {
        let config = LoggingConfig::resolve(vars(&[])).unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.with_time, cfg!(feature = "with-time"));
        assert_eq!(config.ods_log_enabled, cfg!(feature = "ods-log"));
        assert_eq!(config.time_format, "%H:%M:%S");
        assert_eq!(config.console_stream, ConsoleStream::Stderr);
        assert_eq!(config.tracker_uri, None);
        assert_eq!(config.tracker_timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn test_env_overrides() {
        let config = LoggingConfig::resolve(vars(&[
            (ENV_WITH_TIME, "Yes"),
            (ENV_ODS_LOG, "on"),
            (ENV_TIME_FORMAT, "%Y-%m-%d %H:%M"),
            (ENV_CONSOLE, "stdout"),
            (ENV_TRACKER_URI, " 10.0.0.1:9091 "),
            (ENV_TRACKER_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert!(config.with_time);
        assert!(config.ods_log_enabled);
        assert_eq!(config.time_format, "%Y-%m-%d %H:%M");
        assert_eq!(config.console_stream, ConsoleStream::Stdout);
        assert_eq!(config.tracker_uri.as_deref(), Some("10.0.0.1:9091"));
        assert_eq!(config.tracker_timeout_ms, 250);
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let err = LoggingConfig::resolve(vars(&[(ENV_WITH_TIME, "sometimes")])).unwrap_err();
        match err {
            LoggingConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, ENV_WITH_TIME);
                assert_eq!(value, "sometimes");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_console_and_timeout_are_rejected() {
        assert!(LoggingConfig::resolve(vars(&[(ENV_CONSOLE, "printer")])).is_err());
        assert!(LoggingConfig::resolve(vars(&[(ENV_TRACKER_TIMEOUT_MS, "-1")])).is_err());
    }

    #[test]
    fn test_file_then_env_layering() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "withTime": true, "trackerUri": "tracker:9091", "consoleStream": "stdout" }}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = LoggingConfig::resolve(vars(&[
            (ENV_CONFIG_FILE, path.as_str()),
            (ENV_TRACKER_URI, ""),
        ]))
        .unwrap();

        assert!(config.with_time);
        assert_eq!(config.console_stream, ConsoleStream::Stdout);
        // An empty variable clears the tracker from the file.
        assert_eq!(config.tracker_uri, None);
        // Fields absent from the file keep their defaults.
        assert_eq!(config.time_format, DEFAULT_TIME_FORMAT);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let missing = LoggingConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, LoggingConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let malformed = LoggingConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(malformed, LoggingConfigError::Json { .. }));
    }

    #[test]
    fn test_display_mentions_local_tracker() {
        let text = LoggingConfig::default().to_string();
        assert!(text.contains("Tracker: <local>"));
    }
}
