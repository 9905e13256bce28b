//! Call-site macros. Tokens are matched literally, so a misspelled
//! destination fails to compile instead of falling back somewhere at run time.

/// Maps a destination token to its [`Destination`](crate::Destination).
#[doc(hidden)]
#[macro_export]
macro_rules! __streamlog_destination {
    (CONSOLE) => {
        $crate::Destination::Console
    };
    (TRACKER) => {
        $crate::Destination::Tracker
    };
    (INFO) => {
        $crate::Destination::Leveled($crate::Level::Info)
    };
    (WARNING) => {
        $crate::Destination::Leveled($crate::Level::Warn)
    };
    (ERROR) => {
        $crate::Destination::Leveled($crate::Level::Error)
    };
    (DEBUG) => {
        $crate::Destination::Leveled($crate::Level::Debug)
    };
    ($other:ident) => {
        ::core::compile_error!(::core::concat!(
            "unknown log destination `",
            ::core::stringify!($other),
            "`; expected CONSOLE, TRACKER, INFO, WARNING, ERROR or DEBUG"
        ))
    };
}

/// Opens a message at a destination on the process-wide router.
///
/// `log_at!(TOKEN)` returns a [`LogMessage`](crate::LogMessage) that is
/// delivered when dropped; `log_at!(TOKEN, "fmt", args..)` formats and
/// delivers in one statement.
///
/// ```
/// use lib_streamlog::log_at;
///
/// log_at!(CONSOLE).append("value=").append(42);
/// log_at!(TRACKER, "round {} finished", 3);
/// log_at!(INFO, "handed to the log facade");
/// ```
///
/// Unknown tokens are rejected at build time:
///
/// ```compile_fail
/// lib_streamlog::log_at!(SYSLOG).append("nowhere");
/// ```
#[macro_export]
macro_rules! log_at {
    ($token:ident) => {
        $crate::router().route($crate::__streamlog_destination!($token))
    };
    ($token:ident, $($arg:tt)+) => {{
        let mut message = $crate::log_at!($token);
        message.append_args(::core::format_args!($($arg)+));
    }};
}

/// Diagnostic channel: writes the formatted text and a line terminator to
/// stderr when enabled. When disabled the arguments are not evaluated.
#[macro_export]
macro_rules! ods_log {
    ($($arg:tt)+) => {{
        let router = $crate::router();
        if router.diagnostics_enabled() {
            router.diagnostic(::core::format_args!($($arg)+), true);
        }
    }};
}

/// Like [`ods_log!`] without the trailing line terminator.
#[macro_export]
macro_rules! ods_lognlf {
    ($($arg:tt)+) => {{
        let router = $crate::router();
        if router.diagnostics_enabled() {
            router.diagnostic(::core::format_args!($($arg)+), false);
        }
    }};
}
