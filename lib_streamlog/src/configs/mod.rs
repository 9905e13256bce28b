//! # Configuration Modules
//!
//! Resolves the logging configuration once at process start from built-in
//! defaults, an optional JSON file and environment variables.

/// Provides the `LoggingConfig` structure and its loaders.
pub mod config_log;
