//! Logging initialization
//!
//! Console output in compact or JSON form, plus an optional log file written
//! through a non-blocking appender.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "POSE_FX_LOG";

/// Environment variable selecting the console format (`json` or `compact`)
pub const LOG_FORMAT_ENV: &str = "POSE_FX_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives used when neither environment variable is set
    pub level: String,
    pub console: bool,
    /// JSON console lines instead of compact text
    pub json: bool,
    /// Also log to this file (plain text, no ANSI)
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            json: false,
            file: None,
        }
    }
}

impl LogConfig {
    /// Filter from `POSE_FX_LOG`, then `RUST_LOG`, then `level`
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    fn use_json(&self) -> bool {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(format) => format.eq_ignore_ascii_case("json"),
            Err(_) => self.json,
        }
    }
}

/// Install the global subscriber.
///
/// Hold the returned guard until exit; dropping it flushes and closes the log
/// file.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let use_json = config.use_json();

    let mut guard = None;
    let file_layer = match &config.file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let (writer, file_guard) = tracing_appender::non_blocking(file);
            guard = Some(file_guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    let json_layer = (config.console && use_json).then(|| fmt::layer().json().with_thread_names(true));
    let compact_layer = (config.console && !use_json).then(|| fmt::layer().compact().with_target(false));

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(file_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init()?;

    tracing::info!(
        target: "pose_fx",
        version = env!("CARGO_PKG_VERSION"),
        json = use_json,
        file = ?config.file,
        "Logging ready"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LogConfig::default());
        assert!(config.console);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_partial_json() {
        let config: LogConfig = serde_json::from_str(r#"{"json": true, "level": "pose_fx=debug"}"#).unwrap();
        assert!(config.json);
        assert!(config.console);
        assert_eq!(config.level, "pose_fx=debug");
    }

    #[test]
    fn test_file_path_enables_file_logging() {
        let config: LogConfig = serde_json::from_str(r#"{"file": "run.log"}"#).unwrap();
        assert_eq!(config.file, Some(PathBuf::from("run.log")));
    }
}
