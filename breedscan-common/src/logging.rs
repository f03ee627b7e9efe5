//! Logging initialisation
//!
//! `RUST_LOG` takes precedence over the configured level.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Build the env filter for a configured level
///
/// Unknown levels fall back to `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(normalize_level(level)))
}

/// Lower-case a configured level, mapping unknown values to `info`
pub fn normalize_level(level: &str) -> &'static str {
    let lowered = level.trim().to_ascii_lowercase();
    VALID_LEVELS
        .iter()
        .find(|l| **l == lowered)
        .copied()
        .unwrap_or("info")
}

/// Install the global tracing subscriber
///
/// Logs go to stderr unless a log file is configured. Fails if a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .map_err(|e| Error::Internal(format!("Logging init failed: {}", e)))
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| Error::Internal(format!("Logging init failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level_known() {
        assert_eq!(normalize_level("DEBUG"), "debug");
        assert_eq!(normalize_level(" warn "), "warn");
    }

    #[test]
    fn test_normalize_level_unknown_falls_back_to_info() {
        assert_eq!(normalize_level("verbose"), "info");
        assert_eq!(normalize_level(""), "info");
    }
}
