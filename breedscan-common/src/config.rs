//! Bootstrap configuration loading
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BREEDSCAN_CONFIG` environment variable
//! 3. User config file (`~/.config/breedscan/config.toml`)
//! 4. System config file (`/etc/breedscan/config.toml`)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file at the default locations is not an error: compiled
//! defaults are used. A file that was requested
//! explicitly (CLI or environment) must exist and parse.
//!
//! After loading, service URLs may be overridden individually by the
//! `BREEDSCAN_CLASSIFIER_URL`, `BREEDSCAN_KNOWLEDGE_URL` and
//! `BREEDSCAN_VISION_URL` environment variables.
//!
//! Loading happens before logging is initialised (the log level is part of
//! the configuration), so loading itself emits no log records. Call
//! [`log_config_summary`] once the subscriber is installed.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "BREEDSCAN_CONFIG";
/// Environment override for the classifier sub-service base URL
pub const ENV_CLASSIFIER_URL: &str = "BREEDSCAN_CLASSIFIER_URL";
/// Environment override for the knowledge store base URL
pub const ENV_KNOWLEDGE_URL: &str = "BREEDSCAN_KNOWLEDGE_URL";
/// Environment override for the vision-language service base URL
pub const ENV_VISION_URL: &str = "BREEDSCAN_VISION_URL";

const SYSTEM_CONFIG_PATH: &str = "/etc/breedscan/config.toml";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; absent sections fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Collaborator service endpoints
    pub services: ServicesConfig,
    /// Pipeline thresholds and behaviour
    pub pipeline: PipelineSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Base URLs and transport settings for the collaborator services
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Classifier sub-service (safety, species, breed)
    pub classifier_url: String,
    /// Knowledge retrieval store
    pub knowledge_url: String,
    /// Vision-language describer
    pub vision_url: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            classifier_url: "http://127.0.0.1:8101".to_string(),
            knowledge_url: "http://127.0.0.1:8102".to_string(),
            vision_url: "http://127.0.0.1:8103".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Pipeline settings as written in TOML
///
/// Fields left unset keep the pipeline's built-in defaults; validation
/// happens when the pipeline builds its runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Unsafe-content score at or above which an image is rejected
    pub safety_threshold: Option<f64>,
    /// Minimum species confidence (inclusive)
    pub species_confidence_floor: Option<f64>,
    /// Minimum breed confidence (inclusive)
    pub breed_confidence_floor: Option<f64>,
    /// Second-ranked probability above which a subject is a crossbreed
    pub crossbreed_second_threshold: Option<f64>,
    /// Top probability below which a close race indicates a crossbreed
    pub purebred_confidence_threshold: Option<f64>,
    /// Top/second gap below which a close race indicates a crossbreed
    pub crossbreed_gap_threshold: Option<f64>,
    /// Number of breed labels requested from the classifier
    pub breed_top_k: Option<usize>,
    /// Species the pipeline accepts
    pub supported_species: Option<Vec<String>>,
    /// Timeout applied to each classifier and knowledge call, in seconds
    pub stage_timeout_secs: Option<u64>,
    /// Timeout applied to image preparation and description, in seconds
    pub description_timeout_secs: Option<u64>,
    /// Issue safety and species checks concurrently
    pub concurrent_screening: Option<bool>,
    /// Passages requested per knowledge-store query
    pub knowledge_passages: Option<usize>,
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` argument
    CommandLine(PathBuf),
    /// `BREEDSCAN_CONFIG` environment variable
    Environment(PathBuf),
    /// Per-user config directory
    UserFile(PathBuf),
    /// System-wide config file
    SystemFile(PathBuf),
    /// No file found; compiled defaults
    Defaults,
}

impl ConfigSource {
    /// Path of the file backing this source, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::UserFile(p)
            | ConfigSource::SystemFile(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `BREEDSCAN_*_URL` environment overrides to the service endpoints
    pub fn apply_env_overrides(&mut self) {
        let overrides = [
            (ENV_CLASSIFIER_URL, &mut self.services.classifier_url),
            (ENV_KNOWLEDGE_URL, &mut self.services.knowledge_url),
            (ENV_VISION_URL, &mut self.services.vision_url),
        ];

        for (var, slot) in overrides {
            if let Some(value) = env_override(var) {
                *slot = value;
            }
        }
    }
}

/// Locate the configuration file to use
pub fn resolve_config_source(cli_arg: Option<&Path>) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return ConfigSource::CommandLine(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return ConfigSource::Environment(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = user_config_path() {
        if path.exists() {
            return ConfigSource::UserFile(path);
        }
    }

    // Priority 4: System-wide config
    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if cfg!(unix) && system.exists() {
        return ConfigSource::SystemFile(system);
    }

    ConfigSource::Defaults
}

/// Resolve, load and apply environment overrides
///
/// Explicitly requested files (CLI or environment) must exist.
pub fn load_config(cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let source = resolve_config_source(cli_arg);

    let mut config = match &source {
        ConfigSource::CommandLine(path) | ConfigSource::Environment(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            TomlConfig::from_file(path)?
        }
        ConfigSource::UserFile(path) | ConfigSource::SystemFile(path) => {
            TomlConfig::from_file(path)?
        }
        ConfigSource::Defaults => TomlConfig::default(),
    };

    config.apply_env_overrides();
    Ok((config, source))
}

/// Log where configuration came from and which environment overrides apply
pub fn log_config_summary(source: &ConfigSource) {
    match source.path() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No config file found, using compiled defaults"),
    }

    for var in [ENV_CLASSIFIER_URL, ENV_KNOWLEDGE_URL, ENV_VISION_URL] {
        if env_override(var).is_some() {
            info!(variable = var, "Service URL overridden from environment");
        }
    }
}

fn env_override(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Per-user config file path for the current platform
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("breedscan").join("config.toml"))
}
