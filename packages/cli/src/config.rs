//! Optional TOML configuration file.
//!
//! ```toml
//! [pipeline]
//! window_minutes = 30
//! threshold = 3
//! alert_window_minutes = 60
//! alert_threshold = 3
//! summarizer_timeout_secs = 20
//!
//! [summarizer]
//! kind = "llm"
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use std::path::Path;

use city_pulse_signal_models::{
    DEFAULT_ALERT_WINDOW_MINUTES, DEFAULT_SPIKE_THRESHOLD, DEFAULT_SYNTHESIS_WINDOW_MINUTES,
};
use serde::Deserialize;

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "city_pulse.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error (file read).
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// The file being read.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Which summarizer backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerKind {
    /// Offline keyword rules.
    #[default]
    Rule,
    /// LLM provider configured through `AI_*` environment variables.
    Llm,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    /// Synthesis window in minutes.
    pub window_minutes: i64,
    /// Synthesis spike threshold.
    pub threshold: usize,
    /// Alert window in minutes.
    pub alert_window_minutes: i64,
    /// Alert spike threshold.
    pub alert_threshold: usize,
    /// Per-call summarizer deadline in seconds.
    pub summarizer_timeout_secs: Option<u64>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_SYNTHESIS_WINDOW_MINUTES,
            threshold: DEFAULT_SPIKE_THRESHOLD,
            alert_window_minutes: DEFAULT_ALERT_WINDOW_MINUTES,
            alert_threshold: DEFAULT_SPIKE_THRESHOLD,
            summarizer_timeout_secs: None,
        }
    }
}

/// `[summarizer]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummarizerSection {
    /// Backend kind.
    pub kind: SummarizerKind,
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PulseConfig {
    /// Pipeline tuning.
    pub pipeline: PipelineSection,
    /// Summarizer selection.
    pub summarizer: SummarizerSection,
}

impl PulseConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed TOML or unknown keys.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// is read if present and defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Self::parse(&text)
    }
}
