//! Configuration loading and validation.
//!
//! Config is TOML with defaults for every field, so an empty file is a valid
//! configuration. Validation collects all errors found rather than stopping
//! at the first.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Top-level console configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Backend REST API settings.
    pub backend: BackendConfig,
    /// Reload scheduling settings.
    pub refresh: RefreshConfig,
    /// History view settings.
    pub history: HistoryConfig,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the dashboard backend, without trailing slash.
    pub base_url: String,
    /// Per-request timeout. Timed-out fetches count as fetch failures.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Reload scheduling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Quiet period for the reload debounce, in milliseconds. Triggers
    /// arriving inside the window restart it; one reload runs per window.
    pub debounce_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// History view settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Events requested per history page.
    pub page_size: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { page_size: 50 }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;
        let config: ConsoleConfig = toml::from_str(&contents)?;
        if let Err(errors) = config.validate() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("invalid configuration: {joined}");
        }
        Ok(config)
    }

    /// Validate the configuration, returning all errors found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.backend.base_url.is_empty() {
            errors.push(ValidationError::MissingBaseUrl);
        } else if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            errors.push(ValidationError::InvalidBaseUrl(self.backend.base_url.clone()));
        }

        if self.backend.request_timeout_secs == 0 {
            errors.push(ValidationError::ZeroTimeout);
        }

        if self.refresh.debounce_ms == 0 || self.refresh.debounce_ms > 10_000 {
            errors.push(ValidationError::DebounceOutOfRange(self.refresh.debounce_ms));
        }

        if self.history.page_size == 0 || self.history.page_size > 500 {
            errors.push(ValidationError::PageSizeOutOfRange(self.history.page_size));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.refresh.debounce_ms)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }
}

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("backend.base_url is required")]
    MissingBaseUrl,
    #[error("backend.base_url must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),
    #[error("backend.request_timeout_secs must be greater than 0")]
    ZeroTimeout,
    #[error("refresh.debounce_ms must be in 1..=10000, got {0}")]
    DebounceOutOfRange(u64),
    #[error("history.page_size must be in 1..=500, got {0}")]
    PageSizeOutOfRange(u32),
}
