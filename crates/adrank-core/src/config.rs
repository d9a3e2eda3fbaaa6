//! Configuration management for adrank.
//!
//! Configuration is read from a JSON or TOML file with every key optional,
//! then overridden from `ADRANK_*` environment variables.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default config file name, looked up in the working directory first.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Navigation timeout used when the browser runs with a visible window.
const HEADFUL_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Strategy used to decide whether a loaded page is an anti-bot wall.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockDetection {
    /// Only navigation timeouts count as blocks
    #[default]
    TimeoutOnly,
    /// Inspect title, known selectors, body text and iframes after navigation
    Heuristic,
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Navigation timeout in seconds
    pub timeout: u64,
    /// Number of lanes allowed to run at the same time
    pub max_workers: usize,
    /// Lower bound of the delay before each city, in seconds
    pub min_delay: u64,
    /// Upper bound of the delay before each city, in seconds
    pub max_delay: u64,
    /// Run the browser without a window
    pub headless: bool,
    /// Proxy URLs; each one becomes a lane
    pub proxies: Vec<String>,
    /// Retries after the first attempt for blocked or timed-out fetches
    pub max_retries: u32,
    /// Post-navigation block detection strategy
    pub block_detection: BlockDetection,
    /// Scheme and host of the search site
    pub search_base_url: String,
    /// Deadline for the whole run, in seconds
    pub run_timeout_secs: Option<u64>,
    /// Seed for delay and fingerprint randomness
    pub seed: Option<u64>,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            max_workers: 3,
            min_delay: 3,
            max_delay: 10,
            headless: true,
            proxies: Vec::new(),
            max_retries: 2,
            block_detection: BlockDetection::TimeoutOnly,
            search_base_url: "https://www.avito.ru".to_string(),
            run_timeout_secs: None,
            seed: None,
        }
    }
}

impl RankConfig {
    /// Load configuration from `path`.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as JSON.
    ///
    /// # Errors
    /// Returns error if the file is missing, unreadable or malformed.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }

    /// Load configuration from the first file that exists among `explicit`,
    /// `./config.json` and the user config directory.
    ///
    /// Falls back to defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }

        match Self::user_config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::debug!("Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply environment overrides, reading variables through `lookup`.
    ///
    /// Supports the following environment variables:
    /// - `ADRANK_HEADLESS`: browser headless mode (true/false)
    /// - `ADRANK_TIMEOUT`: navigation timeout in seconds
    /// - `ADRANK_MAX_RETRIES`: retry count
    /// - `ADRANK_PROXIES`: comma-separated proxy list
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("ADRANK_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.headless = headless;
                tracing::debug!("Override headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("ADRANK_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.timeout = timeout;
                tracing::debug!("Override timeout from env: {}", timeout);
            }
        }

        if let Some(val) = lookup("ADRANK_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.max_retries = retries;
                tracing::debug!("Override max_retries from env: {}", retries);
            }
        }

        if let Some(val) = lookup("ADRANK_PROXIES") {
            self.proxies = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            tracing::debug!("Override proxies from env: {} entries", self.proxies.len());
        }
    }

    /// Check that values are usable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidValue {
                field: "min_delay".to_string(),
                reason: format!(
                    "must not exceed max_delay ({} > {})",
                    self.min_delay, self.max_delay
                ),
            });
        }

        if self.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        check_base_url(&self.search_base_url).map_err(|reason| ConfigError::InvalidValue {
            field: "search_base_url".to_string(),
            reason: format!("'{}' {reason}", self.search_base_url),
        })
    }

    /// Timeout applied to page navigation.
    ///
    /// A visible browser gets a shorter, fixed timeout.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        if self.headless {
            Duration::from_secs(self.timeout)
        } else {
            HEADFUL_NAVIGATION_TIMEOUT
        }
    }

    /// Deadline for the whole run, if configured.
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Path of the per-user config file: `~/.config/adrank/config.json`.
    pub fn user_config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "adrank", "adrank").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join(DEFAULT_CONFIG_FILE))
    }
}

/// The base must parse, use http(s) and be able to take a city path segment.
fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("is not an http(s) URL".to_string());
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err("has no host".to_string());
    }
    Ok(())
}
