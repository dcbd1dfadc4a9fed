//! Configuration management.
//!
//! The engine reads three values at construction time and never changes them
//! afterwards: the catalog base URL, the request timeout and the identifying
//! `User-Agent`. Values come from (lowest to highest precedence) the built-in
//! defaults, a TOML file and `FLIBUSTA_`-prefixed environment variables.
//!
//! ```toml
//! base_url = "http://flibusta.is"
//! timeout_secs = 90
//! probe_timeout_secs = 15
//! user_agent = "Mozilla/5.0 ..."
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "flibusta-fetch.toml";
/// Directory under the platform config dir
const CONFIG_DIR_NAME: &str = "flibusta-fetch";
/// Environment variable prefix (e.g. `FLIBUSTA_BASE_URL`)
const ENV_PREFIX: &str = "FLIBUSTA";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog root; the feed lives under `{base_url}/opds`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for every catalog request, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for the connectivity probe, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Identifying request header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://flibusta.is".to_string()
}

fn default_timeout() -> u64 {
    90
}

fn default_probe_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

impl Config {
    /// Create a configuration pointing at another catalog root
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Root of the OPDS feed
    pub fn feed_url(&self) -> String {
        format!("{}/opds", self.base_url())
    }

    /// Check that the values can be used to build the transport
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(self.base_url())
            .map_err(|e| ConfigError::Invalid(format!("base_url '{}': {}", self.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url '{}' must use http or https",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Get the default configuration with environment overrides applied
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Find a configuration file in the default locations
///
/// Checks `./flibusta-fetch.toml`, then `<config dir>/flibusta-fetch/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
        .filter(|path| path.is_file())
}

/// Serialize a configuration as TOML, e.g. to bootstrap a config file
pub fn to_toml(config: &Config) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::Invalid(e.to_string()))
}
