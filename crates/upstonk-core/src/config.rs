//! Application configuration loading and validation.
//!
//! [`AppConfig`] is read from an optional TOML file (every section may be
//! omitted) and then overridden by environment variables:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `UPSTONK_ALPHAVANTAGE_API_KEY` (fallback `ALPHAVANTAGE_API_KEY`) | `providers.alphavantage_api_key` |
//! | `UPSTONK_LOG_LEVEL` | `logging.level` |
//! | `UPSTONK_LOG_FORMAT` | `logging.format` |
//! | `UPSTONK_CACHE_ENABLED` | `cache.enabled` |
//! | `UPSTONK_CACHE_TTL_SECS` | `cache.ttl_secs` |
//! | `UPSTONK_MOCK_PROVIDERS` | `providers.mock` |

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::reference::ReferenceData;

pub const MAX_RESULTS_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Overall budget for one discovery run.
    pub deadline_ms: u64,
    /// Upper bound for a single provider call.
    pub provider_timeout_ms: u64,
    /// Used when a request does not set `maxResults`.
    pub default_max_results: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 30_000,
            provider_timeout_ms: 10_000,
            default_max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Serve every search from the built-in catalog instead of live upstreams.
    pub mock: bool,
    pub jse: bool,
    pub etfcom: bool,
    pub yahoo: bool,
    pub alphavantage: bool,
    pub alphavantage_api_key: Option<String>,
    pub alphavantage_max_tickers: usize,
    pub http_timeout_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            mock: false,
            jse: true,
            etfcom: true,
            yahoo: true,
            alphavantage: true,
            alphavantage_api_key: None,
            alphavantage_max_tickers: 10,
            http_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub request: RequestConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
    pub reference: ReferenceData,
}

impl AppConfig {
    /// Reads the file when given, applies process environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse_toml(&content)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) =
            lookup("UPSTONK_ALPHAVANTAGE_API_KEY").or_else(|| lookup("ALPHAVANTAGE_API_KEY"))
        {
            self.providers.alphavantage_api_key = Some(key);
        }
        if let Some(level) = lookup("UPSTONK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("UPSTONK_LOG_FORMAT") {
            self.logging.format = format.trim().to_ascii_lowercase();
        }
        if let Some(value) = lookup("UPSTONK_CACHE_ENABLED") {
            self.cache.enabled = parse_flag("UPSTONK_CACHE_ENABLED", &value)?;
        }
        if let Some(value) = lookup("UPSTONK_CACHE_TTL_SECS") {
            self.cache.ttl_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "UPSTONK_CACHE_TTL_SECS",
                        value: value.clone(),
                    })?;
        }
        if let Some(value) = lookup("UPSTONK_MOCK_PROVIDERS") {
            self.providers.mock = parse_flag("UPSTONK_MOCK_PROVIDERS", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request.deadline_ms == 0 {
            return Err(invalid("request.deadline_ms", self.request.deadline_ms));
        }
        if self.request.provider_timeout_ms == 0 {
            return Err(invalid(
                "request.provider_timeout_ms",
                self.request.provider_timeout_ms,
            ));
        }
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.request.default_max_results) {
            return Err(invalid(
                "request.default_max_results",
                self.request.default_max_results,
            ));
        }
        if self.providers.alphavantage_max_tickers == 0 {
            return Err(invalid(
                "providers.alphavantage_max_tickers",
                self.providers.alphavantage_max_tickers,
            ));
        }
        if self.providers.http_timeout_ms == 0 {
            return Err(invalid(
                "providers.http_timeout_ms",
                self.providers.http_timeout_ms,
            ));
        }
        self.logging.validate()
    }

    /// Zero when caching is disabled.
    pub fn cache_ttl(&self) -> Duration {
        if self.cache.enabled {
            Duration::from_secs(self.cache.ttl_secs)
        } else {
            Duration::ZERO
        }
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.request.deadline_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.request.provider_timeout_ms)
    }
}

fn invalid(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
