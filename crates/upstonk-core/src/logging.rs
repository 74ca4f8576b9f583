//! Logging configuration and initialization.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::ConfigError;

/// Logging configuration. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "logging.format",
                    value: other.to_owned(),
                })
            }
        }
        EnvFilter::try_new(&self.level).map_err(|_| ConfigError::InvalidValue {
            key: "logging.level",
            value: self.level.clone(),
        })?;
        Ok(())
    }

    /// Installs the global subscriber, writing to stderr so stdout stays
    /// reserved for command output.
    pub fn init(&self) -> Result<(), ConfigError> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let installed = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        installed.map_err(|e| ConfigError::Logging(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_format() {
        let config = LoggingConfig {
            level: "debug".into(),
            format: "xml".into(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key: "logging.format", .. })
        ));
        assert!(LoggingConfig::default().validate().is_ok());
    }
}
