use thiserror::Error;
use upstonk_core::{ConfigError, DiscoveryError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid discovery request: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => 2,
            Self::Discovery(DiscoveryError::NoResults) => 3,
            Self::Discovery(DiscoveryError::UnsupportedJurisdiction { .. }) => 2,
            Self::Discovery(DiscoveryError::Internal(_)) => 1,
            Self::Config(_) => 4,
            Self::Serialization(_) => 5,
            Self::Io(_) => 10,
        }
    }
}
