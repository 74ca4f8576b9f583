use std::path::PathBuf;

use thiserror::Error;

/// Boundary validation failures for inbound discovery requests.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("investor country must not be empty")]
    EmptyCountry,

    #[error("investor account type must not be empty")]
    EmptyAccountType,

    #[error("account type '{account_type}' is not supported for country '{country}'")]
    UnsupportedAccountType {
        country: String,
        account_type: String,
    },

    #[error("at least one investment vehicle must be requested")]
    NoInvestmentVehicles,

    #[error("investment vehicle '{0}' is not recognised (expected etf, stock, bond or fund)")]
    InvalidVehicle(String),

    #[error("at least one exposure criterion (companies, sectors, asset classes or markets) is required")]
    NoExposureCriteria,

    #[error("ranking weights must sum to 1.0, got {sum:.3}")]
    WeightsDoNotSum { sum: f64 },

    #[error("ranking weight for '{factor}' must be a finite non-negative number")]
    InvalidWeight { factor: String },

    #[error("ranking factor '{0}' is not recognised (expected fees, liquidity, tracking or stability)")]
    UnknownRankingFactor(String),

    #[error("maxResults must not exceed {max}, got {value}")]
    MaxResultsOutOfRange { value: usize, max: usize },

    #[error("maxTER must be between 0 and 5, got {value}")]
    MaxTerOutOfRange { value: f64 },

    #[error("risk tolerance '{0}' is not recognised (expected conservative, moderate or aggressive)")]
    InvalidRiskTolerance(String),

    #[error("timeHorizonYears must be between 1 and 50, got {value}")]
    TimeHorizonOutOfRange { value: u32 },

    #[error("timestamp '{value}' must be RFC3339 in UTC")]
    TimestampNotUtc { value: String },
}

/// Pipeline-level failures surfaced to the caller of a discovery run.
///
/// Provider failures never appear here: they are recovered inside the
/// aggregator and only degrade into [`DiscoveryError::NoResults`] when every
/// provider came back empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no ETFs found matching the exposure criteria")]
    NoResults,

    #[error("country '{country}' with account type '{account_type}' is not supported")]
    UnsupportedJurisdiction {
        country: String,
        account_type: String,
    },

    #[error("internal discovery failure: {0}")]
    Internal(String),
}

impl DiscoveryError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoResults => "NO_RESULTS",
            Self::UnsupportedJurisdiction { .. } => "UNSUPPORTED_COUNTRY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the caller supplied something the system cannot serve.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedJurisdiction { .. })
    }
}

/// Configuration loading and logging initialisation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
