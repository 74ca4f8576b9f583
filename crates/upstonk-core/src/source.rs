use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identifier for every product data provider the aggregator can fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Jse,
    Yahoo,
    Alphavantage,
    Etfcom,
    Catalog,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Jse,
        ProviderId::Yahoo,
        ProviderId::Alphavantage,
        ProviderId::Etfcom,
        ProviderId::Catalog,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jse => "jse",
            Self::Yahoo => "yahoo",
            Self::Alphavantage => "alphavantage",
            Self::Etfcom => "etfcom",
            Self::Catalog => "catalog",
        }
    }

    /// Human-readable name used in provenance records and search summaries.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Jse => "JSE",
            Self::Yahoo => "Yahoo Finance",
            Self::Alphavantage => "Alpha Vantage",
            Self::Etfcom => "ETF.com",
            Self::Catalog => "Reference Catalog",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_serialize_as_snake_case() {
        let encoded = serde_json::to_string(&ProviderId::Alphavantage).expect("must serialize");
        assert_eq!(encoded, "\"alphavantage\"");
        for provider in ProviderId::ALL {
            assert_eq!(provider.to_string(), provider.as_str());
        }
    }
}
