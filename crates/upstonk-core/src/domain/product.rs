use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::UtcDateTime;

/// Kind of source a product record (or part of it) was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    FactSheet,
    ExchangeListing,
    #[serde(rename = "API")]
    Api,
    Manual,
}

impl SourceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FactSheet => "FactSheet",
            Self::ExchangeListing => "ExchangeListing",
            Self::Api => "API",
            Self::Manual => "Manual",
        }
    }
}

/// Reliability tier of a provenance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reliability {
    Primary,
    Secondary,
    Tertiary,
}

/// One provenance entry: where a product's data came from and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceRecord {
    pub source_type: SourceType,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub accessed_at: UtcDateTime,
    pub reliability: Reliability,
}

impl DataSourceRecord {
    pub fn new(
        source_type: SourceType,
        provider: impl Into<String>,
        url: Option<String>,
        reliability: Reliability,
    ) -> Self {
        Self {
            source_type,
            provider: provider.into(),
            url,
            accessed_at: UtcDateTime::now(),
            reliability,
        }
    }
}

/// Asset-class mix in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetExposure {
    pub equities: f64,
    pub bonds: f64,
    pub cash: f64,
    pub commodities: f64,
    pub real_estate: f64,
    pub other: f64,
}

impl AssetExposure {
    pub fn is_empty(&self) -> bool {
        [
            self.equities,
            self.bonds,
            self.cash,
            self.commodities,
            self.real_estate,
            self.other,
        ]
        .iter()
        .all(|value| *value == 0.0)
    }
}

/// Regional and per-country exposure, both in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeographicExposure {
    pub regions: BTreeMap<String, f64>,
    pub countries: BTreeMap<String, f64>,
}

impl GeographicExposure {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.countries.is_empty()
    }

    /// Region weight for a market label; keys compare case-insensitively with
    /// `_` and space treated alike, so `emerging_markets` matches `Emerging Markets`.
    pub fn region_weight(&self, market: &str) -> Option<f64> {
        let wanted = normalize_label(market);
        self.regions
            .iter()
            .find(|(region, _)| normalize_label(region) == wanted)
            .map(|(_, weight)| *weight)
    }

    pub fn country_weight(&self, country: &str) -> Option<f64> {
        self.countries
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(country.trim()))
            .map(|(_, weight)| *weight)
    }

    pub fn dominant_region(&self) -> Option<&str> {
        self.regions
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(region, _)| region.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAllocation {
    pub sector: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub name: String,
    #[serde(default)]
    pub ticker: String,
    pub weight: f64,
    #[serde(default)]
    pub asset_type: String,
}

/// Canonical ETF record as normalised from any provider.
///
/// Empty strings, zero numbers, `None` and empty collections all mean
/// "not reported" and are filled in by later records during merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    // Identity
    pub ticker: String,
    pub name: String,
    pub isin: String,
    pub exchange: String,
    pub exchange_country: String,

    // Structure
    pub domicile: String,
    pub legal_structure: String,
    pub is_physical: bool,
    pub is_synthetic: bool,
    pub is_leveraged: bool,
    pub is_inverse: bool,
    pub replication_method: String,

    // Exposure
    pub asset_class: String,
    pub tracking_index: String,
    pub asset_exposure: AssetExposure,
    pub geographic_exposure: GeographicExposure,
    pub sector_exposure: Vec<SectorAllocation>,
    pub top_holdings: Vec<Holding>,

    // Costs
    pub ter: f64,
    /// Absent when the source did not report it; zero is a real value.
    pub tracking_difference: Option<f64>,
    pub aum: f64,
    pub currency: String,
    pub dividend_treatment: String,

    // Liquidity
    pub average_daily_volume: f64,
    pub bid_ask_spread: f64,

    pub inception_date: Option<UtcDateTime>,
    pub provider: String,

    pub data_sources: Vec<DataSourceRecord>,
    pub last_updated: Option<UtcDateTime>,
}

impl Product {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Deduplication key: upper-cased ticker, else ISIN, else nothing.
    pub fn identity_key(&self) -> Option<String> {
        let ticker = self.ticker.trim();
        if !ticker.is_empty() {
            return Some(ticker.to_ascii_uppercase());
        }
        let isin = self.isin.trim();
        if !isin.is_empty() {
            return Some(isin.to_ascii_uppercase());
        }
        None
    }

    pub fn source_of_type(&self, source_type: SourceType) -> Option<&DataSourceRecord> {
        self.data_sources
            .iter()
            .find(|source| source.source_type == source_type)
    }

    pub fn dominant_sector(&self) -> Option<&str> {
        self.sector_exposure
            .iter()
            .max_by(|a, b| a.percentage.total_cmp(&b.percentage))
            .map(|allocation| allocation.sector.as_str())
    }
}

pub(crate) fn normalize_label(value: &str) -> String {
    value.trim().to_lowercase().replace('_', " ")
}
