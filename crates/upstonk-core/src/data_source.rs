//! Provider contract and the criteria every provider is queried with.
//!
//! A provider turns [`SearchCriteria`] into raw [`Product`] records from one
//! external source. Providers know nothing about each other; the
//! [`Aggregator`](crate::aggregator::Aggregator) fans out to all of them,
//! bounds each call with a timeout and merges the results.
//!
//! # Required Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`id`](DataSourceProvider::id) | Provider identifier used in logs and summaries |
//! | [`search`](DataSourceProvider::search) | Fetch candidate records for the criteria |
//!
//! [`circuit_state`](DataSourceProvider::circuit_state) is optional and only
//! reported by providers that sit behind a circuit breaker.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitState;
use crate::domain::{normalize_label, Product};
use crate::ProviderId;

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Timeout,
    Internal,
}

/// Structured provider error. Always recovered by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn timeout(provider: ProviderId, timeout_ms: u64) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: format!("provider '{provider}' did not respond within {timeout_ms}ms"),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Normalised query parameters sent to every provider.
///
/// Lists keep the caller's order and spelling for providers; the cache key is
/// derived from the [`normalized`](SearchCriteria::normalized) form so that two
/// criteria differing only in order or case share an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    pub markets: Vec<String>,
    pub sectors: Vec<String>,
    pub asset_classes: Vec<String>,
    pub companies: Vec<String>,
    pub country: String,
    pub vehicles: Vec<String>,
}

impl SearchCriteria {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }

    pub fn with_markets<I, S>(mut self, markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markets = markets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sectors<I, S>(mut self, sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sectors = sectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_asset_classes<I, S>(mut self, asset_classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asset_classes = asset_classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_companies<I, S>(mut self, companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.companies = companies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_vehicles<I, S>(mut self, vehicles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vehicles = vehicles.into_iter().map(Into::into).collect();
        self
    }

    /// Lower-cased, trimmed, sorted and de-duplicated copy; country upper-cased.
    pub fn normalized(&self) -> Self {
        Self {
            markets: normalize_list(&self.markets),
            sectors: normalize_list(&self.sectors),
            asset_classes: normalize_list(&self.asset_classes),
            companies: normalize_list(&self.companies),
            country: self.country.trim().to_ascii_uppercase(),
            vehicles: normalize_list(&self.vehicles),
        }
    }

    /// Order- and case-insensitive cache key.
    pub fn cache_key(&self) -> String {
        let n = self.normalized();
        format!(
            "country={:?}|markets={:?}|sectors={:?}|asset_classes={:?}|companies={:?}|vehicles={:?}",
            n.country, n.markets, n.sectors, n.asset_classes, n.companies, n.vehicles
        )
    }

    pub fn country_is(&self, country: &str) -> bool {
        self.country.trim().eq_ignore_ascii_case(country.trim())
    }

    /// True when any requested market contains `keyword` (case-insensitive).
    pub fn mentions_market(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.markets
            .iter()
            .any(|market| market.to_lowercase().contains(&keyword))
    }

    /// Relevance check used by providers that fetch more than was asked for.
    ///
    /// A dimension with no data on the product is not held against it.
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_asset_class(product)
            && self.matches_sector(product)
            && self.matches_market(product)
    }

    fn matches_asset_class(&self, product: &Product) -> bool {
        if self.asset_classes.is_empty() || product.asset_class.trim().is_empty() {
            return true;
        }
        let actual = product.asset_class.to_lowercase();
        self.asset_classes
            .iter()
            .any(|wanted| actual.contains(&wanted.trim().to_lowercase()))
    }

    fn matches_sector(&self, product: &Product) -> bool {
        if self.sectors.is_empty() || product.sector_exposure.is_empty() {
            return true;
        }
        self.sectors.iter().any(|wanted| {
            let wanted = wanted.trim().to_lowercase();
            product
                .sector_exposure
                .iter()
                .any(|allocation| allocation.sector.to_lowercase().contains(&wanted))
        })
    }

    fn matches_market(&self, product: &Product) -> bool {
        let geography = &product.geographic_exposure;
        if self.markets.is_empty() || geography.is_empty() {
            return true;
        }

        self.markets.iter().any(|market| {
            let wanted = normalize_label(market);
            if wanted.is_empty() {
                return false;
            }

            let region_hit = geography.regions.keys().any(|region| {
                let region = normalize_label(region);
                region.contains(&wanted) || wanted.contains(&region)
            });
            let country_hit = market_country_code(&wanted)
                .map(|code| {
                    geography.country_weight(code).is_some()
                        || product.exchange_country.eq_ignore_ascii_case(code)
                })
                .unwrap_or(false)
                || geography.country_weight(&wanted).is_some();

            region_hit || country_hit
        })
    }
}

fn normalize_list(values: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = values
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

fn market_country_code(market: &str) -> Option<&'static str> {
    match market {
        "usa" | "us" | "united states" => Some("US"),
        "china" | "cn" => Some("CN"),
        "india" | "in" => Some("IN"),
        "south africa" | "za" => Some("ZA"),
        "united kingdom" | "uk" | "gb" => Some("GB"),
        "japan" | "jp" => Some("JP"),
        _ => None,
    }
}

/// Product data provider contract.
///
/// Implementations must be `Send + Sync`: the aggregator shares them across
/// concurrent requests and runs each call on its own task.
pub trait DataSourceProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetches candidate records for the criteria.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the upstream is unreachable, rate limited
    /// or returns something unparseable. Returning an empty list is not an
    /// error.
    fn search<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Product>, SourceError>> + Send + 'a>>;

    /// Circuit state for providers that guard an upstream with a breaker.
    fn circuit_state(&self) -> Option<CircuitState> {
        None
    }
}
