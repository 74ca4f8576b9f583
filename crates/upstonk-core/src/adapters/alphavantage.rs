use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::upstream::Upstream;
use crate::circuit_breaker::CircuitState;
use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
use crate::domain::{
    DataSourceRecord, Holding, Product, Reliability, SectorAllocation, SourceType, UtcDateTime,
};
use crate::http_client::HttpClient;
use crate::reference::ReferenceData;
use crate::throttling::RateBudget;
use crate::ProviderId;

const ENDPOINT: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_MAX_TICKERS: usize = 10;
pub const DEFAULT_CALLS_PER_MINUTE: u32 = 5;

/// Fund fundamentals from Alpha Vantage's `ETF_PROFILE` function.
///
/// The free tier allows a handful of calls per minute, so each search asks
/// for at most `max_tickers` profiles and stops early once the budget is
/// spent, returning whatever it already has.
pub struct AlphaVantageProvider {
    upstream: Upstream,
    api_key: String,
    reference: Arc<ReferenceData>,
    budget: RateBudget,
    max_tickers: usize,
}

impl AlphaVantageProvider {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        reference: Arc<ReferenceData>,
    ) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Alphavantage, http),
            api_key: api_key.into(),
            reference,
            budget: RateBudget::per_minute(DEFAULT_CALLS_PER_MINUTE),
            max_tickers: DEFAULT_MAX_TICKERS,
        }
    }

    pub fn with_max_tickers(mut self, max_tickers: usize) -> Self {
        self.max_tickers = max_tickers;
        self
    }

    pub fn with_rate_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.upstream = self.upstream.with_timeout_ms(timeout_ms);
        self
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<Product>, SourceError> {
        if self.reference.is_local_listing_country(&criteria.country) {
            return Ok(Vec::new());
        }

        let tickers = self.reference.global_tickers.tickers_for(criteria);
        let mut products = Vec::new();
        let mut first_error = None;
        let mut throttled = false;

        for ticker in tickers.iter().take(self.max_tickers) {
            if let Err(wait) = self.budget.try_acquire() {
                debug!(provider = %ProviderId::Alphavantage, wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX), "call budget spent; returning partial results");
                throttled = true;
                break;
            }

            match self.fetch_profile(ticker).await {
                Ok(product) => {
                    if criteria.matches(&product) {
                        products.push(product);
                    }
                }
                Err(error) => {
                    warn!(provider = %ProviderId::Alphavantage, ticker = %ticker, code = error.code(), "profile fetch failed: {}", error.message());
                    first_error.get_or_insert(error);
                }
            }
        }

        if products.is_empty() {
            if let Some(error) = first_error {
                return Err(error);
            }
            if throttled {
                return Err(SourceError::rate_limited(
                    "alphavantage call budget exhausted before any profile was fetched",
                ));
            }
        }
        Ok(products)
    }

    async fn fetch_profile(&self, ticker: &str) -> Result<Product, SourceError> {
        let url = format!(
            "{ENDPOINT}?function=ETF_PROFILE&symbol={}&apikey={}",
            urlencoding::encode(ticker),
            urlencoding::encode(&self.api_key)
        );
        let profile: AlphaVantageProfile = self.upstream.get_json(&url, None).await?;

        if let Some(note) = profile.note.as_ref().or(profile.information.as_ref()) {
            return Err(SourceError::rate_limited(format!("alphavantage: {note}")));
        }
        if let Some(message) = &profile.error_message {
            return Err(SourceError::invalid_request(format!(
                "alphavantage rejected {ticker}: {message}"
            )));
        }

        Ok(self.to_product(ticker, profile))
    }

    fn to_product(&self, ticker: &str, profile: AlphaVantageProfile) -> Product {
        let name = profile
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ticker.to_owned());
        let mut product = Product::new(ticker.to_ascii_uppercase(), name);

        product.exchange = profile.exchange.unwrap_or_default();
        product.exchange_country = self
            .reference
            .country_for_exchange(&product.exchange)
            .map(str::to_owned)
            .unwrap_or_default();
        product.currency = profile.currency.unwrap_or_default();
        product.asset_class = profile.asset_type.unwrap_or_default();
        product.provider = profile.fund_family.unwrap_or_default();
        product.aum = parse_number(profile.net_assets.as_deref()).unwrap_or(0.0);
        product.ter = parse_number(profile.net_expense_ratio.as_deref()).map_or(0.0, |r| r * 100.0);
        product.inception_date = profile
            .inception_date
            .as_deref()
            .and_then(parse_date);
        product.is_leveraged = profile
            .leveraged
            .as_deref()
            .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("YES"));

        product.sector_exposure = profile
            .sectors
            .into_iter()
            .filter_map(|sector| {
                let percentage = parse_number(sector.weight.as_deref())? * 100.0;
                (percentage > 0.0).then_some(SectorAllocation {
                    sector: sector.sector,
                    percentage,
                })
            })
            .collect();
        product.top_holdings = profile
            .holdings
            .into_iter()
            .filter(|holding| !holding.description.eq_ignore_ascii_case("n/a"))
            .filter_map(|holding| {
                let weight = parse_number(holding.weight.as_deref())? * 100.0;
                (weight > 0.0).then_some(Holding {
                    name: holding.description,
                    ticker: holding.symbol,
                    weight,
                    asset_type: String::new(),
                })
            })
            .collect();

        product.data_sources.push(DataSourceRecord::new(
            SourceType::Api,
            ProviderId::Alphavantage.display_name(),
            Some(format!("{ENDPOINT}?function=ETF_PROFILE&symbol={ticker}")),
            Reliability::Primary,
        ));
        product.last_updated = Some(UtcDateTime::now());
        product
    }
}

impl DataSourceProvider for AlphaVantageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
    }

    fn search<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Product>, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(criteria))
    }

    fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.upstream.circuit_state())
    }
}

/// Alpha Vantage reports numbers as strings and "None"/"n/a" for gaps.
fn parse_number(value: Option<&str>) -> Option<f64> {
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_date(value: &str) -> Option<UtcDateTime> {
    let mut parts = value.trim().splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    UtcDateTime::from_ymd(year, month, day)
}

#[derive(Debug, Default, Deserialize)]
struct AlphaVantageProfile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    fund_family: Option<String>,
    #[serde(default)]
    net_assets: Option<String>,
    #[serde(default)]
    net_expense_ratio: Option<String>,
    #[serde(default)]
    inception_date: Option<String>,
    #[serde(default)]
    leveraged: Option<String>,
    #[serde(default)]
    sectors: Vec<AlphaVantageSector>,
    #[serde(default)]
    holdings: Vec<AlphaVantageHolding>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageSector {
    sector: String,
    #[serde(default)]
    weight: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageHolding {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    weight: Option<String>,
}
