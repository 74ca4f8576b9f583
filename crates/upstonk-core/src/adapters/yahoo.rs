use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::upstream::Upstream;
use crate::circuit_breaker::CircuitState;
use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
use crate::domain::{
    AssetExposure, DataSourceRecord, Holding, Product, Reliability, SectorAllocation, SourceType,
    UtcDateTime,
};
use crate::http_client::HttpClient;
use crate::reference::ReferenceData;
use crate::ProviderId;

const QUOTE_ENDPOINT: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const SUMMARY_ENDPOINT: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const REFERER: &str = "https://finance.yahoo.com/";

// ============================================================================
// Yahoo Client - quote and fund profile endpoints
// ============================================================================

/// Yahoo Finance quote client shared by the global and JSE listing providers.
///
/// Each owner gets its own breaker, so a failing `.JO` lookup never trips the
/// global provider and vice versa.
pub(crate) struct YahooClient {
    upstream: Upstream,
}

impl YahooClient {
    pub(crate) fn new(provider: ProviderId, http: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(provider, http),
        }
    }

    pub(crate) fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.upstream = self.upstream.with_timeout_ms(timeout_ms);
        self
    }

    pub(crate) fn circuit_state(&self) -> CircuitState {
        self.upstream.circuit_state()
    }

    /// One batched quote call for every symbol.
    pub(crate) async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<Vec<YahooQuote>, SourceError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{QUOTE_ENDPOINT}?symbols={}",
            urlencoding::encode(&symbols.join(","))
        );
        let response: YahooQuoteResponse = self.upstream.get_json(&url, Some(REFERER)).await?;

        if let Some(error) = response.quote_response.error.filter(|e| !e.is_null()) {
            return Err(SourceError::unavailable(format!("yahoo API error: {error}")));
        }
        Ok(response.quote_response.result)
    }

    /// Fund profile and top holdings for one symbol.
    pub(crate) async fn fetch_profile(&self, symbol: &str) -> Result<YahooFundDetail, SourceError> {
        let url = format!(
            "{SUMMARY_ENDPOINT}/{}?modules=fundProfile,topHoldings",
            urlencoding::encode(symbol)
        );
        let response: YahooSummaryResponse = self.upstream.get_json(&url, Some(REFERER)).await?;

        response
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| SourceError::unavailable(format!("yahoo returned no profile for {symbol}")))
    }
}

// ============================================================================
// Yahoo Quote Provider
// ============================================================================

/// Globally listed ETFs chosen from the reference ticker table.
///
/// Skipped for countries whose investors only see local listings.
pub struct YahooQuoteProvider {
    client: YahooClient,
    reference: Arc<ReferenceData>,
}

impl YahooQuoteProvider {
    pub fn new(http: Arc<dyn HttpClient>, reference: Arc<ReferenceData>) -> Self {
        Self {
            client: YahooClient::new(ProviderId::Yahoo, http),
            reference,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.client = self.client.with_timeout_ms(timeout_ms);
        self
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<Product>, SourceError> {
        if self.reference.is_local_listing_country(&criteria.country) {
            debug!(provider = %ProviderId::Yahoo, country = %criteria.country, "skipping global listings for local-listing country");
            return Ok(Vec::new());
        }

        let tickers = self.reference.global_tickers.tickers_for(criteria);
        debug!(provider = %ProviderId::Yahoo, tickers = ?tickers, "fetching global quotes");
        let quotes = self.client.fetch_quotes(&tickers).await?;

        let mut products = Vec::with_capacity(quotes.len());
        for quote in quotes {
            let detail = match self.client.fetch_profile(&quote.symbol).await {
                Ok(detail) => Some(detail),
                Err(error) => {
                    debug!(provider = %ProviderId::Yahoo, ticker = %quote.symbol, code = error.code(), "fund profile unavailable");
                    None
                }
            };
            let product = to_product(&quote, detail.as_ref(), &self.reference);
            if criteria.matches(&product) {
                products.push(product);
            }
        }
        Ok(products)
    }
}

impl DataSourceProvider for YahooQuoteProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn search<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Product>, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch(criteria))
    }

    fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.client.circuit_state())
    }
}

// ============================================================================
// Normalisation
// ============================================================================

/// Maps a quote (and its fund profile, when fetched) onto a product record.
pub(crate) fn to_product(
    quote: &YahooQuote,
    detail: Option<&YahooFundDetail>,
    reference: &ReferenceData,
) -> Product {
    let name = quote
        .long_name
        .clone()
        .or_else(|| quote.short_name.clone())
        .unwrap_or_else(|| quote.symbol.clone());
    let mut product = Product::new(base_ticker(&quote.symbol), name);

    product.exchange = quote.exchange.clone().unwrap_or_default();
    product.exchange_country = reference
        .country_for_exchange(&product.exchange)
        .map(str::to_owned)
        .unwrap_or_default();
    product.currency = quote.currency.clone().unwrap_or_default();
    product.aum = quote
        .net_assets
        .or(quote.market_cap)
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0);
    product.average_daily_volume = quote.average_daily_volume_3_month.unwrap_or(0.0);
    if let Some(ratio) = quote.net_expense_ratio.filter(|v| v.is_finite() && *v > 0.0) {
        product.ter = ratio;
    }

    let lowered = product.name.to_lowercase();
    if lowered.contains("swap") || lowered.contains("synthetic") {
        product.is_synthetic = true;
        product.replication_method = String::from("Synthetic");
    } else {
        product.is_physical = true;
        product.replication_method = String::from("Physical");
    }
    let (leveraged, inverse) = structure_flags(&product.name);
    product.is_leveraged = leveraged;
    product.is_inverse = inverse;

    if let Some(detail) = detail {
        apply_detail(&mut product, detail);
    }
    if product.asset_class.is_empty() {
        product.asset_class = String::from("Equity");
    }

    product.data_sources.push(DataSourceRecord::new(
        SourceType::Api,
        ProviderId::Yahoo.display_name(),
        Some(format!("https://finance.yahoo.com/quote/{}", quote.symbol)),
        Reliability::Primary,
    ));
    product.last_updated = Some(UtcDateTime::now());
    product
}

fn apply_detail(product: &mut Product, detail: &YahooFundDetail) {
    let mut category = None;
    if let Some(profile) = &detail.fund_profile {
        if let Some(family) = profile.family.as_deref().filter(|f| !f.trim().is_empty()) {
            product.provider = family.to_owned();
        }
        if let Some(legal_type) = &profile.legal_type {
            product.legal_structure = legal_type.clone();
        }
        let expense_ratio = profile
            .fees_expenses_investment
            .as_ref()
            .and_then(|fees| fees.annual_report_expense_ratio.as_ref())
            .and_then(YahooNumber::value);
        if let Some(ratio) = expense_ratio {
            product.ter = ratio * 100.0;
        }
        category = profile.category_name.clone();
    }

    if let Some(top) = &detail.top_holdings {
        product.asset_exposure = AssetExposure {
            equities: percent(top.stock_position.as_ref()),
            bonds: percent(top.bond_position.as_ref()),
            cash: percent(top.cash_position.as_ref()),
            ..AssetExposure::default()
        };
        product.top_holdings = top
            .holdings
            .iter()
            .filter_map(|holding| {
                let weight = holding.holding_percent.as_ref()?.value()? * 100.0;
                Some(Holding {
                    name: holding.holding_name.clone().unwrap_or_default(),
                    ticker: holding.symbol.clone().unwrap_or_default(),
                    weight,
                    asset_type: String::new(),
                })
            })
            .collect();
        product.sector_exposure = top
            .sector_weightings
            .iter()
            .flat_map(|entry| entry.iter())
            .filter_map(|(key, weight)| {
                let percentage = weight.value()? * 100.0;
                (percentage > 0.0).then(|| SectorAllocation {
                    sector: sector_label(key),
                    percentage,
                })
            })
            .collect();
    }

    product.asset_class = asset_class_for(category.as_deref(), &product.asset_exposure);
}

fn percent(value: Option<&YahooNumber>) -> f64 {
    value.and_then(YahooNumber::value).map_or(0.0, |v| v * 100.0)
}

/// Symbol without the exchange suffix: `STXNDQ.JO` becomes `STXNDQ`.
pub(crate) fn base_ticker(symbol: &str) -> String {
    symbol
        .split('.')
        .next()
        .unwrap_or(symbol)
        .trim()
        .to_ascii_uppercase()
}

/// Leveraged and inverse flags read from the fund name.
///
/// `short` only counts when it is not the start of "short-term" or "short duration".
pub(crate) fn structure_flags(name: &str) -> (bool, bool) {
    let lowered = name.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    let leveraged = tokens
        .iter()
        .any(|token| matches!(*token, "leveraged" | "2x" | "3x"));
    let inverse = tokens.iter().enumerate().any(|(i, token)| match *token {
        "inverse" | "bear" => true,
        "short" => !matches!(tokens.get(i + 1), Some(&"term") | Some(&"duration")),
        _ => false,
    });
    (leveraged, inverse)
}

fn sector_label(key: &str) -> String {
    let spaced = match key {
        "realestate" => "real_estate",
        other => other,
    };
    spaced
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn asset_class_for(category: Option<&str>, exposure: &AssetExposure) -> String {
    let category = category.unwrap_or_default().to_lowercase();
    let class = if category.contains("bond") || category.contains("fixed") {
        "Fixed Income"
    } else if category.contains("commodit") {
        "Commodity"
    } else if category.contains("real estate") {
        "Real Estate"
    } else if exposure.bonds > exposure.equities {
        "Fixed Income"
    } else {
        "Equity"
    };
    class.to_owned()
}

// ============================================================================
// Yahoo Finance API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResponseData,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponseData {
    #[serde(default)]
    result: Vec<YahooQuote>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct YahooQuote {
    pub(crate) symbol: String,
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<f64>,
    #[serde(rename = "netAssets", default)]
    net_assets: Option<f64>,
    #[serde(rename = "netExpenseRatio", default)]
    net_expense_ratio: Option<f64>,
    #[serde(rename = "averageDailyVolume3Month", default)]
    average_daily_volume_3_month: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooSummaryData,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryData {
    #[serde(default)]
    result: Option<Vec<YahooFundDetail>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct YahooFundDetail {
    #[serde(rename = "fundProfile", default)]
    fund_profile: Option<YahooFundProfile>,
    #[serde(rename = "topHoldings", default)]
    top_holdings: Option<YahooTopHoldings>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooFundProfile {
    #[serde(alias = "fundFamily", default)]
    family: Option<String>,
    #[serde(rename = "categoryName", default)]
    category_name: Option<String>,
    #[serde(rename = "legalType", default)]
    legal_type: Option<String>,
    #[serde(rename = "feesExpensesInvestment", default)]
    fees_expenses_investment: Option<YahooFees>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooFees {
    #[serde(rename = "annualReportExpenseRatio", default)]
    annual_report_expense_ratio: Option<YahooNumber>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooTopHoldings {
    #[serde(rename = "stockPosition", default)]
    stock_position: Option<YahooNumber>,
    #[serde(rename = "bondPosition", default)]
    bond_position: Option<YahooNumber>,
    #[serde(rename = "cashPosition", default)]
    cash_position: Option<YahooNumber>,
    #[serde(default)]
    holdings: Vec<YahooHolding>,
    #[serde(rename = "sectorWeightings", default)]
    sector_weightings: Vec<std::collections::BTreeMap<String, YahooNumber>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooHolding {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(rename = "holdingName", default)]
    holding_name: Option<String>,
    #[serde(rename = "holdingPercent", default)]
    holding_percent: Option<YahooNumber>,
}

/// Yahoo wraps most numbers as `{"raw": 0.07, "fmt": "7.00%"}` but not all.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum YahooNumber {
    Plain(f64),
    Wrapped {
        #[serde(default)]
        raw: Option<f64>,
    },
}

impl YahooNumber {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Self::Plain(value) => Some(*value),
            Self::Wrapped { raw } => *raw,
        };
        value.filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;

    const QUOTES: &str = r#"{"quoteResponse":{"result":[
        {"symbol":"QQQ","longName":"Invesco QQQ Trust","exchange":"NMS","currency":"USD",
         "netAssets":250000000000,"averageDailyVolume3Month":45000000},
        {"symbol":"TQQQ","longName":"ProShares UltraPro QQQ 3x Leveraged","exchange":"NMS","currency":"USD",
         "marketCap":20000000000,"averageDailyVolume3Month":60000000}
    ],"error":null}}"#;

    const QQQ_PROFILE: &str = r#"{"quoteSummary":{"result":[{
        "fundProfile":{"family":"Invesco","categoryName":"Large Growth","legalType":"Exchange Traded Fund",
            "feesExpensesInvestment":{"annualReportExpenseRatio":{"raw":0.002,"fmt":"0.20%"}}},
        "topHoldings":{"stockPosition":{"raw":0.995},"bondPosition":{"raw":0.0},"cashPosition":{"raw":0.005},
            "holdings":[{"symbol":"AAPL","holdingName":"Apple Inc","holdingPercent":{"raw":0.087}}],
            "sectorWeightings":[{"technology":{"raw":0.58}},{"realestate":{"raw":0.0}},{"consumer_cyclical":0.18}]}
    }],"error":null}}"#;

    fn provider(http: Arc<ScriptedHttpClient>) -> YahooQuoteProvider {
        YahooQuoteProvider::new(http, Arc::new(ReferenceData::default()))
    }

    #[tokio::test]
    async fn normalises_quotes_and_fund_profiles() {
        let http = Arc::new(
            ScriptedHttpClient::new()
                .with_json("/v7/finance/quote", QUOTES)
                .with_json("/quoteSummary/QQQ", QQQ_PROFILE)
                .with_json("/quoteSummary/TQQQ", r#"{"quoteSummary":{"result":[],"error":null}}"#),
        );
        let criteria = SearchCriteria::new("US").with_sectors(["technology"]);

        let products = provider(http.clone())
            .search(&criteria)
            .await
            .expect("search succeeds");

        assert_eq!(products.len(), 2);
        let qqq = &products[0];
        assert_eq!(qqq.ticker, "QQQ");
        assert_eq!(qqq.exchange_country, "US");
        assert_eq!(qqq.provider, "Invesco");
        assert!((qqq.ter - 0.2).abs() < 1e-9);
        assert_eq!(qqq.aum, 250_000_000_000.0);
        assert_eq!(qqq.asset_class, "Equity");
        assert!((qqq.asset_exposure.equities - 99.5).abs() < 1e-9);
        assert_eq!(qqq.top_holdings[0].name, "Apple Inc");
        assert_eq!(
            qqq.sector_exposure
                .iter()
                .map(|s| s.sector.as_str())
                .collect::<Vec<_>>(),
            ["Technology", "Consumer Cyclical"]
        );
        assert_eq!(qqq.data_sources[0].source_type, SourceType::Api);
        assert!(qqq.is_physical);

        let tqqq = &products[1];
        assert!(tqqq.is_leveraged);
        assert!(!tqqq.is_inverse);
        assert_eq!(tqqq.aum, 20_000_000_000.0);

        let quote_request = &http.recorded_requests()[0];
        assert!(quote_request.url.contains("symbols=QQQ%2CXLK%2CVGT%2CSOXX"));
        assert_eq!(
            quote_request.headers.get("referer").map(String::as_str),
            Some("https://finance.yahoo.com/")
        );
    }

    #[tokio::test]
    async fn local_listing_country_is_skipped_without_calls() {
        let http = Arc::new(ScriptedHttpClient::new());
        let products = provider(http.clone())
            .search(&SearchCriteria::new("ZA").with_markets(["usa"]))
            .await
            .expect("skipping is not an error");

        assert!(products.is_empty());
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn quote_failure_is_a_source_error() {
        let http = Arc::new(ScriptedHttpClient::new());
        let error = provider(http)
            .search(&SearchCriteria::new("US").with_markets(["usa"]))
            .await
            .expect_err("unrouted quote call answers 404");
        assert_eq!(error.code(), "source.unavailable");
    }

    #[test]
    fn name_heuristics_detect_structure() {
        assert_eq!(structure_flags("Direxion Daily S&P 500 Bear 3X"), (true, true));
        assert_eq!(structure_flags("ProShares Short QQQ"), (false, true));
        assert_eq!(structure_flags("iShares Short-Term Treasury Bond"), (false, false));
        assert_eq!(structure_flags("Satrix NASDAQ 100"), (false, false));
    }

    #[test]
    fn base_ticker_drops_exchange_suffix() {
        assert_eq!(base_ticker("stxndq.JO"), "STXNDQ");
        assert_eq!(base_ticker("SPY"), "SPY");
    }
}
