use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::upstream::Upstream;
use super::yahoo::structure_flags;
use crate::circuit_breaker::CircuitState;
use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
use crate::domain::{DataSourceRecord, Product, Reliability, SourceType, UtcDateTime};
use crate::http_client::HttpClient;
use crate::reference::ReferenceData;
use crate::ProviderId;

const SCREENER_ENDPOINT: &str = "https://www.etf.com/api/screener";

/// Global ETFs from the ETF.com screener.
///
/// The screener only returns ticker, name and expense ratio, so its records
/// are secondary and rely on merging with richer sources. Skipped for
/// countries whose investors only see local listings.
pub struct EtfComProvider {
    upstream: Upstream,
    reference: Arc<ReferenceData>,
}

impl EtfComProvider {
    pub fn new(http: Arc<dyn HttpClient>, reference: Arc<ReferenceData>) -> Self {
        Self {
            upstream: Upstream::new(ProviderId::Etfcom, http),
            reference,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.upstream = self.upstream.with_timeout_ms(timeout_ms);
        self
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<Product>, SourceError> {
        if self.reference.is_local_listing_country(&criteria.country) {
            debug!(provider = %ProviderId::Etfcom, country = %criteria.country, "skipping global listings for local-listing country");
            return Ok(Vec::new());
        }

        let query = screener_query(criteria);
        let url = format!("{SCREENER_ENDPOINT}?q={}", urlencoding::encode(&query));
        debug!(provider = %ProviderId::Etfcom, query = %query, "querying screener");
        let response: ScreenerResponse = self.upstream.get_json(&url, None).await?;

        let products = response
            .data
            .into_iter()
            .filter_map(to_product)
            .filter(|product| criteria.matches(product))
            .collect();
        Ok(products)
    }
}

impl DataSourceProvider for EtfComProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Etfcom
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

/// Sectors OR-ed together, then markets OR-ed together, space separated.
fn screener_query(criteria: &SearchCriteria) -> String {
    [&criteria.sectors, &criteria.markets]
        .into_iter()
        .map(|terms| {
            terms
                .iter()
                .map(|term| term.trim())
                .filter(|term| !term.is_empty())
                .collect::<Vec<_>>()
                .join(" OR ")
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_product(row: ScreenerRow) -> Option<Product> {
    let ticker = row.ticker.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
    let ticker = ticker.to_ascii_uppercase();
    let name = row
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| ticker.clone());
    let mut product = Product::new(ticker.clone(), name);

    if let Some(ratio) = row.expense_ratio.filter(|v| v.is_finite() && *v > 0.0) {
        product.ter = ratio;
    }
    let (leveraged, inverse) = structure_flags(&product.name);
    product.is_leveraged = leveraged;
    product.is_inverse = inverse;

    product.data_sources.push(DataSourceRecord::new(
        SourceType::Api,
        ProviderId::Etfcom.display_name(),
        Some(format!("https://www.etf.com/{ticker}")),
        Reliability::Secondary,
    ));
    product.last_updated = Some(UtcDateTime::now());
    Some(product)
}

#[derive(Debug, Deserialize)]
struct ScreenerResponse {
    #[serde(default)]
    data: Vec<ScreenerRow>,
}

#[derive(Debug, Deserialize)]
struct ScreenerRow {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    expense_ratio: Option<f64>,
}
