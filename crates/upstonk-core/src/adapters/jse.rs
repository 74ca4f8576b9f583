use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use super::yahoo::{to_product, YahooClient};
use crate::circuit_breaker::CircuitState;
use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
use crate::domain::{DataSourceRecord, Product, Reliability, SourceType};
use crate::http_client::HttpClient;
use crate::reference::ReferenceData;
use crate::ProviderId;

const LISTING_SUFFIX: &str = ".JO";
const LISTINGS_URL: &str = "https://www.jse.co.za/trade/etfs";

/// Johannesburg-listed ETFs, read through Yahoo's `.JO` quotes.
///
/// Runs when the investor's country only sees local listings, or when a
/// requested market names the local market from elsewhere.
pub struct JseListingProvider {
    client: YahooClient,
    reference: Arc<ReferenceData>,
}

impl JseListingProvider {
    pub fn new(http: Arc<dyn HttpClient>, reference: Arc<ReferenceData>) -> Self {
        Self {
            client: YahooClient::new(ProviderId::Jse, http),
            reference,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.client = self.client.with_timeout_ms(timeout_ms);
        self
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<Product>, SourceError> {
        if !self.reference.wants_local_listings(criteria) {
            return Ok(Vec::new());
        }

        let symbols: Vec<String> = self
            .reference
            .jse_tickers
            .tickers_for(criteria)
            .into_iter()
            .map(|ticker| format!("{ticker}{LISTING_SUFFIX}"))
            .collect();
        if symbols.is_empty() {
            debug!(provider = %ProviderId::Jse, "no JSE tickers for criteria");
            return Ok(Vec::new());
        }

        debug!(provider = %ProviderId::Jse, tickers = ?symbols, "fetching JSE listings");
        let quotes = self.client.fetch_quotes(&symbols).await?;

        let mut products = Vec::with_capacity(quotes.len());
        for quote in quotes {
            let detail = match self.client.fetch_profile(&quote.symbol).await {
                Ok(detail) => Some(detail),
                Err(error) => {
                    debug!(provider = %ProviderId::Jse, ticker = %quote.symbol, code = error.code(), "fund profile unavailable");
                    None
                }
            };

            let mut product = to_product(&quote, detail.as_ref(), &self.reference);
            product.exchange = String::from("JSE");
            product.exchange_country = String::from("ZA");
            if product.currency.is_empty() {
                product.currency = String::from("ZAR");
            }
            product.data_sources.push(DataSourceRecord::new(
                SourceType::ExchangeListing,
                ProviderId::Jse.display_name(),
                Some(String::from(LISTINGS_URL)),
                Reliability::Primary,
            ));

            if criteria.matches(&product) {
                products.push(product);
            }
        }
        Ok(products)
    }
}

impl DataSourceProvider for JseListingProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Jse
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
