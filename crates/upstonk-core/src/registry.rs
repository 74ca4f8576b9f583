//! Provider registration and service assembly from configuration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{
    AlphaVantageProvider, CatalogProvider, EtfComProvider, JseListingProvider, YahooQuoteProvider,
};
use crate::aggregator::Aggregator;
use crate::cache::SearchCache;
use crate::config::AppConfig;
use crate::data_source::DataSourceProvider;
use crate::discovery::DiscoveryService;
use crate::eligibility::EligibilityEngine;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::reference::ReferenceData;

/// Builder for the ordered provider list handed to the aggregator.
///
/// Registration order is JSE, ETF.com, Yahoo Finance, Alpha Vantage. Mock mode
/// replaces all of them with the built-in catalog.
///
/// ```rust
/// use upstonk_core::ProviderRegistryBuilder;
///
/// let providers = ProviderRegistryBuilder::default().with_mock_mode().build();
/// assert_eq!(providers.len(), 1);
/// ```
pub struct ProviderRegistryBuilder {
    use_mock: bool,
    reference: Arc<ReferenceData>,
    http: Option<Arc<dyn HttpClient>>,
    alphavantage_api_key: Option<String>,
    alphavantage_max_tickers: usize,
    http_timeout_ms: u64,
    enable_jse: bool,
    enable_etfcom: bool,
    enable_yahoo: bool,
    enable_alphavantage: bool,
}

impl Default for ProviderRegistryBuilder {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ProviderRegistryBuilder {
    pub fn from_config(config: &AppConfig) -> Self {
        let providers = &config.providers;
        Self {
            use_mock: providers.mock,
            reference: Arc::new(config.reference.clone()),
            http: None,
            alphavantage_api_key: providers.alphavantage_api_key.clone(),
            alphavantage_max_tickers: providers.alphavantage_max_tickers,
            http_timeout_ms: providers.http_timeout_ms,
            enable_jse: providers.jse,
            enable_etfcom: providers.etfcom,
            enable_yahoo: providers.yahoo,
            enable_alphavantage: providers.alphavantage,
        }
    }

    pub fn with_mock_mode(mut self) -> Self {
        self.use_mock = true;
        self
    }

    /// Shares one transport across all live providers. Defaults to reqwest.
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_alphavantage_key(mut self, key: impl Into<String>) -> Self {
        self.alphavantage_api_key = Some(key.into());
        self
    }

    pub fn with_jse_enabled(mut self, enabled: bool) -> Self {
        self.enable_jse = enabled;
        self
    }

    pub fn with_etfcom_enabled(mut self, enabled: bool) -> Self {
        self.enable_etfcom = enabled;
        self
    }

    pub fn with_yahoo_enabled(mut self, enabled: bool) -> Self {
        self.enable_yahoo = enabled;
        self
    }

    pub fn with_alphavantage_enabled(mut self, enabled: bool) -> Self {
        self.enable_alphavantage = enabled;
        self
    }

    pub fn build(self) -> Vec<Arc<dyn DataSourceProvider>> {
        if self.use_mock {
            info!("mock mode: serving searches from the reference catalog");
            return vec![Arc::new(CatalogProvider::default())];
        }

        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let mut providers: Vec<Arc<dyn DataSourceProvider>> = Vec::new();

        if self.enable_jse {
            providers.push(Arc::new(
                JseListingProvider::new(Arc::clone(&http), Arc::clone(&self.reference))
                    .with_timeout_ms(self.http_timeout_ms),
            ));
        }

        if self.enable_etfcom {
            providers.push(Arc::new(
                EtfComProvider::new(Arc::clone(&http), Arc::clone(&self.reference))
                    .with_timeout_ms(self.http_timeout_ms),
            ));
        }

        if self.enable_yahoo {
            providers.push(Arc::new(
                YahooQuoteProvider::new(Arc::clone(&http), Arc::clone(&self.reference))
                    .with_timeout_ms(self.http_timeout_ms),
            ));
        }

        if self.enable_alphavantage {
            match self.alphavantage_api_key.as_deref().map(str::trim) {
                Some(key) if !key.is_empty() => providers.push(Arc::new(
                    AlphaVantageProvider::new(Arc::clone(&http), key, Arc::clone(&self.reference))
                        .with_max_tickers(self.alphavantage_max_tickers)
                        .with_timeout_ms(self.http_timeout_ms),
                )),
                _ => info!("alpha vantage disabled: no API key configured"),
            }
        }

        if providers.is_empty() {
            warn!("no live providers enabled, falling back to the reference catalog");
            providers.push(Arc::new(CatalogProvider::default()));
        }
        providers
    }
}

/// Assembles a [`DiscoveryService`] over `providers` with the configured
/// cache, timeouts, rules and coverage.
pub fn discovery_service(
    config: &AppConfig,
    providers: Vec<Arc<dyn DataSourceProvider>>,
) -> DiscoveryService {
    let aggregator = Aggregator::new(providers, SearchCache::new(config.cache_ttl()))
        .with_provider_timeout(config.provider_timeout());

    DiscoveryService::new(
        aggregator,
        EligibilityEngine::from_reference(&config.reference),
        config.reference.coverage.clone(),
    )
    .with_deadline(config.deadline())
    .with_default_max_results(config.request.default_max_results)
}
