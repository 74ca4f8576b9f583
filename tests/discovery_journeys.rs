//! End-to-end discovery journeys through the full pipeline.
//!
//! Each journey builds a service over deterministic providers, runs a
//! request and checks the shaped result bundle an investor would receive.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use upstonk_core::discovery::{NO_ELIGIBLE_RESULTS, LOW_CONFIDENCE_RESULTS};
use upstonk_core::domain::{Holding, SectorAllocation};
use upstonk_core::matching::NEUTRAL_MATCH_SCORE;
use upstonk_core::{
    discovery_service, AppConfig, CatalogProvider, DataSourceProvider, DiscoveryError,
    DiscoveryRequest, EligibilityStatus, Product, ProviderId, SearchCriteria, SourceError,
};

type SearchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Product>, SourceError>> + Send + 'a>>;

struct FixedProvider {
    id: ProviderId,
    products: Vec<Product>,
    calls: AtomicUsize,
}

impl FixedProvider {
    fn new(id: ProviderId, products: Vec<Product>) -> Arc<Self> {
        Arc::new(Self {
            id,
            products,
            calls: AtomicUsize::new(0),
        })
    }
}

impl DataSourceProvider for FixedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn search<'a>(&'a self, _criteria: &'a SearchCriteria) -> SearchFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let products = self.products.clone();
        Box::pin(async move { Ok(products) })
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.request.deadline_ms = 5_000;
    config
}

fn satrix_nasdaq() -> Product {
    let mut product = Product::new("STXNDQ", "Satrix NASDAQ 100 ETF");
    product.exchange = String::from("JSE");
    product.exchange_country = String::from("ZA");
    product.currency = String::from("ZAR");
    product.provider = String::from("Satrix");
    product.asset_class = String::from("Equity");
    product.is_physical = true;
    product.ter = 0.45;
    product.aum = 2_850_000_000.0;
    product.average_daily_volume = 1_250_000.0;
    product.tracking_difference = Some(0.15);
    product
        .geographic_exposure
        .regions
        .insert(String::from("usa"), 100.0);
    product.sector_exposure = vec![SectorAllocation {
        sector: String::from("Technology"),
        percentage: 65.0,
    }];
    product
}

fn leveraged_nasdaq() -> Product {
    let mut product = Product::new("QLD", "ProShares Ultra QQQ 2x");
    product.exchange = String::from("NASDAQ");
    product.exchange_country = String::from("US");
    product.currency = String::from("USD");
    product.provider = String::from("ProShares");
    product.asset_class = String::from("Equity");
    product.is_synthetic = true;
    product.is_leveraged = true;
    product.ter = 0.95;
    product.aum = 6_000_000_000.0;
    product.average_daily_volume = 3_000_000.0;
    product
        .geographic_exposure
        .regions
        .insert(String::from("usa"), 100.0);
    product.sector_exposure = vec![SectorAllocation {
        sector: String::from("Technology"),
        percentage: 58.0,
    }];
    product
}

fn tfsa_tech_request() -> DiscoveryRequest {
    let mut request = DiscoveryRequest::new("ZA", "tfsa");
    request.exposure.assets.sectors = vec![String::from("technology")];
    request.exposure.geography.markets = vec![String::from("usa")];
    request.constraints.tfsa_eligible_only = true;
    request.constraints.max_ter = 0.75;
    request.output_options.include_alternatives = true;
    request.output_options.explain_eligibility = true;
    request.output_options.include_warnings = true;
    request
}

// =============================================================================
// Journey: South African TFSA investor looking for US technology
// =============================================================================

#[tokio::test]
async fn tfsa_investor_gets_the_local_fund_and_never_the_leveraged_one() {
    // Given: A provider offering a JSE Satrix fund and a leveraged US fund
    let provider = FixedProvider::new(
        ProviderId::Catalog,
        vec![leveraged_nasdaq(), satrix_nasdaq()],
    );
    let service = discovery_service(&config(), vec![provider]);

    // When: A TFSA investor asks for US technology with a TER cap
    let response = service
        .discover(&tfsa_tech_request())
        .await
        .expect("discovery succeeds");

    // Then: Exactly the Satrix fund is returned, ranked first
    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert_eq!(result.ticker, "STXNDQ");
    assert_eq!(result.rank, 1);
    assert!(matches!(
        result.eligibility.status,
        EligibilityStatus::Eligible | EligibilityStatus::Conditional
    ));
    assert!(result.eligibility.rules_failed.is_empty());
    assert!(result.match_score > 0.0);

    // And: The leveraged fund is not even offered as an alternative
    assert!(response
        .alternatives
        .iter()
        .all(|alternative| alternative.ticker != "QLD"));

    // And: The summary counts every candidate evaluated
    assert_eq!(response.summary.total_searched, 2);
    assert_eq!(response.summary.total_eligible, 1);
    assert_eq!(response.summary.total_ineligible, 1);
    assert!(!response.cache_hit);
}

#[tokio::test]
async fn catalog_backed_tfsa_run_prefers_the_cheaper_liquid_fund() {
    // Given: The reference catalog in mock mode
    let mut config = config();
    config.providers.mock = true;
    let service = discovery_service(&config, vec![Arc::new(CatalogProvider::default())]);

    // When: The TFSA technology request runs with source links
    let mut request = tfsa_tech_request();
    request.output_options.include_source_links = true;
    let response = service.discover(&request).await.expect("catalog answers");

    // Then: Only JSE-listed funds appear and STXNDQ leads
    assert_eq!(response.results[0].ticker, "STXNDQ");
    assert!(response.results.iter().all(|result| result.exchange == "JSE"));
    assert!(response.results[0]
        .data_sources
        .iter()
        .any(|source| source.url.as_deref().is_some_and(|url| url.contains("jse.co.za"))));
    let ranks: Vec<usize> = response.results.iter().map(|result| result.rank).collect();
    assert!(ranks.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn when_constraints_remove_everything_the_bundle_warns() {
    // Given: Only the leveraged fund is on offer
    let provider = FixedProvider::new(ProviderId::Yahoo, vec![leveraged_nasdaq()]);
    let service = discovery_service(&config(), vec![provider]);

    // When: The TFSA request runs
    let response = service
        .discover(&tfsa_tech_request())
        .await
        .expect("candidates existed, so this is not a no-results failure");

    // Then: No results, and the investor is told why
    assert!(response.results.is_empty());
    assert!(response.alternatives.is_empty());
    assert_eq!(response.warnings[0].code, NO_ELIGIBLE_RESULTS);
}

// =============================================================================
// Journey: Standard account investor with complementary sources
// =============================================================================

#[tokio::test]
async fn complementary_sources_are_merged_before_ranking() {
    // Given: One source with fund size but no holdings, another with the reverse
    let mut sized = satrix_nasdaq();
    sized.top_holdings.clear();
    let mut detailed = Product::new("STXNDQ", "");
    detailed.aum = 0.0;
    detailed.top_holdings = vec![Holding {
        name: String::from("Apple Inc."),
        ticker: String::from("AAPL"),
        weight: 8.7,
        asset_type: String::from("Equity"),
    }];
    let service = discovery_service(
        &config(),
        vec![
            FixedProvider::new(ProviderId::Jse, vec![sized]),
            FixedProvider::new(ProviderId::Yahoo, vec![detailed]),
        ],
    );

    // When: A standard-account investor asks for Apple exposure
    let mut request = DiscoveryRequest::new("ZA", "standard");
    request.exposure.assets.companies = vec![String::from("Apple")];
    request.output_options.include_warnings = true;
    let response = service.discover(&request).await.expect("discovery succeeds");

    // Then: One merged result carries both the AUM and the holding
    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert_eq!(result.aum, 2_850_000_000.0);
    assert_eq!(result.top_holdings.len(), 1);
    assert_eq!(
        response.summary.data_sources_queried,
        ["JSE", "Yahoo Finance"]
    );

    // And: The unrestricted rule's medium confidence is flagged
    assert!(response
        .warnings
        .iter()
        .any(|warning| warning.code == LOW_CONFIDENCE_RESULTS));
}

#[tokio::test]
async fn without_exposure_criteria_every_match_score_is_neutral() {
    // Given: Two funds
    let provider = FixedProvider::new(
        ProviderId::Catalog,
        vec![satrix_nasdaq(), leveraged_nasdaq()],
    );
    let service = discovery_service(&config(), vec![provider]);

    // When: A request with no exposure dimensions reaches the pipeline
    let request = DiscoveryRequest::new("US", "standard");
    let response = service.discover(&request).await.expect("discovery succeeds");

    // Then: Matching is neutral for all of them
    assert_eq!(response.results.len(), 2);
    assert!(response
        .results
        .iter()
        .all(|result| result.match_score == NEUTRAL_MATCH_SCORE));
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    // Given: A counting provider behind the configured cache
    let provider = FixedProvider::new(ProviderId::Catalog, vec![satrix_nasdaq()]);
    let service = discovery_service(&config(), vec![provider.clone()]);
    let request = tfsa_tech_request();

    // When: The same request runs twice
    let first = service.discover(&request).await.expect("first run");
    let second = service.discover(&request).await.expect("second run");

    // Then: The provider is called once and the second bundle says so
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_ne!(first.request_id, second.request_id);
}

// =============================================================================
// Journey: Failures the investor must be told about
// =============================================================================

#[tokio::test]
async fn when_no_provider_finds_anything_the_run_reports_no_results() {
    // Given: A provider with nothing on offer
    let provider = FixedProvider::new(ProviderId::Catalog, Vec::new());
    let service = discovery_service(&config(), vec![provider]);

    // When: A request runs
    let error = service
        .discover(&tfsa_tech_request())
        .await
        .expect_err("nothing to rank");

    // Then: It is the distinct no-results condition, not a client error
    assert_eq!(error, DiscoveryError::NoResults);
    assert!(!error.is_client_error());
}

#[tokio::test]
async fn when_the_jurisdiction_is_not_covered_the_request_is_rejected() {
    // Given: The default coverage
    let provider = FixedProvider::new(ProviderId::Catalog, vec![satrix_nasdaq()]);
    let service = discovery_service(&config(), vec![provider.clone()])
        .with_deadline(Duration::from_secs(1));

    // When: A French PEA investor asks
    let mut request = DiscoveryRequest::new("FR", "pea");
    request.exposure.assets.sectors = vec![String::from("technology")];
    let error = service.discover(&request).await.expect_err("FR is not covered");

    // Then: The error is a client error and no provider was bothered
    assert!(matches!(error, DiscoveryError::UnsupportedJurisdiction { .. }));
    assert!(error.is_client_error());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}
