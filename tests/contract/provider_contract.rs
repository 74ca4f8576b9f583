use std::sync::Arc;

use upstonk_core::{
    AlphaVantageProvider, CatalogProvider, DataSourceProvider, EtfComProvider, HttpError,
    HttpResponse, JseListingProvider, ProviderId, ReferenceData, ScriptedHttpClient, SearchCriteria,
    SourceErrorKind, YahooQuoteProvider,
};

const YAHOO_QUOTES: &str = r#"{"quoteResponse":{"result":[
    {"symbol":"QQQ","longName":"Invesco QQQ Trust","exchange":"NMS","currency":"USD",
     "netAssets":250000000000,"averageDailyVolume3Month":45000000}
],"error":null}}"#;

const JSE_QUOTES: &str = r#"{"quoteResponse":{"result":[
    {"symbol":"STXNDQ.JO","longName":"Satrix Nasdaq 100 ETF","exchange":"JNB","marketCap":2850000000}
],"error":null}}"#;

const FUND_PROFILE: &str = r#"{"quoteSummary":{"result":[{
    "fundProfile":{"family":"Satrix","categoryName":"Technology"},
    "topHoldings":{"stockPosition":{"raw":1.0},
        "holdings":[{"symbol":"AAPL","holdingName":"Apple Inc","holdingPercent":{"raw":0.087}}],
        "sectorWeightings":[{"technology":{"raw":0.65}}]}
}],"error":null}}"#;

const ETF_PROFILE: &str = r#"{"net_assets":"250000000000","net_expense_ratio":"0.002",
    "leveraged":"NO","sectors":[{"sector":"INFORMATION TECHNOLOGY","weight":"0.58"}],
    "holdings":[{"symbol":"AAPL","description":"APPLE INC","weight":"0.087"}]}"#;

const SCREENER_ROWS: &str = r#"{"data":[
    {"ticker":"XLK","name":"Technology Select Sector SPDR Fund","expense_ratio":0.09}
]}"#;

struct ProviderCase {
    id: ProviderId,
    criteria: SearchCriteria,
    source: Arc<dyn DataSourceProvider>,
    live: bool,
}

fn reference() -> Arc<ReferenceData> {
    Arc::new(ReferenceData::default())
}

fn healthy_cases() -> Vec<ProviderCase> {
    let yahoo_http = Arc::new(
        ScriptedHttpClient::new()
            .with_json("/v7/finance/quote", YAHOO_QUOTES)
            .with_json("/quoteSummary/", FUND_PROFILE),
    );
    let jse_http = Arc::new(
        ScriptedHttpClient::new()
            .with_json("/v7/finance/quote", JSE_QUOTES)
            .with_json("/quoteSummary/", FUND_PROFILE),
    );
    let alphavantage_http =
        Arc::new(ScriptedHttpClient::new().with_json("function=ETF_PROFILE", ETF_PROFILE));
    let etfcom_http = Arc::new(ScriptedHttpClient::new().with_json("/api/screener", SCREENER_ROWS));

    vec![
        ProviderCase {
            id: ProviderId::Catalog,
            criteria: SearchCriteria::new("ZA").with_sectors(["technology"]),
            source: Arc::new(CatalogProvider::default()),
            live: false,
        },
        ProviderCase {
            id: ProviderId::Yahoo,
            criteria: SearchCriteria::new("US").with_sectors(["technology"]),
            source: Arc::new(YahooQuoteProvider::new(yahoo_http, reference())),
            live: true,
        },
        ProviderCase {
            id: ProviderId::Etfcom,
            criteria: SearchCriteria::new("US").with_sectors(["technology"]),
            source: Arc::new(EtfComProvider::new(etfcom_http, reference())),
            live: true,
        },
        ProviderCase {
            id: ProviderId::Jse,
            criteria: SearchCriteria::new("ZA").with_markets(["usa"]),
            source: Arc::new(JseListingProvider::new(jse_http, reference())),
            live: true,
        },
        ProviderCase {
            id: ProviderId::Alphavantage,
            criteria: SearchCriteria::new("US").with_sectors(["technology"]),
            source: Arc::new(
                AlphaVantageProvider::new(alphavantage_http, "demo", reference())
                    .with_max_tickers(2),
            ),
            live: true,
        },
    ]
}

fn failing_cases(http: Arc<ScriptedHttpClient>) -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Yahoo,
            criteria: SearchCriteria::new("US").with_markets(["usa"]),
            source: Arc::new(YahooQuoteProvider::new(http.clone(), reference())),
            live: true,
        },
        ProviderCase {
            id: ProviderId::Etfcom,
            criteria: SearchCriteria::new("US").with_markets(["usa"]),
            source: Arc::new(EtfComProvider::new(http.clone(), reference())),
            live: true,
        },
        ProviderCase {
            id: ProviderId::Jse,
            criteria: SearchCriteria::new("ZA").with_markets(["usa"]),
            source: Arc::new(JseListingProvider::new(http.clone(), reference())),
            live: true,
        },
        ProviderCase {
            id: ProviderId::Alphavantage,
            criteria: SearchCriteria::new("US").with_markets(["usa"]),
            source: Arc::new(
                AlphaVantageProvider::new(http, "demo", reference()).with_max_tickers(1),
            ),
            live: true,
        },
    ]
}

#[tokio::test]
async fn every_provider_reports_its_own_identity() {
    for case in healthy_cases() {
        assert_eq!(case.source.id(), case.id);
        assert_eq!(
            case.source.circuit_state().is_some(),
            case.live,
            "provider '{}': circuit visibility",
            case.id
        );
    }
}

#[tokio::test]
async fn search_returns_keyed_products_with_provenance_for_all_providers() {
    for case in healthy_cases() {
        let products = case
            .source
            .search(&case.criteria)
            .await
            .unwrap_or_else(|error| panic!("provider '{}' search failed: {error}", case.id));
        assert!(!products.is_empty(), "provider '{}': products", case.id);

        for product in &products {
            assert!(
                product.identity_key().is_some(),
                "provider '{}': identity key",
                case.id
            );
            assert!(
                !product.data_sources.is_empty(),
                "provider '{}': provenance for {}",
                case.id,
                product.ticker
            );
            assert!(
                product.ter.is_finite() && product.ter >= 0.0,
                "provider '{}': ter",
                case.id
            );
            assert!(
                product.aum.is_finite() && product.aum >= 0.0,
                "provider '{}': aum",
                case.id
            );
            assert!(
                !(product.is_physical && product.is_synthetic),
                "provider '{}': replication flags are exclusive",
                case.id
            );
        }
    }
}

#[tokio::test]
async fn search_results_respect_the_requested_sector() {
    for case in healthy_cases() {
        let products = case
            .source
            .search(&case.criteria)
            .await
            .unwrap_or_else(|error| panic!("provider '{}' search failed: {error}", case.id));

        for product in products.iter().filter(|p| !p.sector_exposure.is_empty()) {
            if case.criteria.sectors.is_empty() {
                continue;
            }
            assert!(
                product
                    .sector_exposure
                    .iter()
                    .any(|s| s.sector.to_lowercase().contains("technology")),
                "provider '{}': {} matched sector",
                case.id,
                product.ticker
            );
        }
    }
}

#[tokio::test]
async fn unreachable_upstreams_fail_with_structured_errors() {
    let http = Arc::new(
        ScriptedHttpClient::new().with_response("https://", Err(HttpError::new("connection refused"))),
    );

    for case in failing_cases(http) {
        let error = case
            .source
            .search(&case.criteria)
            .await
            .expect_err("transport failure surfaces");
        assert_eq!(
            error.kind(),
            SourceErrorKind::Unavailable,
            "provider '{}': kind",
            case.id
        );
        assert!(error.code().starts_with("source."), "provider '{}'", case.id);
        assert!(!error.message().is_empty(), "provider '{}'", case.id);
    }
}

#[tokio::test]
async fn throttled_upstreams_report_rate_limiting() {
    let http = Arc::new(
        ScriptedHttpClient::new().with_response("https://", Ok(HttpResponse::with_status(429, ""))),
    );

    for case in failing_cases(http) {
        let error = case
            .source
            .search(&case.criteria)
            .await
            .expect_err("429 surfaces");
        assert_eq!(error.code(), "source.rate_limited", "provider '{}'", case.id);
        assert!(error.retryable(), "provider '{}'", case.id);
    }
}

#[tokio::test]
async fn malformed_payloads_are_errors_not_panics() {
    let http = Arc::new(ScriptedHttpClient::new().with_json("https://", "{not json"));

    for case in failing_cases(http) {
        let result = case.source.search(&case.criteria).await;
        assert!(result.is_err(), "provider '{}': malformed body", case.id);
    }
}
