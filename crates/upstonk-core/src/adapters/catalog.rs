use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
use crate::domain::{
    AssetExposure, DataSourceRecord, GeographicExposure, Holding, Product, Reliability,
    SectorAllocation, SourceType, UtcDateTime,
};
use crate::ProviderId;

/// Built-in product catalog for offline runs, demos and tests.
///
/// Answers immediately from memory and never fails.
#[derive(Debug, Clone)]
pub struct CatalogProvider {
    products: Vec<Product>,
}

impl Default for CatalogProvider {
    fn default() -> Self {
        Self::new(builtin_products())
    }
}

impl CatalogProvider {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }
}

impl DataSourceProvider for CatalogProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Catalog
    }

    fn search<'a>(
        &'a self,
        criteria: &'a SearchCriteria,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Product>, SourceError>> + Send + 'a>> {
        let stamp = UtcDateTime::now();
        let products = self
            .products
            .iter()
            .filter(|product| criteria.matches(product))
            .cloned()
            .map(|mut product| {
                for source in &mut product.data_sources {
                    source.accessed_at = stamp;
                }
                product.last_updated.get_or_insert(stamp);
                product
            })
            .collect();
        Box::pin(async move { Ok(products) })
    }
}

fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(key, weight)| ((*key).to_owned(), *weight))
        .collect()
}

fn sectors(entries: &[(&str, f64)]) -> Vec<SectorAllocation> {
    entries
        .iter()
        .map(|(sector, percentage)| SectorAllocation {
            sector: (*sector).to_owned(),
            percentage: *percentage,
        })
        .collect()
}

fn holdings(entries: &[(&str, &str, f64)]) -> Vec<Holding> {
    entries
        .iter()
        .map(|(name, ticker, weight)| Holding {
            name: (*name).to_owned(),
            ticker: (*ticker).to_owned(),
            weight: *weight,
            asset_type: String::from("Stock"),
        })
        .collect()
}

fn source(source_type: SourceType, provider: &str, url: Option<&str>) -> DataSourceRecord {
    DataSourceRecord::new(
        source_type,
        provider,
        url.map(str::to_owned),
        Reliability::Primary,
    )
}

fn equities() -> AssetExposure {
    AssetExposure {
        equities: 100.0,
        ..AssetExposure::default()
    }
}

fn jse_fund(ticker: &str, name: &str, isin: &str, provider: &str) -> Product {
    Product {
        ticker: ticker.to_owned(),
        name: name.to_owned(),
        isin: isin.to_owned(),
        exchange: String::from("JSE"),
        exchange_country: String::from("ZA"),
        domicile: String::from("ZA"),
        legal_structure: String::from("Unit Trust"),
        asset_class: String::from("Equity"),
        currency: String::from("ZAR"),
        provider: provider.to_owned(),
        ..Product::default()
    }
}

fn us_fund(ticker: &str, name: &str, isin: &str, provider: &str) -> Product {
    Product {
        ticker: ticker.to_owned(),
        name: name.to_owned(),
        isin: isin.to_owned(),
        exchange: String::from("NYSE"),
        exchange_country: String::from("US"),
        domicile: String::from("US"),
        legal_structure: String::from("Exchange Traded Fund"),
        asset_class: String::from("Equity"),
        currency: String::from("USD"),
        provider: provider.to_owned(),
        ..Product::default()
    }
}

pub fn builtin_products() -> Vec<Product> {
    let mut stxndq = jse_fund("STXNDQ", "Satrix NASDAQ 100 ETF", "ZAE000195568", "Satrix");
    stxndq.is_physical = true;
    stxndq.replication_method = String::from("Physical Full");
    stxndq.tracking_index = String::from("NASDAQ-100 Index");
    stxndq.asset_exposure = equities();
    stxndq.geographic_exposure = GeographicExposure {
        regions: weights(&[("usa", 100.0)]),
        countries: weights(&[("US", 100.0)]),
    };
    stxndq.sector_exposure = sectors(&[
        ("Technology", 65.0),
        ("Consumer Discretionary", 15.0),
        ("Healthcare", 10.0),
        ("Communication Services", 10.0),
    ]);
    stxndq.top_holdings = holdings(&[
        ("Apple Inc.", "AAPL", 8.7),
        ("Microsoft Corporation", "MSFT", 7.9),
        ("NVIDIA Corporation", "NVDA", 6.2),
        ("Amazon.com Inc.", "AMZN", 5.1),
        ("Meta Platforms Inc.", "META", 4.3),
    ]);
    stxndq.ter = 0.45;
    stxndq.tracking_difference = Some(0.15);
    stxndq.aum = 2_850_000_000.0;
    stxndq.dividend_treatment = String::from("Distributing");
    stxndq.average_daily_volume = 1_250_000.0;
    stxndq.bid_ask_spread = 0.02;
    stxndq.inception_date = UtcDateTime::from_ymd(2015, 1, 1);
    stxndq.data_sources = vec![
        source(
            SourceType::ExchangeListing,
            "JSE",
            Some("https://www.jse.co.za/trade/etfs/satrix-nasdaq-100-etf"),
        ),
        source(
            SourceType::FactSheet,
            "Satrix",
            Some("https://www.satrix.co.za/products/satrix-nasdaq-100-etf"),
        ),
    ];

    let mut cloud = jse_fund(
        "CLOUD",
        "Cloud Atlas AMI Big Tech ETF",
        "ZAE000283511",
        "Cloud Atlas",
    );
    cloud.is_physical = true;
    cloud.replication_method = String::from("Physical Sampling");
    cloud.tracking_index = String::from("Solactive Cloud Atlas AMI Big Tech Index");
    cloud.asset_exposure = equities();
    cloud.geographic_exposure.regions = weights(&[("usa", 100.0)]);
    cloud.sector_exposure = sectors(&[("Technology", 80.0), ("Communication Services", 20.0)]);
    cloud.top_holdings = holdings(&[
        ("Apple Inc.", "AAPL", 11.2),
        ("Microsoft Corporation", "MSFT", 10.8),
        ("Alphabet Inc. Class A", "GOOGL", 9.3),
        ("Amazon.com Inc.", "AMZN", 8.7),
        ("NVIDIA Corporation", "NVDA", 7.9),
    ]);
    cloud.ter = 0.49;
    cloud.tracking_difference = Some(0.18);
    cloud.aum = 450_000_000.0;
    cloud.dividend_treatment = String::from("Accumulating");
    cloud.average_daily_volume = 320_000.0;
    cloud.bid_ask_spread = 0.05;
    cloud.inception_date = UtcDateTime::from_ymd(2020, 6, 1);
    cloud.data_sources = vec![source(SourceType::ExchangeListing, "JSE", None)];

    let mut stxemg = jse_fund(
        "STXEMG",
        "Satrix MSCI Emerging Markets ETF",
        "ZAE000210641",
        "Satrix",
    );
    stxemg.is_synthetic = true;
    stxemg.replication_method = String::from("Synthetic Swap");
    stxemg.tracking_index = String::from("MSCI Emerging Markets Index");
    stxemg.asset_exposure = equities();
    stxemg.geographic_exposure = GeographicExposure {
        regions: weights(&[("asia", 68.0), ("emerging_markets", 100.0)]),
        countries: weights(&[
            ("CN", 28.5),
            ("IN", 18.2),
            ("TW", 14.7),
            ("KR", 12.3),
            ("BR", 6.8),
        ]),
    };
    stxemg.sector_exposure = sectors(&[
        ("Technology", 35.0),
        ("Financials", 25.0),
        ("Consumer Discretionary", 15.0),
        ("Communication Services", 10.0),
    ]);
    stxemg.top_holdings = holdings(&[
        ("Taiwan Semiconductor Manufacturing", "2330 TT", 7.8),
        ("Samsung Electronics Co Ltd", "005930 KS", 4.5),
        ("Tencent Holdings Ltd", "700 HK", 4.2),
        ("Alibaba Group Holding Ltd", "9988 HK", 3.1),
    ]);
    stxemg.ter = 0.45;
    stxemg.tracking_difference = Some(0.12);
    stxemg.aum = 1_200_000_000.0;
    stxemg.dividend_treatment = String::from("Distributing");
    stxemg.average_daily_volume = 580_000.0;
    stxemg.bid_ask_spread = 0.03;
    stxemg.inception_date = UtcDateTime::from_ymd(2014, 3, 1);
    stxemg.data_sources = vec![source(SourceType::ExchangeListing, "JSE", None)];

    let mut stx40 = jse_fund("STX40", "Satrix 40 ETF", "ZAE000027108", "Satrix");
    stx40.is_physical = true;
    stx40.replication_method = String::from("Physical Full");
    stx40.tracking_index = String::from("FTSE/JSE Top 40 Index");
    stx40.asset_exposure = equities();
    stx40.geographic_exposure = GeographicExposure {
        regions: weights(&[("south_africa", 100.0)]),
        countries: weights(&[("ZA", 100.0)]),
    };
    stx40.sector_exposure = sectors(&[
        ("Basic Materials", 30.0),
        ("Financials", 24.0),
        ("Technology", 18.0),
        ("Consumer Staples", 12.0),
    ]);
    stx40.top_holdings = holdings(&[
        ("Naspers Ltd", "NPN", 14.1),
        ("FirstRand Ltd", "FSR", 6.2),
        ("Anglo American Plc", "AGL", 5.8),
    ]);
    stx40.ter = 0.10;
    stx40.tracking_difference = Some(0.05);
    stx40.aum = 15_000_000_000.0;
    stx40.dividend_treatment = String::from("Distributing");
    stx40.average_daily_volume = 2_400_000.0;
    stx40.bid_ask_spread = 0.01;
    stx40.inception_date = UtcDateTime::from_ymd(2000, 11, 1);
    stx40.data_sources = vec![source(
        SourceType::ExchangeListing,
        "JSE",
        Some("https://www.jse.co.za/trade/etfs"),
    )];

    let mut spy = us_fund("SPY", "SPDR S&P 500 ETF Trust", "US78462F1030", "State Street");
    spy.is_physical = true;
    spy.replication_method = String::from("Physical Full");
    spy.tracking_index = String::from("S&P 500 Index");
    spy.asset_exposure = equities();
    spy.geographic_exposure = GeographicExposure {
        regions: weights(&[("usa", 100.0)]),
        countries: weights(&[("US", 100.0)]),
    };
    spy.sector_exposure = sectors(&[
        ("Technology", 31.0),
        ("Financials", 13.0),
        ("Healthcare", 12.0),
    ]);
    spy.top_holdings = holdings(&[
        ("Apple Inc.", "AAPL", 7.1),
        ("Microsoft Corporation", "MSFT", 6.8),
        ("NVIDIA Corporation", "NVDA", 6.1),
    ]);
    spy.ter = 0.09;
    spy.tracking_difference = Some(0.02);
    spy.aum = 500_000_000_000.0;
    spy.dividend_treatment = String::from("Distributing");
    spy.average_daily_volume = 75_000_000.0;
    spy.bid_ask_spread = 0.01;
    spy.inception_date = UtcDateTime::from_ymd(1993, 1, 22);
    spy.data_sources = vec![source(
        SourceType::FactSheet,
        "State Street",
        Some("https://www.ssga.com/us/en/intermediary/etfs/spy"),
    )];

    let mut qqq = us_fund("QQQ", "Invesco QQQ Trust", "US46090E1038", "Invesco");
    qqq.exchange = String::from("NASDAQ");
    qqq.is_physical = true;
    qqq.replication_method = String::from("Physical Full");
    qqq.tracking_index = String::from("NASDAQ-100 Index");
    qqq.asset_exposure = equities();
    qqq.geographic_exposure = GeographicExposure {
        regions: weights(&[("usa", 100.0)]),
        countries: weights(&[("US", 100.0)]),
    };
    qqq.sector_exposure = sectors(&[
        ("Technology", 58.0),
        ("Consumer Discretionary", 18.0),
        ("Communication Services", 15.0),
    ]);
    qqq.top_holdings = holdings(&[
        ("Apple Inc.", "AAPL", 8.9),
        ("Microsoft Corporation", "MSFT", 8.1),
        ("NVIDIA Corporation", "NVDA", 7.6),
    ]);
    qqq.ter = 0.20;
    qqq.aum = 250_000_000_000.0;
    qqq.dividend_treatment = String::from("Distributing");
    qqq.average_daily_volume = 45_000_000.0;
    qqq.bid_ask_spread = 0.01;
    qqq.inception_date = UtcDateTime::from_ymd(1999, 3, 10);
    qqq.data_sources = vec![source(
        SourceType::Api,
        "Yahoo Finance",
        Some("https://finance.yahoo.com/quote/QQQ"),
    )];

    let mut qld = us_fund("QLD", "ProShares Ultra QQQ 2x", "US74347R2067", "ProShares");
    qld.is_synthetic = true;
    qld.is_leveraged = true;
    qld.replication_method = String::from("Synthetic Swap");
    qld.tracking_index = String::from("NASDAQ-100 Index");
    qld.asset_exposure = equities();
    qld.geographic_exposure.regions = weights(&[("usa", 100.0)]);
    qld.sector_exposure = sectors(&[("Technology", 58.0), ("Consumer Discretionary", 18.0)]);
    qld.ter = 0.95;
    qld.tracking_difference = Some(1.4);
    qld.aum = 7_000_000_000.0;
    qld.average_daily_volume = 3_000_000.0;
    qld.data_sources = vec![source(
        SourceType::Api,
        "Yahoo Finance",
        Some("https://finance.yahoo.com/quote/QLD"),
    )];

    let mut agg = us_fund(
        "AGG",
        "iShares Core US Aggregate Bond ETF",
        "US4642872265",
        "iShares",
    );
    agg.is_physical = true;
    agg.replication_method = String::from("Physical Sampling");
    agg.asset_class = String::from("Fixed Income");
    agg.tracking_index = String::from("Bloomberg US Aggregate Bond Index");
    agg.asset_exposure = AssetExposure {
        bonds: 98.0,
        cash: 2.0,
        ..AssetExposure::default()
    };
    agg.geographic_exposure = GeographicExposure {
        regions: weights(&[("usa", 100.0)]),
        countries: weights(&[("US", 100.0)]),
    };
    agg.ter = 0.03;
    agg.tracking_difference = Some(0.04);
    agg.aum = 115_000_000_000.0;
    agg.average_daily_volume = 7_500_000.0;
    agg.data_sources = vec![source(
        SourceType::FactSheet,
        "iShares",
        Some("https://www.ishares.com/us/products/239458/"),
    )];

    vec![stxndq, cloud, stxemg, stx40, spy, qqq, qld, agg]
}
