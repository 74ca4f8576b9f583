//! Versioned reference tables injected into providers and rules.
//!
//! Everything that grows with coverage (exchange codes, ticker lookups,
//! supported account types, the TFSA provider allowlist) lives here as data.
//! [`ReferenceData::default`] carries the built-in tables; the `[reference]`
//! section of the config file replaces any of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data_source::SearchCriteria;
use crate::eligibility::TfsaZaConfig;

/// Which criteria list a [`TickerRule`] reads its keywords against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickerDimension {
    Market,
    Sector,
    AssetClass,
}

/// Maps requested keywords to the tickers worth fetching for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerRule {
    pub dimension: TickerDimension,
    pub keywords: Vec<String>,
    pub tickers: Vec<String>,
    /// Whole-value match instead of substring match.
    #[serde(default)]
    pub exact: bool,
    /// Only consulted when no regular rule produced a ticker.
    #[serde(default)]
    pub fallback_only: bool,
}

impl TickerRule {
    fn new(dimension: TickerDimension, keywords: &[&str], tickers: &[&str]) -> Self {
        Self {
            dimension,
            keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
            tickers: tickers.iter().map(|t| (*t).to_owned()).collect(),
            exact: false,
            fallback_only: false,
        }
    }

    fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    fn fallback_only(mut self) -> Self {
        self.fallback_only = true;
        self
    }

    fn matches(&self, criteria: &SearchCriteria) -> bool {
        let values = match self.dimension {
            TickerDimension::Market => &criteria.markets,
            TickerDimension::Sector => &criteria.sectors,
            TickerDimension::AssetClass => &criteria.asset_classes,
        };
        values.iter().any(|value| {
            let value = value.trim().to_lowercase();
            self.keywords.iter().any(|keyword| {
                let keyword = keyword.to_lowercase();
                if self.exact {
                    value == keyword
                } else {
                    value.contains(&keyword)
                }
            })
        })
    }
}

/// Ordered keyword rules plus a last-resort ticker list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerTable {
    pub rules: Vec<TickerRule>,
    pub fallback: Vec<String>,
}

impl TickerTable {
    /// Tickers for the criteria, in rule order, without duplicates.
    pub fn tickers_for(&self, criteria: &SearchCriteria) -> Vec<String> {
        let mut tickers = Vec::new();
        self.collect(criteria, false, &mut tickers);
        if tickers.is_empty() {
            self.collect(criteria, true, &mut tickers);
        }
        if tickers.is_empty() {
            tickers.extend(self.fallback.iter().cloned());
        }

        let mut unique: Vec<String> = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            if !unique.contains(&ticker) {
                unique.push(ticker);
            }
        }
        unique
    }

    fn collect(&self, criteria: &SearchCriteria, fallback_only: bool, out: &mut Vec<String>) {
        for rule in self
            .rules
            .iter()
            .filter(|rule| rule.fallback_only == fallback_only)
        {
            if rule.matches(criteria) {
                out.extend(rule.tickers.iter().cloned());
            }
        }
    }
}

/// Country code to account types, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountMatrix(BTreeMap<String, Vec<String>>);

impl AccountMatrix {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        Self(entries)
    }

    pub fn supports(&self, country: &str, account_type: &str) -> bool {
        self.account_types(country)
            .is_some_and(|types| types.iter().any(|t| t.eq_ignore_ascii_case(account_type.trim())))
    }

    pub fn account_types(&self, country: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(country.trim()))
            .map(|(_, types)| types.as_slice())
    }

    pub fn covers_country(&self, country: &str) -> bool {
        self.account_types(country).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(country, types)| (country.as_str(), types.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn matrix(entries: &[(&str, &[&str])]) -> AccountMatrix {
    AccountMatrix(
        entries
            .iter()
            .map(|(country, types)| {
                (
                    (*country).to_owned(),
                    types.iter().map(|t| (*t).to_owned()).collect(),
                )
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub version: String,
    /// Exchange code (upper case) to ISO country code.
    pub exchange_countries: BTreeMap<String, String>,
    /// Countries whose investors only see locally listed products.
    pub local_listing_countries: Vec<String>,
    /// Market names that select the local listing provider from anywhere.
    pub local_market_keywords: Vec<String>,
    pub jse_tickers: TickerTable,
    pub global_tickers: TickerTable,
    pub coverage: AccountMatrix,
    pub unrestricted_accounts: AccountMatrix,
    pub tfsa_za: TfsaZaConfig,
}

impl Default for ReferenceData {
    fn default() -> Self {
        let exchange_countries = [
            ("NYQ", "US"),
            ("NMS", "US"),
            ("PCX", "US"),
            ("NAS", "US"),
            ("NCM", "US"),
            ("NGM", "US"),
            ("NYSE", "US"),
            ("NASDAQ", "US"),
            ("AMEX", "US"),
            ("LSE", "GB"),
            ("LON", "GB"),
            ("JSE", "ZA"),
            ("JNB", "ZA"),
            ("FRA", "DE"),
            ("ETR", "DE"),
            ("XETR", "DE"),
            ("TSE", "JP"),
            ("TYO", "JP"),
            ("ASX", "AU"),
            ("TSX", "CA"),
        ]
        .into_iter()
        .map(|(code, country)| (code.to_owned(), country.to_owned()))
        .collect();

        Self {
            version: String::from("2025.1"),
            exchange_countries,
            local_listing_countries: vec![String::from("ZA")],
            local_market_keywords: vec![String::from("south africa")],
            jse_tickers: default_jse_tickers(),
            global_tickers: default_global_tickers(),
            coverage: matrix(&[
                ("ZA", &["tfsa", "standard"]),
                ("US", &["ira", "roth_ira", "401k", "standard"]),
                ("GB", &["isa", "standard"]),
            ]),
            unrestricted_accounts: matrix(&[
                ("ZA", &["standard"]),
                ("US", &["standard"]),
                ("GB", &["standard"]),
            ]),
            tfsa_za: TfsaZaConfig::default(),
        }
    }
}

impl ReferenceData {
    pub fn country_for_exchange(&self, exchange: &str) -> Option<&str> {
        self.exchange_countries
            .get(&exchange.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn is_local_listing_country(&self, country: &str) -> bool {
        self.local_listing_countries
            .iter()
            .any(|local| local.eq_ignore_ascii_case(country.trim()))
    }

    /// True when the local listing provider should run for these criteria.
    pub fn wants_local_listings(&self, criteria: &SearchCriteria) -> bool {
        self.is_local_listing_country(&criteria.country)
            || self
                .local_market_keywords
                .iter()
                .any(|keyword| criteria.mentions_market(keyword))
    }
}

fn default_jse_tickers() -> TickerTable {
    use TickerDimension::{AssetClass, Market};

    TickerTable {
        rules: vec![
            TickerRule::new(Market, &["emerging", "china", "india"], &["STXEMG", "COREEM"]),
            TickerRule::new(Market, &["africa"], &["STX40", "STXRES"]),
            TickerRule::new(Market, &["usa", "us", "united states"], &["STXNDQ", "STX500"]).exact(),
            TickerRule::new(Market, &["world", "global"], &["STXWDM"]),
            TickerRule::new(Market, &["europe"], &["STXEUR"]),
            TickerRule::new(AssetClass, &["equity"], &["STX40"]).fallback_only(),
        ],
        fallback: Vec::new(),
    }
}

fn default_global_tickers() -> TickerTable {
    use TickerDimension::{AssetClass, Market, Sector};

    TickerTable {
        rules: vec![
            TickerRule::new(Sector, &["technology"], &["QQQ", "XLK", "VGT", "SOXX"]).exact(),
            TickerRule::new(Market, &["usa", "us", "united states"], &["SPY", "VOO", "IVV", "VTI"])
                .exact(),
            TickerRule::new(Market, &["emerging", "emerging markets"], &["EEM", "VWO", "IEMG"])
                .exact(),
            TickerRule::new(Market, &["china"], &["FXI", "MCHI", "ASHR"]).exact(),
            TickerRule::new(Market, &["india"], &["INDA", "EPI", "INDY"]).exact(),
            TickerRule::new(Sector, &["healthcare"], &["XLV", "VHT", "IHI"]).exact(),
            TickerRule::new(Sector, &["financial", "financials"], &["XLF", "VFH"]).exact(),
            TickerRule::new(Sector, &["energy"], &["XLE", "VDE"]).exact(),
            TickerRule::new(Market, &["europe"], &["VGK", "EZU"]).exact(),
            TickerRule::new(Market, &["world", "international"], &["VEU", "VXUS"]).exact(),
            TickerRule::new(AssetClass, &["equity"], &["SPY", "VOO", "VTI", "QQQ", "IVV"])
                .fallback_only(),
            TickerRule::new(AssetClass, &["bond"], &["AGG", "BND", "TLT", "LQD"]).fallback_only(),
        ],
        fallback: ["SPY", "VOO", "QQQ", "VTI", "IVV"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
    }
}
