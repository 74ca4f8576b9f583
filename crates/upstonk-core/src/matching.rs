//! Exposure match scoring: how closely a product's actual exposure covers
//! what the investor asked for.

use serde::{Deserialize, Serialize};

use crate::domain::Product;

const GEOGRAPHY_WEIGHT: f64 = 30.0;
const SECTOR_WEIGHT: f64 = 25.0;
const ASSET_CLASS_WEIGHT: f64 = 25.0;
const COMPANIES_WEIGHT: f64 = 20.0;

/// Score given to every product when the request names no exposure dimension.
pub const NEUTRAL_MATCH_SCORE: f64 = 50.0;

/// The exposure dimensions a request asked for. Blank entries are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestedExposure {
    pub markets: Vec<String>,
    pub sectors: Vec<String>,
    pub asset_classes: Vec<String>,
    pub companies: Vec<String>,
}

impl RequestedExposure {
    pub fn new(
        markets: Vec<String>,
        sectors: Vec<String>,
        asset_classes: Vec<String>,
        companies: Vec<String>,
    ) -> Self {
        Self {
            markets: non_blank(markets),
            sectors: non_blank(sectors),
            asset_classes: non_blank(asset_classes),
            companies: non_blank(companies),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
            && self.sectors.is_empty()
            && self.asset_classes.is_empty()
            && self.companies.is_empty()
    }
}

fn non_blank(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchScorer;

impl MatchScorer {
    /// Match in `0.0..=100.0`, renormalised over the dimensions requested.
    pub fn score(&self, product: &Product, requested: &RequestedExposure) -> f64 {
        let mut total = 0.0;
        let mut max = 0.0;

        if !requested.markets.is_empty() {
            total += geography_match(product, &requested.markets) * GEOGRAPHY_WEIGHT;
            max += GEOGRAPHY_WEIGHT;
        }
        if !requested.sectors.is_empty() {
            total += sector_match(product, &requested.sectors) * SECTOR_WEIGHT;
            max += SECTOR_WEIGHT;
        }
        if !requested.asset_classes.is_empty() {
            total += asset_class_match(product, &requested.asset_classes) * ASSET_CLASS_WEIGHT;
            max += ASSET_CLASS_WEIGHT;
        }
        if !requested.companies.is_empty() {
            total += company_match(product, &requested.companies) * COMPANIES_WEIGHT;
            max += COMPANIES_WEIGHT;
        }

        if max > 0.0 {
            total / max * 100.0
        } else {
            NEUTRAL_MATCH_SCORE
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

fn geography_match(product: &Product, markets: &[String]) -> f64 {
    let sum: f64 = markets
        .iter()
        .filter_map(|market| product.geographic_exposure.region_weight(market))
        .map(|weight| weight / 100.0)
        .sum();
    (sum / markets.len() as f64).clamp(0.0, 1.0)
}

fn sector_match(product: &Product, sectors: &[String]) -> f64 {
    let sum: f64 = sectors
        .iter()
        .flat_map(|wanted| {
            product
                .sector_exposure
                .iter()
                .filter(move |allocation| contains_ignore_case(&allocation.sector, wanted))
        })
        .map(|allocation| allocation.percentage / 100.0)
        .sum();
    (sum / sectors.len() as f64).clamp(0.0, 1.0)
}

fn asset_class_match(product: &Product, asset_classes: &[String]) -> f64 {
    if asset_classes
        .iter()
        .any(|wanted| contains_ignore_case(&product.asset_class, wanted))
    {
        1.0
    } else {
        0.0
    }
}

fn company_match(product: &Product, companies: &[String]) -> f64 {
    let weight: f64 = companies
        .iter()
        .flat_map(|company| {
            product
                .top_holdings
                .iter()
                .filter(move |holding| contains_ignore_case(&holding.name, company))
        })
        .map(|holding| holding.weight)
        .sum();
    (weight / 100.0).clamp(0.0, 1.0)
}
