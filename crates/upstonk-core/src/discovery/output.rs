//! Result bundle returned by a discovery run and the shaping that builds it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregator::ProviderFailure;
use crate::domain::{
    Confidence, DiscoveredProduct, EligibilityStatus, SourceType, UtcDateTime,
};
use crate::request::OutputOptions;

/// Upper bound on alternatives listed next to the results.
pub const MAX_ALTERNATIVES: usize = 5;

pub const NO_ELIGIBLE_RESULTS: &str = "NO_ELIGIBLE_RESULTS";
pub const LOW_CONFIDENCE_RESULTS: &str = "LOW_CONFIDENCE_RESULTS";
pub const DEGRADED_DATA_SOURCES: &str = "DEGRADED_DATA_SOURCES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    pub request_id: String,
    pub results: Vec<ProductResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<ProductResult>,
    pub summary: SearchSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    pub generated_at: UtcDateTime,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResult {
    pub ticker: String,
    pub name: String,
    pub isin: String,
    pub exchange: String,
    pub provider: String,
    pub asset_class: String,
    pub tracking_index: String,
    pub geographic_focus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_focus: Option<String>,
    pub ter: f64,
    pub aum: f64,
    pub currency: String,
    pub average_daily_volume: f64,
    pub eligibility: EligibilityDetail,
    pub match_score: f64,
    pub ranking_score: f64,
    pub rank: usize,
    pub asset_breakdown: AssetBreakdown,
    pub geographic_breakdown: GeographicBreakdown,
    pub top_holdings: Vec<HoldingSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_sources: Vec<SourceReference>,
}

/// Eligibility as shown to the investor. The rule lists, warnings and version
/// are only filled in when the request asks for an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityDetail {
    pub status: EligibilityStatus,
    pub is_eligible: bool,
    pub confidence: Confidence,
    pub justification: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_passed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_failed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_version: Option<String>,
}

/// Asset mix in percent; real estate is reported under `other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetBreakdown {
    pub equities: f64,
    pub bonds: f64,
    pub cash: f64,
    pub commodities: f64,
    pub other: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeographicBreakdown {
    pub regions: BTreeMap<String, f64>,
    pub countries: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub name: String,
    pub ticker: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Access date, `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub total_searched: usize,
    /// Eligible plus conditional.
    pub total_eligible: usize,
    pub total_conditional: usize,
    pub total_ineligible: usize,
    pub total_unknown: usize,
    pub search_duration_ms: u64,
    pub data_sources_queried: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
    pub severity: Severity,
}

impl Warning {
    fn new(code: &str, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: code.to_owned(),
            message: message.into(),
            severity,
        }
    }
}

/// Eligibility outcome counts taken right after evaluation, before filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityTally {
    pub eligible: usize,
    pub conditional: usize,
    pub ineligible: usize,
    pub unknown: usize,
}

impl EligibilityTally {
    pub fn count(candidates: &[DiscoveredProduct]) -> Self {
        candidates
            .iter()
            .fold(Self::default(), |mut tally, candidate| {
                match candidate.eligibility.status() {
                    EligibilityStatus::Eligible => tally.eligible += 1,
                    EligibilityStatus::Conditional => tally.conditional += 1,
                    EligibilityStatus::Ineligible => tally.ineligible += 1,
                    EligibilityStatus::Unknown => tally.unknown += 1,
                }
                tally
            })
    }

    pub fn total_eligible(&self) -> usize {
        self.eligible + self.conditional
    }
}

/// Splits ranked candidates into the first `max_results` eligible ones and,
/// when enabled, up to [`MAX_ALTERNATIVES`] of the remaining candidates in
/// rank order, whatever their eligibility.
pub fn split_results(
    ranked: &[DiscoveredProduct],
    max_results: usize,
    include_alternatives: bool,
) -> (Vec<&DiscoveredProduct>, Vec<&DiscoveredProduct>) {
    let mut results = Vec::new();
    let mut alternatives = Vec::new();

    for candidate in ranked {
        if results.len() < max_results && candidate.eligibility.is_eligible() {
            results.push(candidate);
        } else if include_alternatives && alternatives.len() < MAX_ALTERNATIVES {
            alternatives.push(candidate);
        }
    }

    (results, alternatives)
}

pub fn shape_result(candidate: &DiscoveredProduct, options: &OutputOptions) -> ProductResult {
    let product = &candidate.product;
    let eligibility = &candidate.eligibility;

    let justification = if eligibility.reasons.is_empty() {
        String::from("Eligibility could not be determined")
    } else {
        eligibility.justification()
    };
    let mut detail = EligibilityDetail {
        status: eligibility.status(),
        is_eligible: eligibility.is_eligible(),
        confidence: eligibility.confidence,
        justification,
        rules_passed: Vec::new(),
        rules_failed: Vec::new(),
        warnings: Vec::new(),
        rule_version: None,
    };
    if options.explain_eligibility {
        detail.rules_passed = eligibility.rules_passed.clone();
        detail.rules_failed = eligibility.rules_failed.clone();
        detail.warnings = eligibility.warnings().map(str::to_owned).collect();
        detail.rule_version = Some(eligibility.rule_version.clone());
    }

    let exposure = &product.asset_exposure;
    let data_sources = if options.include_source_links {
        product
            .data_sources
            .iter()
            .map(|source| SourceReference {
                source_type: source.source_type,
                provider: source.provider.clone(),
                url: source.url.clone(),
                date: source.accessed_at.format_date(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ProductResult {
        ticker: product.ticker.clone(),
        name: product.name.clone(),
        isin: product.isin.clone(),
        exchange: product.exchange.clone(),
        provider: product.provider.clone(),
        asset_class: product.asset_class.clone(),
        tracking_index: product.tracking_index.clone(),
        geographic_focus: product
            .geographic_exposure
            .dominant_region()
            .unwrap_or_default()
            .to_owned(),
        sector_focus: product.dominant_sector().map(str::to_owned),
        ter: product.ter,
        aum: product.aum,
        currency: product.currency.clone(),
        average_daily_volume: product.average_daily_volume,
        eligibility: detail,
        match_score: candidate.match_score,
        ranking_score: candidate.ranking.total_score,
        rank: candidate.ranking.rank,
        asset_breakdown: AssetBreakdown {
            equities: exposure.equities,
            bonds: exposure.bonds,
            cash: exposure.cash,
            commodities: exposure.commodities,
            other: exposure.other + exposure.real_estate,
        },
        geographic_breakdown: GeographicBreakdown {
            regions: product.geographic_exposure.regions.clone(),
            countries: product.geographic_exposure.countries.clone(),
        },
        top_holdings: product
            .top_holdings
            .iter()
            .map(|holding| HoldingSummary {
                name: holding.name.clone(),
                ticker: holding.ticker.clone(),
                weight: holding.weight,
            })
            .collect(),
        data_sources,
    }
}

/// Advisory warnings for a finished run, in a fixed order.
pub fn collect_warnings(
    results: &[&DiscoveredProduct],
    failures: &[ProviderFailure],
) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if results.is_empty() {
        warnings.push(Warning::new(
            NO_ELIGIBLE_RESULTS,
            "No eligible ETFs found. Consider relaxing constraints or broadening exposure criteria.",
            Severity::Warning,
        ));
    }

    let uncertain = results
        .iter()
        .filter(|candidate| {
            matches!(
                candidate.eligibility.confidence,
                Confidence::Medium | Confidence::Low
            )
        })
        .count();
    if uncertain > 0 {
        warnings.push(Warning::new(
            LOW_CONFIDENCE_RESULTS,
            format!(
                "{uncertain} results have medium or low confidence. Verify eligibility with your platform before investing."
            ),
            Severity::Info,
        ));
    }

    if !failures.is_empty() {
        let names: Vec<&str> = failures
            .iter()
            .map(|failure| failure.provider.display_name())
            .collect();
        warnings.push(Warning::new(
            DEGRADED_DATA_SOURCES,
            format!(
                "Some data sources did not respond: {}. Results may be incomplete.",
                names.join(", ")
            ),
            Severity::Info,
        ));
    }

    warnings
}
