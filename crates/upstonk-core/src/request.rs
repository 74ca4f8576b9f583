//! Inbound discovery request and its business validation.
//!
//! The request is decoded from camelCase JSON. Every section may be omitted
//! and falls back to its empty default; [`DiscoveryRequest::validate`] then
//! decides whether the result is usable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MAX_RESULTS_LIMIT;
use crate::data_source::SearchCriteria;
use crate::domain::RankingFactor;
use crate::matching::RequestedExposure;
use crate::ranking::RankingWeights;
use crate::reference::AccountMatrix;
use crate::ValidationError;

pub const SUPPORTED_VEHICLES: [&str; 4] = ["etf", "stock", "bond", "fund"];
pub const RISK_TOLERANCES: [&str; 3] = ["conservative", "moderate", "aggressive"];
pub const EMERGING_MARKETS: &str = "emerging markets";
pub const DEVELOPED_MARKETS: &str = "developed markets";
pub const MAX_TER_LIMIT: f64 = 5.0;

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryRequest {
    pub investor_profile: InvestorProfile,
    pub exposure: ExposureRequest,
    pub investment_vehicles: Vec<String>,
    pub constraints: Constraints,
    pub ranking_preferences: RankingPreferences,
    pub output_options: OutputOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvestorProfile {
    pub country: String,
    pub account_type: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_tolerance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_horizon_years: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExposureRequest {
    pub assets: AssetCriteria,
    pub geography: GeographyCriteria,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetCriteria {
    pub companies: Vec<String>,
    pub sectors: Vec<String>,
    pub asset_classes: Vec<String>,
    /// Accepted for completeness; not used for search or matching.
    pub indices: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeographyCriteria {
    pub markets: Vec<String>,
    pub emerging_markets: bool,
    pub developed_markets: bool,
    /// ISO country codes; products with more than half their exposure in one
    /// of these are filtered out.
    pub exclude_countries: Vec<String>,
}

/// Hard filters applied after eligibility evaluation. Zero thresholds are off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraints {
    pub tfsa_eligible_only: bool,
    pub allowed_exchanges: Vec<String>,
    #[serde(rename = "maxTER")]
    pub max_ter: f64,
    #[serde(rename = "minAUM")]
    pub min_aum: f64,
    #[serde(rename = "excludeSyntheticETFs")]
    pub exclude_synthetic: bool,
    #[serde(rename = "excludeLeveragedETFs")]
    pub exclude_leveraged: bool,
    #[serde(rename = "excludeInverseETFs")]
    pub exclude_inverse: bool,
    pub physical_only: bool,
    pub min_liquidity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingPreferences {
    pub priority: Vec<String>,
    pub weighting: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
    /// Zero means "use the configured default".
    pub max_results: usize,
    pub include_alternatives: bool,
    pub include_source_links: bool,
    pub explain_eligibility: bool,
    pub include_warnings: bool,
}

impl DiscoveryRequest {
    pub fn new(country: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            investor_profile: InvestorProfile {
                country: country.into(),
                account_type: account_type.into(),
                ..InvestorProfile::default()
            },
            investment_vehicles: vec![String::from("etf")],
            ..Self::default()
        }
    }

    pub fn country(&self) -> &str {
        self.investor_profile.country.trim()
    }

    pub fn account_type(&self) -> &str {
        self.investor_profile.account_type.trim()
    }

    /// Business validation against the supported jurisdictions.
    pub fn validate(&self, coverage: &AccountMatrix) -> Result<(), ValidationError> {
        let profile = &self.investor_profile;
        if self.country().is_empty() {
            return Err(ValidationError::EmptyCountry);
        }
        if self.account_type().is_empty() {
            return Err(ValidationError::EmptyAccountType);
        }
        if !coverage.supports(self.country(), self.account_type()) {
            return Err(ValidationError::UnsupportedAccountType {
                country: self.country().to_owned(),
                account_type: self.account_type().to_owned(),
            });
        }
        if let Some(tolerance) = &profile.risk_tolerance {
            let known = RISK_TOLERANCES
                .iter()
                .any(|known| known.eq_ignore_ascii_case(tolerance.trim()));
            if !known {
                return Err(ValidationError::InvalidRiskTolerance(tolerance.clone()));
            }
        }
        if let Some(years) = profile.time_horizon_years {
            if !(1..=50).contains(&years) {
                return Err(ValidationError::TimeHorizonOutOfRange { value: years });
            }
        }

        if self.investment_vehicles.is_empty() {
            return Err(ValidationError::NoInvestmentVehicles);
        }
        if let Some(vehicle) = self.investment_vehicles.iter().find(|vehicle| {
            !SUPPORTED_VEHICLES
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(vehicle.trim()))
        }) {
            return Err(ValidationError::InvalidVehicle(vehicle.clone()));
        }

        if !self.has_exposure_criteria() {
            return Err(ValidationError::NoExposureCriteria);
        }

        let weighting = &self.ranking_preferences.weighting;
        if let Some(factor) = weighting
            .keys()
            .find(|factor| RankingFactor::parse(factor).is_none())
        {
            return Err(ValidationError::UnknownRankingFactor(factor.clone()));
        }
        if let Some((factor, _)) = weighting
            .iter()
            .find(|(_, weight)| !weight.is_finite() || **weight < 0.0)
        {
            return Err(ValidationError::InvalidWeight {
                factor: factor.clone(),
            });
        }
        if !weighting.is_empty() {
            let sum: f64 = weighting.values().sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(ValidationError::WeightsDoNotSum { sum });
            }
        }

        let max_results = self.output_options.max_results;
        if max_results > MAX_RESULTS_LIMIT {
            return Err(ValidationError::MaxResultsOutOfRange {
                value: max_results,
                max: MAX_RESULTS_LIMIT,
            });
        }

        let max_ter = self.constraints.max_ter;
        if !max_ter.is_finite() || !(0.0..=MAX_TER_LIMIT).contains(&max_ter) {
            return Err(ValidationError::MaxTerOutOfRange { value: max_ter });
        }

        Ok(())
    }

    /// Companies, sectors, asset classes and markets count; indices do not.
    pub fn has_exposure_criteria(&self) -> bool {
        let assets = &self.exposure.assets;
        let any = |values: &[String]| values.iter().any(|value| !value.trim().is_empty());
        any(&assets.companies)
            || any(&assets.sectors)
            || any(&assets.asset_classes)
            || !self.effective_markets().is_empty()
    }

    /// Requested markets plus the emerging/developed flags, without duplicates.
    pub fn effective_markets(&self) -> Vec<String> {
        let geography = &self.exposure.geography;
        let mut markets: Vec<String> = geography
            .markets
            .iter()
            .filter(|market| !market.trim().is_empty())
            .cloned()
            .collect();

        let flagged = [
            (geography.emerging_markets, EMERGING_MARKETS),
            (geography.developed_markets, DEVELOPED_MARKETS),
        ];
        for (enabled, market) in flagged {
            let present = markets
                .iter()
                .any(|existing| existing.trim().eq_ignore_ascii_case(market));
            if enabled && !present {
                markets.push(market.to_owned());
            }
        }
        markets
    }

    pub fn search_criteria(&self) -> SearchCriteria {
        let assets = &self.exposure.assets;
        SearchCriteria::new(self.country())
            .with_markets(self.effective_markets())
            .with_sectors(assets.sectors.iter().cloned())
            .with_asset_classes(assets.asset_classes.iter().cloned())
            .with_companies(assets.companies.iter().cloned())
            .with_vehicles(self.investment_vehicles.iter().cloned())
    }

    pub fn requested_exposure(&self) -> RequestedExposure {
        let assets = &self.exposure.assets;
        RequestedExposure::new(
            self.effective_markets(),
            assets.sectors.clone(),
            assets.asset_classes.clone(),
            assets.companies.clone(),
        )
    }

    pub fn ranking_weights(&self) -> RankingWeights {
        RankingWeights::from_preferences(&self.ranking_preferences.weighting)
    }

    /// Requested result count, or `default` when the request leaves it at zero.
    pub fn max_results_or(&self, default: usize) -> usize {
        match self.output_options.max_results {
            0 => default.max(1),
            requested => requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    fn coverage() -> AccountMatrix {
        ReferenceData::default().coverage
    }

    fn tech_request() -> DiscoveryRequest {
        let mut request = DiscoveryRequest::new("ZA", "tfsa");
        request.exposure.assets.sectors = vec![String::from("technology")];
        request
    }

    #[test]
    fn decodes_camel_case_with_explicit_acronym_fields() {
        let request: DiscoveryRequest = serde_json::from_str(
            r#"{
                "investorProfile": {"country": "ZA", "accountType": "tfsa", "currency": "ZAR"},
                "exposure": {
                    "assets": {"sectors": ["technology"]},
                    "geography": {"markets": ["usa"], "emergingMarkets": true}
                },
                "investmentVehicles": ["etf"],
                "constraints": {
                    "tfsaEligibleOnly": true,
                    "maxTER": 0.75,
                    "minAUM": 1000000,
                    "excludeLeveragedETFs": true
                },
                "rankingPreferences": {"weighting": {"fees": 0.5, "liquidity": 0.5}},
                "outputOptions": {"maxResults": 5, "explainEligibility": true}
            }"#,
        )
        .expect("request decodes");

        assert_eq!(request.account_type(), "tfsa");
        assert!(request.constraints.tfsa_eligible_only);
        assert_eq!(request.constraints.max_ter, 0.75);
        assert_eq!(request.constraints.min_aum, 1_000_000.0);
        assert!(request.constraints.exclude_leveraged);
        assert!(!request.constraints.exclude_synthetic);
        assert_eq!(request.output_options.max_results, 5);
        assert_eq!(
            request.effective_markets(),
            vec![String::from("usa"), String::from(EMERGING_MARKETS)]
        );
        assert!(request.validate(&coverage()).is_ok());
    }

    #[test]
    fn rejects_uncovered_jurisdictions_and_missing_profile() {
        let mut request = tech_request();
        request.investor_profile.country.clear();
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::EmptyCountry)
        );

        let request = {
            let mut request = tech_request();
            request.investor_profile.account_type = String::from("isa");
            request
        };
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::UnsupportedAccountType {
                country: String::from("ZA"),
                account_type: String::from("isa"),
            })
        );
    }

    #[test]
    fn rejects_unknown_vehicles_and_empty_exposure() {
        let mut request = tech_request();
        request.investment_vehicles = vec![String::from("ETF"), String::from("crypto")];
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::InvalidVehicle(String::from("crypto")))
        );

        let mut request = DiscoveryRequest::new("ZA", "tfsa");
        request.exposure.assets.indices = vec![String::from("NASDAQ-100")];
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::NoExposureCriteria)
        );

        request.exposure.geography.developed_markets = true;
        assert!(request.validate(&coverage()).is_ok());
    }

    #[test]
    fn weights_must_sum_to_one_within_tolerance() {
        let mut request = tech_request();
        request.ranking_preferences.weighting =
            BTreeMap::from([(String::from("fees"), 0.6), (String::from("tracking"), 0.395)]);
        assert!(request.validate(&coverage()).is_ok());

        request
            .ranking_preferences
            .weighting
            .insert(String::from("liquidity"), 0.2);
        assert!(matches!(
            request.validate(&coverage()),
            Err(ValidationError::WeightsDoNotSum { .. })
        ));

        request.ranking_preferences.weighting =
            BTreeMap::from([(String::from("fees"), -0.5), (String::from("tracking"), 1.5)]);
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::InvalidWeight {
                factor: String::from("fees")
            })
        );
    }

    #[test]
    fn weights_for_unknown_factors_are_rejected() {
        let mut request = tech_request();
        request.ranking_preferences.weighting = BTreeMap::from([
            (String::from("fees"), 0.5),
            (String::from("diversification"), 0.5),
        ]);
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::UnknownRankingFactor(String::from(
                "diversification"
            )))
        );

        request.ranking_preferences.weighting =
            BTreeMap::from([(String::from("Fees"), 0.5), (String::from(" liquidity"), 0.5)]);
        assert!(request.validate(&coverage()).is_ok());
    }

    #[test]
    fn bounds_max_results_and_max_ter() {
        let mut request = tech_request();
        request.output_options.max_results = 101;
        assert!(matches!(
            request.validate(&coverage()),
            Err(ValidationError::MaxResultsOutOfRange { value: 101, .. })
        ));

        request.output_options.max_results = 0;
        request.constraints.max_ter = 7.5;
        assert!(matches!(
            request.validate(&coverage()),
            Err(ValidationError::MaxTerOutOfRange { .. })
        ));

        request.constraints.max_ter = 0.0;
        assert!(request.validate(&coverage()).is_ok());
        assert_eq!(request.max_results_or(10), 10);
    }

    #[test]
    fn optional_profile_fields_are_checked_when_present() {
        let mut request = tech_request();
        request.investor_profile.risk_tolerance = Some(String::from("Moderate"));
        request.investor_profile.time_horizon_years = Some(20);
        assert!(request.validate(&coverage()).is_ok());

        request.investor_profile.risk_tolerance = Some(String::from("yolo"));
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::InvalidRiskTolerance(String::from("yolo")))
        );

        request.investor_profile.risk_tolerance = None;
        request.investor_profile.time_horizon_years = Some(0);
        assert_eq!(
            request.validate(&coverage()),
            Err(ValidationError::TimeHorizonOutOfRange { value: 0 })
        );
    }

    #[test]
    fn flags_do_not_duplicate_explicit_markets() {
        let mut request = tech_request();
        request.exposure.geography.markets = vec![String::from("Emerging Markets")];
        request.exposure.geography.emerging_markets = true;
        request.exposure.geography.developed_markets = true;

        assert_eq!(
            request.effective_markets(),
            vec![
                String::from("Emerging Markets"),
                String::from(DEVELOPED_MARKETS)
            ]
        );

        let criteria = request.search_criteria();
        assert_eq!(criteria.country, "ZA");
        assert_eq!(criteria.markets.len(), 2);
        assert_eq!(criteria.vehicles, vec![String::from("etf")]);
        assert_eq!(request.requested_exposure().sectors, vec![String::from("technology")]);
    }
}
