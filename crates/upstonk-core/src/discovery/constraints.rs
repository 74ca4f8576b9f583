//! User constraint filtering applied after eligibility evaluation.

use crate::domain::{DiscoveredProduct, EligibilityStatus};
use crate::request::{Constraints, GeographyCriteria};

/// Share of a product's exposure above which an excluded country disqualifies it.
pub const EXCLUDED_COUNTRY_THRESHOLD: f64 = 50.0;

/// Keeps candidates in their original order, dropping those that violate a
/// constraint.
///
/// With `tfsa_eligible_only` off, only hard-ineligible candidates are dropped
/// on eligibility grounds; unknown and conditional candidates pass through.
pub fn apply_constraints(
    candidates: Vec<DiscoveredProduct>,
    constraints: &Constraints,
    geography: &GeographyCriteria,
) -> Vec<DiscoveredProduct> {
    let allowed_exchanges: Vec<String> = constraints
        .allowed_exchanges
        .iter()
        .map(|exchange| exchange.trim().to_ascii_uppercase())
        .filter(|exchange| !exchange.is_empty())
        .collect();

    candidates
        .into_iter()
        .filter(|candidate| passes_eligibility(candidate, constraints))
        .filter(|candidate| {
            allowed_exchanges.is_empty()
                || allowed_exchanges
                    .contains(&candidate.product.exchange.trim().to_ascii_uppercase())
        })
        .filter(|candidate| passes_thresholds(candidate, constraints))
        .filter(|candidate| passes_structure(candidate, constraints))
        .filter(|candidate| !in_excluded_country(candidate, &geography.exclude_countries))
        .collect()
}

fn passes_eligibility(candidate: &DiscoveredProduct, constraints: &Constraints) -> bool {
    if constraints.tfsa_eligible_only {
        candidate.eligibility.is_eligible()
    } else {
        candidate.eligibility.status() != EligibilityStatus::Ineligible
    }
}

fn passes_thresholds(candidate: &DiscoveredProduct, constraints: &Constraints) -> bool {
    let product = &candidate.product;
    if constraints.max_ter > 0.0 && product.ter > constraints.max_ter {
        return false;
    }
    if constraints.min_aum > 0.0 && product.aum < constraints.min_aum {
        return false;
    }
    if constraints.min_liquidity > 0.0 && product.average_daily_volume < constraints.min_liquidity
    {
        return false;
    }
    true
}

fn passes_structure(candidate: &DiscoveredProduct, constraints: &Constraints) -> bool {
    let product = &candidate.product;
    let excluded = (constraints.exclude_synthetic && product.is_synthetic)
        || (constraints.exclude_leveraged && product.is_leveraged)
        || (constraints.exclude_inverse && product.is_inverse)
        || (constraints.physical_only && !product.is_physical);
    !excluded
}

fn in_excluded_country(candidate: &DiscoveredProduct, excluded: &[String]) -> bool {
    excluded.iter().any(|country| {
        candidate
            .product
            .geographic_exposure
            .country_weight(country)
            .is_some_and(|weight| weight > EXCLUDED_COUNTRY_THRESHOLD)
    })
}
