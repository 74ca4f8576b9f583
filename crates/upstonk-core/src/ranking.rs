//! Multi-factor quality ranking, independent of the requested exposure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ComponentScores, Product, RankingFactor, RankingScore};

/// Sub-score used when a product does not report its tracking difference.
pub const UNREPORTED_TRACKING_SCORE: f64 = 0.7;

/// Per-factor weights. Not renormalised: request validation enforces the sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub fees: f64,
    pub liquidity: f64,
    pub tracking: f64,
    pub stability: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            fees: 0.4,
            liquidity: 0.3,
            tracking: 0.2,
            stability: 0.1,
        }
    }
}

impl RankingWeights {
    /// Caller weights replace the defaults entirely when any are supplied.
    ///
    /// Factors missing from a non-empty map weigh zero; unknown keys are ignored.
    pub fn from_preferences(weighting: &BTreeMap<String, f64>) -> Self {
        if weighting.is_empty() {
            return Self::default();
        }

        let mut weights = Self {
            fees: 0.0,
            liquidity: 0.0,
            tracking: 0.0,
            stability: 0.0,
        };
        for (key, value) in weighting {
            match RankingFactor::parse(key) {
                Some(RankingFactor::Fees) => weights.fees = *value,
                Some(RankingFactor::Liquidity) => weights.liquidity = *value,
                Some(RankingFactor::Tracking) => weights.tracking = *value,
                Some(RankingFactor::Stability) => weights.stability = *value,
                None => {}
            }
        }
        weights
    }

    pub const fn get(&self, factor: RankingFactor) -> f64 {
        match factor {
            RankingFactor::Fees => self.fees,
            RankingFactor::Liquidity => self.liquidity,
            RankingFactor::Tracking => self.tracking,
            RankingFactor::Stability => self.stability,
        }
    }

    pub fn describe(&self) -> String {
        let parts: Vec<String> = RankingFactor::ALL
            .iter()
            .map(|factor| format!("{factor} {:.0}%", self.get(*factor) * 100.0))
            .collect();
        format!("Weighted score: {}", parts.join(", "))
    }
}

/// Scores a product's intrinsic quality.
pub trait RankingEngine: Send + Sync {
    fn score(&self, product: &Product, weights: &RankingWeights) -> RankingScore;
}

/// Step-function scorer over TER, volume, AUM and tracking difference.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScorer;

impl RankingEngine for WeightedScorer {
    fn score(&self, product: &Product, weights: &RankingWeights) -> RankingScore {
        let components = ComponentScores {
            fees: fee_score(product.ter),
            liquidity: liquidity_score(product.average_daily_volume),
            tracking: tracking_score(product.tracking_difference),
            stability: stability_score(product.aum),
        };

        let total: f64 = RankingFactor::ALL
            .iter()
            .map(|factor| components.get(*factor) * weights.get(*factor))
            .sum();

        RankingScore {
            total_score: total * 100.0,
            components,
            rank: 0,
            explanation: weights.describe(),
        }
    }
}

/// `1 - TER` in percentage units, clipped to `0.0..=1.0`.
pub fn fee_score(ter: f64) -> f64 {
    if !ter.is_finite() {
        return 0.0;
    }
    (1.0 - ter).clamp(0.0, 1.0)
}

pub fn liquidity_score(average_daily_volume: f64) -> f64 {
    if average_daily_volume < 10_000.0 {
        0.3
    } else if average_daily_volume < 100_000.0 {
        0.6
    } else if average_daily_volume < 500_000.0 {
        0.8
    } else {
        1.0
    }
}

pub fn stability_score(aum: f64) -> f64 {
    if aum < 50_000_000.0 {
        0.3
    } else if aum < 500_000_000.0 {
        0.6
    } else if aum < 1_000_000_000.0 {
        0.8
    } else {
        1.0
    }
}

/// Reported differences score on their magnitude, so a reported zero is perfect.
pub fn tracking_score(tracking_difference: Option<f64>) -> f64 {
    let Some(difference) = tracking_difference.filter(|d| d.is_finite()) else {
        return UNREPORTED_TRACKING_SCORE;
    };
    let difference = difference.abs();
    if difference < 0.1 {
        1.0
    } else if difference < 0.3 {
        0.8
    } else if difference < 0.5 {
        0.6
    } else {
        0.4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(ter: f64, volume: f64, aum: f64, tracking: Option<f64>) -> Product {
        let mut product = Product::new("TEST", "Test ETF");
        product.ter = ter;
        product.average_daily_volume = volume;
        product.aum = aum;
        product.tracking_difference = tracking;
        product
    }

    #[test]
    fn fee_score_is_linear_and_clipped() {
        assert!((fee_score(0.45) - 0.55).abs() < 1e-9);
        assert_eq!(fee_score(1.0), 0.0);
        assert_eq!(fee_score(2.5), 0.0);
        assert_eq!(fee_score(-0.2), 1.0);
        assert_eq!(fee_score(f64::NAN), 0.0);
    }

    #[test]
    fn step_functions_use_lower_inclusive_tiers() {
        assert_eq!(liquidity_score(9_999.0), 0.3);
        assert_eq!(liquidity_score(10_000.0), 0.6);
        assert_eq!(liquidity_score(500_000.0), 1.0);
        assert_eq!(stability_score(49_999_999.0), 0.3);
        assert_eq!(stability_score(500_000_000.0), 0.8);
        assert_eq!(stability_score(1_000_000_000.0), 1.0);
    }

    #[test]
    fn unreported_tracking_is_neutral_and_reported_zero_is_perfect() {
        assert_eq!(tracking_score(None), 0.7);
        assert_eq!(tracking_score(Some(0.0)), 1.0);
        assert_eq!(tracking_score(Some(-0.25)), 0.8);
        assert_eq!(tracking_score(Some(0.75)), 0.4);
    }

    #[test]
    fn default_weights_produce_expected_total() {
        let score = WeightedScorer.score(
            &product(0.45, 150_000.0, 2_850_000_000.0, None),
            &RankingWeights::default(),
        );
        // 0.55*0.4 + 0.8*0.3 + 0.7*0.2 + 1.0*0.1
        assert!((score.total_score - 70.0).abs() < 1e-9);
        assert_eq!(score.components.liquidity, 0.8);
        assert_eq!(
            score.explanation,
            "Weighted score: fees 40%, liquidity 30%, tracking 20%, stability 10%"
        );
    }

    #[test]
    fn caller_weights_replace_defaults_and_missing_factors_weigh_zero() {
        let weighting = BTreeMap::from([
            (String::from("fees"), 1.0),
            (String::from("diversification"), 0.5),
        ]);
        let weights = RankingWeights::from_preferences(&weighting);
        assert_eq!(weights.fees, 1.0);
        assert_eq!(weights.liquidity, 0.0);

        let score = WeightedScorer.score(&product(0.2, 0.0, 0.0, None), &weights);
        assert!((score.total_score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn dominating_product_never_ranks_below_dominated_one() {
        let equal = RankingWeights {
            fees: 0.25,
            liquidity: 0.25,
            tracking: 0.25,
            stability: 0.25,
        };
        let strong = product(0.1, 600_000.0, 2_000_000_000.0, Some(0.05));
        let weak = product(0.8, 50_000.0, 100_000_000.0, Some(0.4));

        let strong_score = WeightedScorer.score(&strong, &equal);
        let weak_score = WeightedScorer.score(&weak, &equal);
        for factor in RankingFactor::ALL {
            assert!(strong_score.components.get(factor) > weak_score.components.get(factor));
        }
        assert!(strong_score.total_score > weak_score.total_score);
    }
}
