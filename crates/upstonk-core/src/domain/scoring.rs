use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::{EligibilityResult, Product};

/// Share of the final sort key taken by the exposure match score.
pub const MATCH_SHARE: f64 = 0.4;
/// Share of the final sort key taken by the ranking score.
pub const RANKING_SHARE: f64 = 0.6;

/// Quality factors scored by the ranking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingFactor {
    Fees,
    Liquidity,
    Tracking,
    Stability,
}

impl RankingFactor {
    pub const ALL: [RankingFactor; 4] = [
        RankingFactor::Fees,
        RankingFactor::Liquidity,
        RankingFactor::Tracking,
        RankingFactor::Stability,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fees => "fees",
            Self::Liquidity => "liquidity",
            Self::Tracking => "tracking",
            Self::Stability => "stability",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fees" => Some(Self::Fees),
            "liquidity" => Some(Self::Liquidity),
            "tracking" => Some(Self::Tracking),
            "stability" => Some(Self::Stability),
            _ => None,
        }
    }
}

impl Display for RankingFactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor sub-scores, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub fees: f64,
    pub liquidity: f64,
    pub tracking: f64,
    pub stability: f64,
}

impl ComponentScores {
    pub const fn get(&self, factor: RankingFactor) -> f64 {
        match factor {
            RankingFactor::Fees => self.fees,
            RankingFactor::Liquidity => self.liquidity,
            RankingFactor::Tracking => self.tracking,
            RankingFactor::Stability => self.stability,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingScore {
    /// Weighted total in `0.0..=100.0` when weights sum to one.
    pub total_score: f64,
    pub components: ComponentScores,
    /// 1-based position after the final sort; zero until ranked.
    pub rank: usize,
    pub explanation: String,
}

/// A candidate as it moves through evaluation, filtering, scoring and shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredProduct {
    pub product: Product,
    pub eligibility: EligibilityResult,
    pub ranking: RankingScore,
    /// Exposure match in `0.0..=100.0`.
    pub match_score: f64,
}

impl DiscoveredProduct {
    pub fn new(product: Product, eligibility: EligibilityResult) -> Self {
        Self {
            product,
            eligibility,
            ranking: RankingScore::default(),
            match_score: 0.0,
        }
    }

    /// Final sort key blending exposure fit with product quality.
    pub fn combined_score(&self) -> f64 {
        MATCH_SHARE * self.match_score + RANKING_SHARE * self.ranking.total_score
    }
}
