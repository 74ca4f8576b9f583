mod eligibility;
mod product;
mod scoring;
mod timestamp;

pub use eligibility::{
    Confidence, EligibilityResult, EligibilityStatus, Evidence, EvidenceOutcome, ADVISORY_MARK,
    FAIL_MARK, PASS_MARK,
};
pub(crate) use product::normalize_label;
pub use product::{
    AssetExposure, DataSourceRecord, GeographicExposure, Holding, Product, Reliability,
    SectorAllocation, SourceType,
};
pub use scoring::{
    ComponentScores, DiscoveredProduct, RankingFactor, RankingScore, MATCH_SHARE, RANKING_SHARE,
};
pub use timestamp::UtcDateTime;
