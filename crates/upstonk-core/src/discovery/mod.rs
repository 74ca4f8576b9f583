//! Discovery pipeline: search, evaluate, filter, score, rank and shape.
//!
//! One [`DiscoveryService::discover`] call runs the stages below in order and
//! owns its candidate list throughout. The only state shared between
//! concurrent runs is the aggregator's search cache.
//!
//! | Stage | Work |
//! |-------|------|
//! | `Searching` | Aggregate provider results for the request's criteria |
//! | `Evaluating` | Evaluate eligibility for the investor's jurisdiction |
//! | `Filtering` | Apply user constraints |
//! | `Scoring` | Exposure match score per candidate |
//! | `Ranking` | Quality score, blended sort, 1-based ranks |
//! | `Shaping` | Split into results and alternatives |
//! | `Warning` | Advisory warnings |

mod constraints;
mod output;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{AggregateOutcome, Aggregator};
use crate::domain::{DiscoveredProduct, UtcDateTime};
use crate::eligibility::EligibilityEngine;
use crate::matching::MatchScorer;
use crate::ranking::{RankingEngine, WeightedScorer};
use crate::reference::AccountMatrix;
use crate::request::DiscoveryRequest;
use crate::DiscoveryError;

pub use constraints::{apply_constraints, EXCLUDED_COUNTRY_THRESHOLD};
pub use output::{
    collect_warnings, shape_result, split_results, AssetBreakdown, DiscoveryResponse,
    EligibilityDetail, EligibilityTally, GeographicBreakdown, HoldingSummary, ProductResult,
    SearchSummary, Severity, SourceReference, Warning, DEGRADED_DATA_SOURCES,
    LOW_CONFIDENCE_RESULTS, MAX_ALTERNATIVES, NO_ELIGIBLE_RESULTS,
};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Searching,
    Evaluating,
    Filtering,
    Scoring,
    Ranking,
    Shaping,
    Warning,
    Done,
    Failed,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::Evaluating => "evaluating",
            Self::Filtering => "filtering",
            Self::Scoring => "scoring",
            Self::Ranking => "ranking",
            Self::Shaping => "shaping",
            Self::Warning => "warning",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Stage tracker for one run; every transition is logged with the request id.
struct PipelineRun {
    request_id: Uuid,
    stage: PipelineStage,
    started: Instant,
}

impl PipelineRun {
    fn start() -> Self {
        let run = Self {
            request_id: Uuid::new_v4(),
            stage: PipelineStage::Searching,
            started: Instant::now(),
        };
        debug!(request_id = %run.request_id, stage = run.stage.as_str(), "pipeline stage");
        run
    }

    fn advance(&mut self, stage: PipelineStage, candidates: usize) {
        self.stage = stage;
        debug!(
            request_id = %self.request_id,
            stage = stage.as_str(),
            candidates,
            "pipeline stage"
        );
    }

    fn fail(&mut self, error: DiscoveryError) -> DiscoveryError {
        let failed_at = std::mem::replace(&mut self.stage, PipelineStage::Failed);
        warn!(
            request_id = %self.request_id,
            stage = failed_at.as_str(),
            code = error.code(),
            elapsed_ms = self.elapsed_ms(),
            "discovery failed: {error}"
        );
        error
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Runs discovery requests against an aggregator and an eligibility engine.
pub struct DiscoveryService {
    aggregator: Aggregator,
    engine: EligibilityEngine,
    ranking: Arc<dyn RankingEngine>,
    scorer: MatchScorer,
    coverage: AccountMatrix,
    deadline: Duration,
    default_max_results: usize,
}

impl DiscoveryService {
    pub fn new(aggregator: Aggregator, engine: EligibilityEngine, coverage: AccountMatrix) -> Self {
        Self {
            aggregator,
            engine,
            ranking: Arc::new(WeightedScorer),
            scorer: MatchScorer,
            coverage,
            deadline: DEFAULT_DEADLINE,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_ranking_engine(mut self, ranking: Arc<dyn RankingEngine>) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Used when a request leaves `maxResults` at zero; never below one.
    pub fn with_default_max_results(mut self, default_max_results: usize) -> Self {
        self.default_max_results = default_max_results.max(1);
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    pub fn coverage(&self) -> &AccountMatrix {
        &self.coverage
    }

    /// Runs the full pipeline for an already validated request.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::UnsupportedJurisdiction`] when the investor's
    ///   country and account type are not covered.
    /// - [`DiscoveryError::NoResults`] when aggregation produced no candidates,
    ///   including when every provider failed.
    /// - [`DiscoveryError::Internal`] when scoring produced a non-finite value.
    pub async fn discover(
        &self,
        request: &DiscoveryRequest,
    ) -> Result<DiscoveryResponse, DiscoveryError> {
        let mut run = PipelineRun::start();
        let country = request.country();
        let account_type = request.account_type();

        if !self.coverage.supports(country, account_type) {
            return Err(run.fail(DiscoveryError::UnsupportedJurisdiction {
                country: country.to_owned(),
                account_type: account_type.to_owned(),
            }));
        }

        let deadline = run.started + self.deadline;
        let AggregateOutcome {
            products,
            failures,
            cache_hit,
            ..
        } = self
            .aggregator
            .search(&request.search_criteria(), deadline)
            .await;
        if products.is_empty() {
            return Err(run.fail(DiscoveryError::NoResults));
        }
        let total_searched = products.len();

        run.advance(PipelineStage::Evaluating, total_searched);
        let candidates: Vec<DiscoveredProduct> = products
            .into_iter()
            .map(|product| {
                let eligibility = self.engine.evaluate(&product, country, account_type);
                DiscoveredProduct::new(product, eligibility)
            })
            .collect();
        let tally = EligibilityTally::count(&candidates);

        run.advance(PipelineStage::Filtering, candidates.len());
        let mut candidates = apply_constraints(
            candidates,
            &request.constraints,
            &request.exposure.geography,
        );

        run.advance(PipelineStage::Scoring, candidates.len());
        let requested = request.requested_exposure();
        for candidate in &mut candidates {
            candidate.match_score = self.scorer.score(&candidate.product, &requested);
        }

        run.advance(PipelineStage::Ranking, candidates.len());
        let weights = request.ranking_weights();
        for candidate in &mut candidates {
            candidate.ranking = self.ranking.score(&candidate.product, &weights);
        }
        if let Err(error) = rank_candidates(&mut candidates) {
            return Err(run.fail(error));
        }

        run.advance(PipelineStage::Shaping, candidates.len());
        let options = &request.output_options;
        let max_results = request.max_results_or(self.default_max_results);
        let (selected, alternates) =
            split_results(&candidates, max_results, options.include_alternatives);

        run.advance(PipelineStage::Warning, selected.len());
        let warnings = if options.include_warnings {
            collect_warnings(&selected, &failures)
        } else {
            Vec::new()
        };

        let results: Vec<ProductResult> = selected
            .iter()
            .map(|candidate| shape_result(candidate, options))
            .collect();
        let alternatives: Vec<ProductResult> = alternates
            .iter()
            .map(|candidate| shape_result(candidate, options))
            .collect();

        let summary = SearchSummary {
            total_searched,
            total_eligible: tally.total_eligible(),
            total_conditional: tally.conditional,
            total_ineligible: tally.ineligible,
            total_unknown: tally.unknown,
            search_duration_ms: run.elapsed_ms(),
            data_sources_queried: self
                .aggregator
                .provider_ids()
                .iter()
                .map(|provider| provider.display_name().to_owned())
                .collect(),
        };

        run.advance(PipelineStage::Done, results.len());
        info!(
            request_id = %run.request_id,
            country,
            account_type,
            searched = total_searched,
            results = results.len(),
            alternatives = alternatives.len(),
            degraded = !failures.is_empty(),
            cache_hit,
            elapsed_ms = summary.search_duration_ms,
            "discovery completed"
        );

        Ok(DiscoveryResponse {
            request_id: run.request_id.to_string(),
            results,
            alternatives,
            summary,
            warnings,
            generated_at: UtcDateTime::now(),
            cache_hit,
        })
    }
}

/// Sorts by the blended score, highest first, keeping the incoming order for
/// ties, then assigns 1-based ranks.
pub fn rank_candidates(candidates: &mut [DiscoveredProduct]) -> Result<(), DiscoveryError> {
    if let Some(candidate) = candidates
        .iter()
        .find(|candidate| !candidate.combined_score().is_finite())
    {
        return Err(DiscoveryError::Internal(format!(
            "non-finite score for '{}'",
            candidate.product.ticker
        )));
    }

    candidates.sort_by(|a, b| b.combined_score().total_cmp(&a.combined_score()));
    for (index, candidate) in candidates.iter_mut().enumerate() {
        candidate.ranking.rank = index + 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;
    use crate::adapters::CatalogProvider;
    use crate::cache::SearchCache;
    use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
    use crate::domain::{Confidence, EligibilityResult, EligibilityStatus, Product};
    use crate::reference::ReferenceData;
    use crate::ProviderId;

    struct DownProvider;

    impl DataSourceProvider for DownProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Yahoo
        }

        fn search<'a>(
            &'a self,
            _criteria: &'a SearchCriteria,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Product>, SourceError>> + Send + 'a>> {
            Box::pin(async { Err(SourceError::unavailable("quote endpoint down")) })
        }
    }

    fn service(providers: Vec<Arc<dyn DataSourceProvider>>) -> DiscoveryService {
        let reference = ReferenceData::default();
        DiscoveryService::new(
            Aggregator::new(providers, SearchCache::disabled()),
            EligibilityEngine::from_reference(&reference),
            reference.coverage,
        )
    }

    fn scored(ticker: &str, match_score: f64, ranking: f64) -> DiscoveredProduct {
        let mut candidate = DiscoveredProduct::new(
            Product::new(ticker, ticker),
            EligibilityResult::new(EligibilityStatus::Eligible, Confidence::High, "v1"),
        );
        candidate.match_score = match_score;
        candidate.ranking.total_score = ranking;
        candidate
    }

    #[test]
    fn ranking_is_stable_for_ties_and_one_based() {
        let mut candidates = vec![
            scored("FIRST", 50.0, 50.0),
            scored("BEST", 90.0, 90.0),
            scored("SECOND", 50.0, 50.0),
        ];
        rank_candidates(&mut candidates).expect("finite scores rank");

        let order: Vec<(&str, usize)> = candidates
            .iter()
            .map(|c| (c.product.ticker.as_str(), c.ranking.rank))
            .collect();
        assert_eq!(order, [("BEST", 1), ("FIRST", 2), ("SECOND", 3)]);
    }

    #[test]
    fn non_finite_scores_are_an_internal_error() {
        let mut candidates = vec![scored("NAN", f64::NAN, 10.0)];
        assert!(matches!(
            rank_candidates(&mut candidates),
            Err(DiscoveryError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn uncovered_jurisdiction_fails_before_searching() {
        let service = service(vec![Arc::new(CatalogProvider::default())]);
        let mut request = DiscoveryRequest::new("FR", "pea");
        request.exposure.assets.sectors = vec![String::from("technology")];

        let error = service.discover(&request).await.expect_err("FR is not covered");
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn all_providers_failing_degrades_to_no_results() {
        let service = service(vec![Arc::new(DownProvider)]);
        let mut request = DiscoveryRequest::new("US", "standard");
        request.exposure.assets.sectors = vec![String::from("technology")];

        let error = service.discover(&request).await.expect_err("nothing found");
        assert_eq!(error, DiscoveryError::NoResults);
    }

    #[tokio::test]
    async fn degraded_runs_still_answer_and_warn() {
        let service = service(vec![
            Arc::new(CatalogProvider::default()),
            Arc::new(DownProvider),
        ]);
        let mut request = DiscoveryRequest::new("US", "standard");
        request.exposure.assets.sectors = vec![String::from("technology")];
        request.output_options.include_warnings = true;

        let response = service.discover(&request).await.expect("catalog answers");
        assert!(!response.results.is_empty());
        assert_eq!(
            response.summary.data_sources_queried,
            ["Reference Catalog", "Yahoo Finance"]
        );
        assert!(response
            .warnings
            .iter()
            .any(|warning| warning.code == DEGRADED_DATA_SOURCES));
        let ranks: Vec<usize> = response.results.iter().map(|r| r.rank).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
    }

    #[tokio::test]
    async fn warnings_are_dropped_unless_requested() {
        let service = service(vec![Arc::new(DownProvider), Arc::new(CatalogProvider::default())]);
        let mut request = DiscoveryRequest::new("US", "standard");
        request.exposure.assets.asset_classes = vec![String::from("equity")];

        let response = service.discover(&request).await.expect("catalog answers");
        assert!(response.warnings.is_empty());
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }
}
