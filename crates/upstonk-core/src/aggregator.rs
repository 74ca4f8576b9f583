//! Concurrent multi-provider search with deduplication and caching.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::SearchCache;
use crate::data_source::{DataSourceProvider, SearchCriteria, SourceError};
use crate::domain::Product;
use crate::merge::deduplicate;
use crate::ProviderId;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// A provider that failed or timed out during one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: SourceError,
}

/// Result of one aggregated search.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    /// Deduplicated, merged records in first-appearance order.
    pub products: Vec<Product>,
    /// Providers consulted, in registration order. Empty on a cache hit.
    pub providers_queried: Vec<ProviderId>,
    pub failures: Vec<ProviderFailure>,
    pub cache_hit: bool,
}

impl AggregateOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fans a search out to every registered provider and merges the answers.
///
/// Provider errors never escape: each is logged and recorded as a
/// [`ProviderFailure`]. Every provider call is bounded by the smaller of the
/// per-provider timeout and the time left before the request deadline.
pub struct Aggregator {
    providers: Vec<Arc<dyn DataSourceProvider>>,
    cache: SearchCache,
    provider_timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn DataSourceProvider>>, cache: SearchCache) -> Self {
        Self {
            providers,
            cache,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn DataSourceProvider>] {
        &self.providers
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub async fn search(&self, criteria: &SearchCriteria, deadline: Instant) -> AggregateOutcome {
        let key = criteria.cache_key();
        if let Some(products) = self.cache.get(&key).await {
            debug!(cache_key = %key, products = products.len(), "search cache hit");
            return AggregateOutcome {
                products,
                providers_queried: Vec::new(),
                failures: Vec::new(),
                cache_hit: true,
            };
        }
        debug!(cache_key = %key, "search cache miss");

        let budget = self
            .provider_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        let (records, failures) = self.fan_out(criteria, budget).await;
        let providers_queried = self.provider_ids();
        let all_failed = !providers_queried.is_empty() && failures.len() == providers_queried.len();

        let products = deduplicate(records);
        if !all_failed && !providers_queried.is_empty() {
            self.cache.put(key, products.clone()).await;
        }

        AggregateOutcome {
            products,
            providers_queried,
            failures,
            cache_hit: false,
        }
    }

    async fn fan_out(
        &self,
        criteria: &SearchCriteria,
        budget: Duration,
    ) -> (Vec<Product>, Vec<ProviderFailure>) {
        let mut handles = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let criteria = criteria.clone();
            let id = provider.id();

            let handle = tokio::spawn(async move {
                let started = Instant::now();
                let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
                if budget.is_zero() {
                    return (Err(SourceError::timeout(id, budget_ms)), Duration::ZERO);
                }
                let outcome = match timeout(budget, provider.search(&criteria)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::timeout(id, budget_ms)),
                };
                (outcome, started.elapsed())
            });

            handles.push((id, handle));
        }

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (provider, handle) in handles {
            let (outcome, elapsed) = match handle.await {
                Ok(joined) => joined,
                Err(join_error) => (
                    Err(SourceError::internal(format!(
                        "provider task aborted: {join_error}"
                    ))),
                    Duration::ZERO,
                ),
            };
            let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(products) => {
                    debug!(%provider, records = products.len(), elapsed_ms, "provider search finished");
                    records.extend(products);
                }
                Err(error) => {
                    warn!(%provider, code = error.code(), elapsed_ms, "provider search failed: {}", error.message());
                    failures.push(ProviderFailure { provider, error });
                }
            }
        }

        (records, failures)
    }
}
