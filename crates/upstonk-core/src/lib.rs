//! Core contracts for upstonk, an ETF discovery engine.
//!
//! This crate contains:
//! - The canonical ETF product model and eligibility/ranking result types
//! - Concrete data source providers and the concurrent aggregator over them
//! - Jurisdiction-specific eligibility rules behind a pluggable engine
//! - Exposure matching, quality ranking and the discovery pipeline
//! - Configuration, versioned reference data and logging setup
//!
//! | Module | Role |
//! |--------|------|
//! | [`adapters`] | JSE, Yahoo Finance, Alpha Vantage and catalog providers |
//! | [`aggregator`] | Parallel fan-out, timeouts, merge and cache |
//! | [`eligibility`] | Rule trait, ordered registry, built-in rules |
//! | [`matching`] / [`ranking`] | Exposure match and quality scores |
//! | [`discovery`] | Pipeline orchestration and result shaping |
//! | [`registry`] | Provider selection and service assembly from config |

pub mod adapters;
pub mod aggregator;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod discovery;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod matching;
pub mod merge;
pub mod ranking;
pub mod reference;
pub mod registry;
pub mod request;
pub mod source;
pub mod throttling;

pub use adapters::{
    AlphaVantageProvider, CatalogProvider, EtfComProvider, JseListingProvider, YahooQuoteProvider,
};
pub use aggregator::{AggregateOutcome, Aggregator, ProviderFailure};
pub use cache::{Clock, ManualClock, SearchCache, SystemClock};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::AppConfig;
pub use data_source::{DataSourceProvider, SearchCriteria, SourceError, SourceErrorKind};
pub use discovery::{DiscoveryResponse, DiscoveryService, PipelineStage, ProductResult};
pub use domain::{
    Confidence, DiscoveredProduct, EligibilityResult, EligibilityStatus, Product, UtcDateTime,
};
pub use eligibility::{EligibilityEngine, EligibilityRule, RuleDescriptor};
pub use error::{ConfigError, DiscoveryError, ValidationError};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ScriptedHttpClient};
pub use logging::LoggingConfig;
pub use matching::{MatchScorer, RequestedExposure};
pub use ranking::{RankingEngine, RankingWeights, WeightedScorer};
pub use reference::{AccountMatrix, ReferenceData};
pub use registry::{discovery_service, ProviderRegistryBuilder};
pub use request::DiscoveryRequest;
pub use source::ProviderId;
