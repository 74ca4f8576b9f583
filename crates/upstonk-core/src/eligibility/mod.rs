//! Jurisdiction- and account-specific eligibility rules.
//!
//! The engine keeps its rules in registration order and asks each in turn
//! whether it applies to the investor's `(country, account type)`. The first
//! rule that applies evaluates the product; later rules are never consulted,
//! so overlapping rules resolve as "first registered, first matched".
//!
//! | Rule | Applies to | Source of its tables |
//! |------|------------|----------------------|
//! | [`TfsaZaRule`] | ZA / tfsa | [`TfsaZaConfig`] |
//! | [`UnrestrictedAccountRule`] | configured standard accounts | [`AccountMatrix`](crate::reference::AccountMatrix) |

mod tfsa_za;
mod unrestricted;

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::{EligibilityResult, Product};
use crate::reference::ReferenceData;

pub use tfsa_za::{TfsaZaConfig, TfsaZaRule};
pub use unrestricted::UnrestrictedAccountRule;

/// One pluggable ruleset. New jurisdictions are added by registering more of these.
pub trait EligibilityRule: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn applies_to(&self, country: &str, account_type: &str) -> bool;

    fn evaluate(&self, product: &Product) -> EligibilityResult;
}

/// Name and version of a registered rule, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescriptor {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Default)]
pub struct EligibilityEngine {
    rules: Vec<Arc<dyn EligibilityRule>>,
}

impl EligibilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with the built-in rules, TFSA first, configured from `reference`.
    pub fn from_reference(reference: &ReferenceData) -> Self {
        let mut engine = Self::new();
        engine.register_rule(Arc::new(TfsaZaRule::new(reference.tfsa_za.clone())));
        if !reference.unrestricted_accounts.is_empty() {
            engine.register_rule(Arc::new(UnrestrictedAccountRule::new(
                reference.unrestricted_accounts.clone(),
            )));
        }
        engine
    }

    /// Appends a rule. Returns `false` and keeps the existing entry when a
    /// rule with the same name and version is already registered.
    pub fn register_rule(&mut self, rule: Arc<dyn EligibilityRule>) -> bool {
        let duplicate = self
            .rules
            .iter()
            .any(|existing| existing.name() == rule.name() && existing.version() == rule.version());
        if duplicate {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// First registered rule that applies to the combination.
    pub fn rule_for(&self, country: &str, account_type: &str) -> Option<&dyn EligibilityRule> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(country, account_type))
            .map(|rule| rule.as_ref())
    }

    pub fn evaluate(&self, product: &Product, country: &str, account_type: &str) -> EligibilityResult {
        match self.rule_for(country, account_type) {
            Some(rule) => {
                let result = rule.evaluate(product);
                debug!(
                    ticker = %product.ticker,
                    rule = rule.name(),
                    status = result.status().as_str(),
                    "eligibility evaluated"
                );
                result
            }
            None => EligibilityResult::no_applicable_rule(country, account_type),
        }
    }

    pub fn descriptors(&self) -> Vec<RuleDescriptor> {
        self.rules
            .iter()
            .map(|rule| RuleDescriptor {
                name: rule.name().to_owned(),
                version: rule.version().to_owned(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Debug for EligibilityEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EligibilityEngine")
            .field("rules", &self.descriptors())
            .finish()
    }
}
