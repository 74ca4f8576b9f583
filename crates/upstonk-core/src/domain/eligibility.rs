use serde::{Deserialize, Serialize};

use super::{DataSourceRecord, UtcDateTime};

/// Prefix of reasons that record a passed check.
pub const PASS_MARK: &str = "✓";
/// Prefix of reasons that record a failed check.
pub const FAIL_MARK: &str = "✗";
/// Prefix of advisory reasons; these surface as eligibility warnings.
pub const ADVISORY_MARK: &str = "⚠";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    Unknown,
    Conditional,
}

impl EligibilityStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Ineligible => "ineligible",
            Self::Unknown => "unknown",
            Self::Conditional => "conditional",
        }
    }

    pub const fn is_eligible(self) -> bool {
        matches!(self, Self::Eligible | Self::Conditional)
    }
}

/// How well-evidenced a determination is. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Caps confidence at `ceiling`; never raises it.
    pub fn capped_at(self, ceiling: Confidence) -> Confidence {
        self.min(ceiling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceOutcome {
    Pass,
    Fail,
    Unknown,
}

/// One audited criterion of an eligibility evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub criterion: String,
    pub expected: String,
    pub actual: String,
    pub outcome: EvidenceOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceRecord>,
}

/// Outcome of evaluating one product against one eligibility rule.
///
/// `is_eligible` is derived from `status` and can only change through
/// [`EligibilityResult::set_status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    status: EligibilityStatus,
    is_eligible: bool,
    pub confidence: Confidence,
    pub reasons: Vec<String>,
    pub rules_passed: Vec<String>,
    pub rules_failed: Vec<String>,
    pub rules_skipped: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub rule_version: String,
    pub evaluated_at: UtcDateTime,
}

impl EligibilityResult {
    pub fn new(
        status: EligibilityStatus,
        confidence: Confidence,
        rule_version: impl Into<String>,
    ) -> Self {
        Self {
            status,
            is_eligible: status.is_eligible(),
            confidence,
            reasons: Vec::new(),
            rules_passed: Vec::new(),
            rules_failed: Vec::new(),
            rules_skipped: Vec::new(),
            evidence: Vec::new(),
            rule_version: rule_version.into(),
            evaluated_at: UtcDateTime::now(),
        }
    }

    /// Result used when no registered rule covers the jurisdiction.
    pub fn no_applicable_rule(country: &str, account_type: &str) -> Self {
        let mut result = Self::new(EligibilityStatus::Unknown, Confidence::None, "none");
        result.reasons.push(format!(
            "{ADVISORY_MARK} No eligibility rules defined for {country} {account_type} accounts"
        ));
        result
    }

    pub const fn status(&self) -> EligibilityStatus {
        self.status
    }

    pub const fn is_eligible(&self) -> bool {
        self.is_eligible
    }

    pub fn set_status(&mut self, status: EligibilityStatus) {
        self.status = status;
        self.is_eligible = status.is_eligible();
    }

    /// Lowers confidence to at most `ceiling`.
    pub fn downgrade_confidence(&mut self, ceiling: Confidence) {
        self.confidence = self.confidence.capped_at(ceiling);
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.reasons
            .iter()
            .map(String::as_str)
            .filter(|reason| reason.starts_with(ADVISORY_MARK))
    }

    pub fn justification(&self) -> String {
        self.reasons.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_never_raised_by_a_cap() {
        assert_eq!(Confidence::High.capped_at(Confidence::Medium), Confidence::Medium);
        assert_eq!(Confidence::Low.capped_at(Confidence::Medium), Confidence::Low);
        assert_eq!(Confidence::None.capped_at(Confidence::High), Confidence::None);
    }

    #[test]
    fn is_eligible_follows_status() {
        let mut result =
            EligibilityResult::new(EligibilityStatus::Eligible, Confidence::High, "v1");
        assert!(result.is_eligible());

        result.set_status(EligibilityStatus::Unknown);
        assert!(!result.is_eligible());

        result.set_status(EligibilityStatus::Conditional);
        assert!(result.is_eligible());

        result.set_status(EligibilityStatus::Ineligible);
        assert!(!result.is_eligible());
    }

    #[test]
    fn no_rule_result_is_unknown_with_no_confidence() {
        let result = EligibilityResult::no_applicable_rule("FR", "pea");
        assert_eq!(result.status(), EligibilityStatus::Unknown);
        assert!(!result.is_eligible());
        assert_eq!(result.confidence, Confidence::None);
        assert_eq!(result.warnings().count(), 1);
    }
}
