use crate::domain::{
    Confidence, EligibilityResult, EligibilityStatus, Evidence, EvidenceOutcome, Product, PASS_MARK,
};
use crate::reference::AccountMatrix;

use super::EligibilityRule;

const CRITERION: &str = "unrestricted_account";

/// Passes every product for account types that carry no product restrictions.
#[derive(Debug, Clone)]
pub struct UnrestrictedAccountRule {
    accounts: AccountMatrix,
}

impl UnrestrictedAccountRule {
    pub fn new(accounts: AccountMatrix) -> Self {
        Self { accounts }
    }
}

impl EligibilityRule for UnrestrictedAccountRule {
    fn name(&self) -> &str {
        "UNRESTRICTED_ACCOUNT"
    }

    fn version(&self) -> &str {
        "unrestricted_v1"
    }

    fn applies_to(&self, country: &str, account_type: &str) -> bool {
        self.accounts.supports(country, account_type)
    }

    fn evaluate(&self, _product: &Product) -> EligibilityResult {
        let mut result = EligibilityResult::new(
            EligibilityStatus::Eligible,
            Confidence::Medium,
            self.version(),
        );
        result.rules_passed.push(CRITERION.to_owned());
        result.reasons.push(format!(
            "{PASS_MARK} No account-level restrictions for this account type"
        ));
        result.evidence.push(Evidence {
            criterion: CRITERION.to_owned(),
            expected: String::from("Account type without product restrictions"),
            actual: String::from("Unrestricted account"),
            outcome: EvidenceOutcome::Pass,
            data_source: None,
        });
        result
    }
}
