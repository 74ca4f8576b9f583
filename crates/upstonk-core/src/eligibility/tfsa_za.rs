use serde::{Deserialize, Serialize};

use crate::domain::{
    Confidence, DataSourceRecord, EligibilityResult, EligibilityStatus, Evidence, EvidenceOutcome,
    Product, SourceType, ADVISORY_MARK, FAIL_MARK, PASS_MARK,
};

use super::EligibilityRule;

/// Tables for the South African tax-free savings account rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfsaZaConfig {
    pub version: String,
    pub country: String,
    pub account_type: String,
    pub local_exchanges: Vec<String>,
    pub local_country: String,
    pub exchange_name_fragments: Vec<String>,
    pub approved_currencies: Vec<String>,
    /// Lower-case substrings matched against the product's provider name.
    pub approved_providers: Vec<String>,
}

impl Default for TfsaZaConfig {
    fn default() -> Self {
        Self {
            version: String::from("tfsa_za_v1.0_2025"),
            country: String::from("ZA"),
            account_type: String::from("tfsa"),
            local_exchanges: owned(&["JSE"]),
            local_country: String::from("ZA"),
            exchange_name_fragments: owned(&["JOHANNESBURG"]),
            approved_currencies: owned(&["ZAR", "USD"]),
            approved_providers: owned(&[
                "satrix",
                "coreshares",
                "1nvest",
                "cloud atlas",
                "absa",
                "standardbank",
                "sygnia",
                "ashburton",
            ]),
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

/// Income Tax Act s12T eligibility for ZA tax-free savings accounts.
///
/// Runs six independent checks. A failed check is a hard disqualifier; a
/// skipped check lowers confidence and makes the outcome conditional or
/// unknown.
#[derive(Debug, Clone)]
pub struct TfsaZaRule {
    config: TfsaZaConfig,
}

impl Default for TfsaZaRule {
    fn default() -> Self {
        Self::new(TfsaZaConfig::default())
    }
}

const JSE_LISTING: &str = "jse_listing";
const CURRENCY: &str = "currency_denomination";
const NO_LEVERAGE: &str = "no_leverage";
const NO_INVERSE: &str = "no_inverse";
const APPROVED_PROVIDER: &str = "approved_provider";
const IMPLICIT_APPROVAL: &str = "implicit_sars_approval";
const REPLICATION: &str = "replication_method";

impl TfsaZaRule {
    pub fn new(config: TfsaZaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TfsaZaConfig {
        &self.config
    }

    fn is_locally_listed(&self, product: &Product) -> bool {
        let exchange = product.exchange.trim().to_uppercase();
        self.config
            .local_exchanges
            .iter()
            .any(|code| code.eq_ignore_ascii_case(&exchange))
            || product
                .exchange_country
                .trim()
                .eq_ignore_ascii_case(&self.config.local_country)
            || self
                .config
                .exchange_name_fragments
                .iter()
                .any(|fragment| exchange.contains(&fragment.to_uppercase()))
    }

    fn check_listing(&self, product: &Product, check: &mut Checklist) {
        let source = product.source_of_type(SourceType::ExchangeListing).cloned();
        let actual = format!(
            "Exchange: {}, Country: {}",
            product.exchange, product.exchange_country
        );
        let expected = "Listed on JSE (Johannesburg Stock Exchange)";

        if self.is_locally_listed(product) {
            check.pass(JSE_LISTING, format!("{PASS_MARK} Listed on JSE"));
            check.evidence(JSE_LISTING, expected, actual, EvidenceOutcome::Pass, source);
        } else {
            check.fail(
                JSE_LISTING,
                format!("{FAIL_MARK} Not listed on JSE - TFSA requires JSE-listed instruments"),
            );
            check.evidence(JSE_LISTING, expected, actual, EvidenceOutcome::Fail, source);
        }
    }

    fn check_currency(&self, product: &Product, check: &mut Checklist) {
        let currency = product.currency.trim();
        let expected = "ZAR (South African Rand) or USD for approved foreign ETFs";
        let actual = format!("Currency: {currency}");

        if currency.is_empty() {
            check.skip(
                CURRENCY,
                format!("{ADVISORY_MARK} Currency not specified - manual verification required"),
                Confidence::Medium,
            );
            check.evidence(CURRENCY, expected, actual, EvidenceOutcome::Unknown, None);
        } else if self
            .config
            .approved_currencies
            .iter()
            .any(|approved| approved.eq_ignore_ascii_case(currency))
        {
            check.pass(CURRENCY, format!("{PASS_MARK} Currency: {currency}"));
            check.evidence(CURRENCY, expected, actual, EvidenceOutcome::Pass, None);
        } else {
            check.fail(
                CURRENCY,
                format!("{FAIL_MARK} Currency {currency} may not be TFSA-eligible"),
            );
            check.evidence(CURRENCY, expected, actual, EvidenceOutcome::Fail, None);
        }
    }

    fn check_structure(product: &Product, check: &mut Checklist) {
        if product.is_leveraged {
            check.fail(
                NO_LEVERAGE,
                format!("{FAIL_MARK} Leveraged ETFs are not permitted in TFSAs"),
            );
            check.evidence(
                NO_LEVERAGE,
                "Non-leveraged ETF",
                "Leveraged ETF detected",
                EvidenceOutcome::Fail,
                None,
            );
        } else {
            check.pass(NO_LEVERAGE, format!("{PASS_MARK} Not leveraged"));
            check.evidence(
                NO_LEVERAGE,
                "Non-leveraged ETF",
                "Not leveraged",
                EvidenceOutcome::Pass,
                None,
            );
        }

        if product.is_inverse {
            check.fail(
                NO_INVERSE,
                format!("{FAIL_MARK} Inverse ETFs are not permitted in TFSAs"),
            );
            check.evidence(
                NO_INVERSE,
                "Standard tracking ETF",
                "Inverse ETF detected",
                EvidenceOutcome::Fail,
                None,
            );
        } else {
            check.pass(NO_INVERSE, format!("{PASS_MARK} Not inverse"));
            check.evidence(
                NO_INVERSE,
                "Standard tracking ETF",
                "Not inverse",
                EvidenceOutcome::Pass,
                None,
            );
        }
    }

    fn check_provider(&self, product: &Product, check: &mut Checklist) {
        let provider = product.provider.trim();
        let lowered = provider.to_lowercase();
        let expected = "Recognized SA ETF provider";
        let actual = format!("Provider: {provider}");

        let approved = !lowered.is_empty()
            && self
                .config
                .approved_providers
                .iter()
                .any(|fragment| lowered.contains(&fragment.to_lowercase()));

        if approved {
            check.pass(
                APPROVED_PROVIDER,
                format!("{PASS_MARK} Approved provider: {provider}"),
            );
            check.evidence(APPROVED_PROVIDER, expected, actual, EvidenceOutcome::Pass, None);
        } else if provider.is_empty() {
            check.skip(
                APPROVED_PROVIDER,
                format!("{ADVISORY_MARK} Provider not identified - verification required"),
                Confidence::Low,
            );
            check.evidence(APPROVED_PROVIDER, expected, actual, EvidenceOutcome::Unknown, None);
        } else {
            check.skip(
                APPROVED_PROVIDER,
                format!(
                    "{ADVISORY_MARK} Provider '{provider}' not in known approved list - verify with platform"
                ),
                Confidence::Medium,
            );
            check.evidence(APPROVED_PROVIDER, expected, actual, EvidenceOutcome::Unknown, None);
        }
    }

    fn check_implicit_approval(check: &mut Checklist) {
        let expected = "JSE listing by an approved provider";
        if check.passed(JSE_LISTING) && check.passed(APPROVED_PROVIDER) {
            check.pass(
                IMPLICIT_APPROVAL,
                format!("{PASS_MARK} JSE-listed by approved provider (typical TFSA eligibility path)"),
            );
            check.evidence(
                IMPLICIT_APPROVAL,
                expected,
                "Listing and provider checks passed",
                EvidenceOutcome::Pass,
                None,
            );
        } else {
            check.skip(
                IMPLICIT_APPROVAL,
                format!(
                    "{ADVISORY_MARK} Cannot confirm implicit TFSA approval - recommend platform verification"
                ),
                Confidence::Medium,
            );
            check.evidence(
                IMPLICIT_APPROVAL,
                expected,
                "Listing or provider not confirmed",
                EvidenceOutcome::Unknown,
                None,
            );
        }
    }

    fn check_replication(product: &Product, check: &mut Checklist) {
        if product.is_synthetic {
            check.skip(
                REPLICATION,
                format!("{ADVISORY_MARK} Synthetic replication - verify TFSA approval with provider"),
                Confidence::Medium,
            );
            check.evidence(
                REPLICATION,
                "Physical replication preferred",
                "Synthetic replication",
                EvidenceOutcome::Unknown,
                None,
            );
        } else if product.is_physical {
            check.pass(REPLICATION, format!("{PASS_MARK} Physical replication"));
            check.evidence(
                REPLICATION,
                "Physical replication preferred",
                "Physical replication",
                EvidenceOutcome::Pass,
                None,
            );
        }
    }
}

impl EligibilityRule for TfsaZaRule {
    fn name(&self) -> &str {
        "TFSA_ZA"
    }

    fn version(&self) -> &str {
        &self.config.version
    }

    fn applies_to(&self, country: &str, account_type: &str) -> bool {
        country.trim().eq_ignore_ascii_case(&self.config.country)
            && account_type
                .trim()
                .eq_ignore_ascii_case(&self.config.account_type)
    }

    fn evaluate(&self, product: &Product) -> EligibilityResult {
        let mut check = Checklist::new(&self.config.version);

        self.check_listing(product, &mut check);
        self.check_currency(product, &mut check);
        Self::check_structure(product, &mut check);
        self.check_provider(product, &mut check);
        Self::check_implicit_approval(&mut check);
        Self::check_replication(product, &mut check);

        check.finish()
    }
}

/// Accumulates check outcomes into a result whose confidence only goes down.
struct Checklist {
    result: EligibilityResult,
}

impl Checklist {
    fn new(version: &str) -> Self {
        Self {
            result: EligibilityResult::new(EligibilityStatus::Eligible, Confidence::High, version),
        }
    }

    fn passed(&self, criterion: &str) -> bool {
        self.result.rules_passed.iter().any(|rule| rule == criterion)
    }

    fn pass(&mut self, criterion: &str, reason: String) {
        self.result.rules_passed.push(criterion.to_owned());
        self.result.reasons.push(reason);
    }

    fn fail(&mut self, criterion: &str, reason: String) {
        self.result.rules_failed.push(criterion.to_owned());
        self.result.reasons.push(reason);
    }

    fn skip(&mut self, criterion: &str, reason: String, ceiling: Confidence) {
        self.result.rules_skipped.push(criterion.to_owned());
        self.result.reasons.push(reason);
        self.result.downgrade_confidence(ceiling);
    }

    fn evidence(
        &mut self,
        criterion: &str,
        expected: &str,
        actual: impl Into<String>,
        outcome: EvidenceOutcome,
        data_source: Option<DataSourceRecord>,
    ) {
        self.result.evidence.push(Evidence {
            criterion: criterion.to_owned(),
            expected: expected.to_owned(),
            actual: actual.into(),
            outcome,
            data_source,
        });
    }

    fn finish(mut self) -> EligibilityResult {
        let result = &mut self.result;
        let skipped = result.rules_skipped.len();

        if !result.rules_failed.is_empty() {
            result.set_status(EligibilityStatus::Ineligible);
        } else if skipped > 3 || result.confidence <= Confidence::Low {
            result.set_status(EligibilityStatus::Unknown);
            result.reasons.push(format!(
                "{ADVISORY_MARK} Insufficient data to confirm eligibility - recommend verification with SARS or your platform"
            ));
        } else if skipped > 0 {
            result.set_status(EligibilityStatus::Conditional);
            result.reasons.push(format!(
                "{PASS_MARK} Likely eligible but verification recommended before investing"
            ));
        } else {
            result.set_status(EligibilityStatus::Eligible);
        }

        if skipped > 0 {
            result.downgrade_confidence(Confidence::Medium);
        }
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Reliability;

    fn satrix_nasdaq() -> Product {
        let mut product = Product::new("STXNDQ", "Satrix NASDAQ 100 ETF");
        product.exchange = String::from("JSE");
        product.exchange_country = String::from("ZA");
        product.currency = String::from("ZAR");
        product.provider = String::from("Satrix");
        product.is_physical = true;
        product.data_sources.push(DataSourceRecord::new(
            SourceType::ExchangeListing,
            "JSE",
            Some(String::from("https://www.jse.co.za/trade/etfs")),
            Reliability::Primary,
        ));
        product
    }

    #[test]
    fn clean_jse_product_is_eligible_with_high_confidence() {
        let result = TfsaZaRule::default().evaluate(&satrix_nasdaq());

        assert_eq!(result.status(), EligibilityStatus::Eligible);
        assert!(result.is_eligible());
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.rules_failed.is_empty());
        assert!(result.rules_skipped.is_empty());
        assert_eq!(
            result.rules_passed,
            [
                "jse_listing",
                "currency_denomination",
                "no_leverage",
                "no_inverse",
                "approved_provider",
                "implicit_sars_approval",
                "replication_method"
            ]
        );
        let listing = &result.evidence[0];
        assert_eq!(listing.criterion, "jse_listing");
        assert_eq!(
            listing.data_source.as_ref().map(|s| s.provider.as_str()),
            Some("JSE")
        );
    }

    #[test]
    fn leveraged_product_is_ineligible() {
        let mut product = satrix_nasdaq();
        product.is_leveraged = true;

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.status(), EligibilityStatus::Ineligible);
        assert!(!result.is_eligible());
        assert!(result.rules_failed.iter().any(|r| r == "no_leverage"));
    }

    #[test]
    fn leverage_and_inverse_are_both_reported() {
        let mut product = satrix_nasdaq();
        product.is_leveraged = true;
        product.is_inverse = true;

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.rules_failed, ["no_leverage", "no_inverse"]);
    }

    #[test]
    fn foreign_listing_fails_and_blocks_implicit_approval() {
        let mut product = Product::new("QQQ", "Invesco QQQ Trust");
        product.exchange = String::from("NMS");
        product.exchange_country = String::from("US");
        product.currency = String::from("USD");
        product.provider = String::from("Invesco");

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.status(), EligibilityStatus::Ineligible);
        assert_eq!(result.rules_failed, ["jse_listing"]);
        assert!(result.rules_skipped.iter().any(|r| r == "implicit_sars_approval"));
    }

    #[test]
    fn johannesburg_in_exchange_name_counts_as_local_listing() {
        let mut product = satrix_nasdaq();
        product.exchange = String::from("Johannesburg Stock Exchange");
        product.exchange_country.clear();

        let result = TfsaZaRule::default().evaluate(&product);
        assert!(result.rules_passed.iter().any(|r| r == "jse_listing"));
    }

    #[test]
    fn unknown_provider_makes_result_conditional() {
        let mut product = satrix_nasdaq();
        product.provider = String::from("Acme Funds");

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.status(), EligibilityStatus::Conditional);
        assert!(result.is_eligible());
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.rules_skipped, ["approved_provider", "implicit_sars_approval"]);
        assert_eq!(
            result.reasons.last().map(String::as_str),
            Some("✓ Likely eligible but verification recommended before investing")
        );
    }

    #[test]
    fn missing_provider_lowers_confidence_to_unknown() {
        let mut product = satrix_nasdaq();
        product.provider.clear();

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.status(), EligibilityStatus::Unknown);
        assert!(!result.is_eligible());
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn synthetic_replication_never_raises_confidence_back() {
        let mut product = satrix_nasdaq();
        product.provider.clear();
        product.is_physical = false;
        product.is_synthetic = true;

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.status(), EligibilityStatus::Unknown);
        assert!(result.warnings().any(|w| w.contains("Synthetic replication")));
    }

    #[test]
    fn unreported_replication_emits_no_replication_evidence() {
        let mut product = satrix_nasdaq();
        product.is_physical = false;

        let result = TfsaZaRule::default().evaluate(&product);
        assert_eq!(result.status(), EligibilityStatus::Eligible);
        assert!(result
            .evidence
            .iter()
            .all(|evidence| evidence.criterion != "replication_method"));
    }

    #[test]
    fn rule_applies_case_insensitively() {
        let rule = TfsaZaRule::default();
        assert!(rule.applies_to("za", "TFSA"));
        assert!(!rule.applies_to("ZA", "standard"));
        assert!(!rule.applies_to("GB", "tfsa"));
    }
}
