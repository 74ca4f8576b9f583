use serde::Serialize;
use serde_json::Value;

use upstonk_core::{AppConfig, EligibilityEngine, RuleDescriptor};

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct RulesResponseData {
    reference_version: String,
    /// Evaluation order: the first rule that applies wins.
    rules: Vec<RuleDescriptor>,
}

pub fn run(config: &AppConfig) -> Result<Value, CliError> {
    let engine = EligibilityEngine::from_reference(&config.reference);
    Ok(serde_json::to_value(RulesResponseData {
        reference_version: config.reference.version.clone(),
        rules: engine.descriptors(),
    })?)
}
