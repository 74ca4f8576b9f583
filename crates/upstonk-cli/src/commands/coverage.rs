use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use upstonk_core::{AccountMatrix, AppConfig};

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct CoverageResponseData {
    reference_version: String,
    supported: BTreeMap<String, Vec<String>>,
    unrestricted: BTreeMap<String, Vec<String>>,
}

fn to_map(matrix: &AccountMatrix) -> BTreeMap<String, Vec<String>> {
    matrix
        .iter()
        .map(|(country, account_types)| (country.to_owned(), account_types.to_vec()))
        .collect()
}

pub fn run(config: &AppConfig) -> Result<Value, CliError> {
    let reference = &config.reference;
    Ok(serde_json::to_value(CoverageResponseData {
        reference_version: reference.version.clone(),
        supported: to_map(&reference.coverage),
        unrestricted: to_map(&reference.unrestricted_accounts),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_coverage_lists_three_countries() {
        let listing = run(&AppConfig::default()).expect("coverage serializes");
        let supported = listing["supported"].as_object().expect("object");
        assert_eq!(supported.len(), 3);
        assert_eq!(listing["supported"]["ZA"][0], "tfsa");
        assert_eq!(listing["unrestricted"]["GB"][0], "standard");
    }
}
