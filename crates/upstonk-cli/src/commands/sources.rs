use serde::Serialize;
use serde_json::Value;

use upstonk_core::{AppConfig, CircuitState, ProviderId, ProviderRegistryBuilder};

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: ProviderId,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    circuit: Option<CircuitState>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    mock: bool,
    sources: Vec<SourceStatus>,
}

pub fn run(config: &AppConfig) -> Result<Value, CliError> {
    let sources = ProviderRegistryBuilder::from_config(config)
        .build()
        .iter()
        .map(|provider| SourceStatus {
            id: provider.id(),
            name: provider.id().display_name(),
            circuit: provider.circuit_state(),
        })
        .collect();

    Ok(serde_json::to_value(SourcesResponseData {
        mock: config.providers.mock,
        sources,
    })?)
}
