use std::fs;
use std::io;

use serde_json::Value;
use tracing::debug;
use upstonk_core::{discovery_service, AppConfig, DiscoveryRequest, ProviderRegistryBuilder};

use crate::cli::DiscoverArgs;
use crate::error::CliError;

pub async fn run(args: &DiscoverArgs, config: &AppConfig) -> Result<Value, CliError> {
    let raw = if args.request == "-" {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(&args.request)?
    };
    let request = parse_request(&raw, config)?;
    debug!(
        country = request.country(),
        account_type = request.account_type(),
        "discovery request accepted"
    );

    let providers = ProviderRegistryBuilder::from_config(config).build();
    let service = discovery_service(config, providers);
    let response = service.discover(&request).await?;

    Ok(serde_json::to_value(response)?)
}

/// Decodes and validates a request against the configured coverage.
fn parse_request(raw: &str, config: &AppConfig) -> Result<DiscoveryRequest, CliError> {
    let request: DiscoveryRequest = serde_json::from_str(raw).map_err(CliError::InvalidRequest)?;
    request.validate(&config.reference.coverage)?;
    Ok(request)
}
