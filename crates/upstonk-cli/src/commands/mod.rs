mod coverage;
mod discover;
mod rules;
mod sources;

use serde_json::Value;
use upstonk_core::AppConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli, config: &AppConfig) -> Result<Value, CliError> {
    match &cli.command {
        Command::Discover(args) => discover::run(args, config).await,
        Command::Rules => rules::run(config),
        Command::Sources => sources::run(config),
        Command::Coverage => coverage::run(config),
    }
}
