mod cli;
mod commands;
mod error;

use std::process::ExitCode;

use clap::Parser;
use upstonk_core::AppConfig;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.mock {
        config.providers.mock = true;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request.deadline_ms = timeout_ms;
    }
    config.validate()?;
    config.logging.init()?;

    let output = commands::run(&cli, &config).await?;
    let payload = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{payload}");

    Ok(())
}
