//! CLI argument definitions for upstonk.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `discover` | Run a discovery request and print the ranked result bundle |
//! | `rules` | List registered eligibility rules |
//! | `sources` | List configured data providers and their circuit state |
//! | `coverage` | Print supported countries and account types |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | TOML configuration file |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--mock` | `false` | Serve searches from the built-in catalog |
//! | `--timeout-ms` | config | Overall discovery deadline in ms |
//!
//! # Examples
//!
//! ```bash
//! upstonk discover --request demos/request.json --pretty
//! cat demos/request.json | upstonk --mock discover --request -
//! upstonk coverage
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ETF discovery with jurisdiction-aware eligibility checks.
#[derive(Debug, Parser)]
#[command(
    name = "upstonk",
    author,
    version,
    about = "ETF discovery with jurisdiction-aware eligibility checks",
    long_about = "upstonk searches several ETF data sources in parallel, checks each product \
against the eligibility rules of the investor's country and account type, and ranks the \
eligible ones by exposure fit, cost, liquidity, tracking and fund size.\n\
\n\
Use 'upstonk <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use the built-in product catalog instead of live providers.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Overall discovery deadline in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a discovery request.
    ///
    /// The request is camelCase JSON; see demos/request.json.
    ///
    /// # Examples
    ///
    ///   upstonk discover --request demos/request.json
    ///   upstonk --mock discover --request - < demos/request.json
    Discover(DiscoverArgs),

    /// List registered eligibility rules in evaluation order.
    Rules,

    /// List configured data providers.
    Sources,

    /// Print the supported country and account type matrix.
    Coverage,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Request file, or `-` to read from stdin.
    #[arg(long, short)]
    pub request: String,
}
