//! CLI argument definitions for ferrodash.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `inspect` | Discover and normalize a saved JSON payload offline |
//! | `discover` | Fetch an endpoint and list its addressable fields |
//! | `fetch` | Fetch an endpoint through the cache and normalize it |
//! | `watch` | Poll an endpoint on a refresh interval |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--relay-url` | unset | Route requests through a relay (`/api/proxy`) |
//! | `--timeout-ms` | unset | Per-request timeout in ms |
//!
//! # Examples
//!
//! ```bash
//! # Inspect a saved response
//! ferrodash inspect response.json --pretty
//!
//! # List array fields of an API for a table widget
//! ferrodash discover https://api.github.com/repos/rust-lang/rust/issues --mode table
//!
//! # Chart a daily series
//! ferrodash fetch "https://www.alphavantage.co/query?function=TIME_SERIES_DAILY&symbol=IBM&apikey=demo" --mode chart
//!
//! # Poll exchange rates every 10 seconds, three times
//! ferrodash watch "https://api.coinbase.com/v2/exchange-rates?currency=BTC" --interval-secs 10 --count 3
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ferrodash_core::DisplayMode;

/// Upper bound for `--ttl-secs` and `--interval-secs` (one year).
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// ferrodash - turn any JSON API into dashboard-ready records
#[derive(Debug, Parser)]
#[command(
    name = "ferrodash",
    author,
    version,
    about = "Discover, cache and normalize arbitrary JSON APIs",
    long_about = "ferrodash fetches JSON from arbitrary HTTP APIs, detects its shape \
(time series, crypto rates, generic arrays) and normalizes it into records a card, \
table or chart can render.\n\
\n\
Logs are written to stderr; set RUST_LOG to adjust verbosity."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Relay base URL; requests go to `<relay>?url=..&headers=..`.
    ///
    /// Falls back to FERRODASH_RELAY_URL.
    #[arg(long, global = true)]
    pub relay_url: Option<String>,

    /// Per-request timeout in milliseconds. Falls back to FERRODASH_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect, list fields and normalize a JSON payload from a file or stdin.
    Inspect(InspectArgs),
    /// Fetch an endpoint, bypassing the cache, and list its fields.
    Discover(DiscoverArgs),
    /// Fetch an endpoint and normalize the response.
    Fetch(FetchArgs),
    /// Refresh an endpoint on an interval, one NDJSON line per update.
    Watch(WatchArgs),
}

/// Widget display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Card,
    Table,
    Chart,
}

impl From<ModeArg> for DisplayMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Card => Self::Card,
            ModeArg::Table => Self::Table,
            ModeArg::Chart => Self::Chart,
        }
    }
}

/// Endpoint and request headers shared by the network commands.
#[derive(Debug, Clone, Args)]
pub struct EndpointArgs {
    /// API endpoint URL.
    pub url: String,

    /// Request header as 'Name: value'. Repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// JSON file to read; stdin when omitted.
    pub file: Option<PathBuf>,

    /// Field to select. Repeatable.
    #[arg(long = "field")]
    pub fields: Vec<String>,

    #[arg(long, value_enum, default_value_t = ModeArg::Card)]
    pub mode: ModeArg,
}

#[derive(Debug, Clone, Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Case-insensitive path filter.
    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long, value_enum, default_value_t = ModeArg::Card)]
    pub mode: ModeArg,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Cache lifetime in seconds; 0 uses the default.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(0..=MAX_DURATION_SECS))]
    pub ttl_secs: u64,

    /// Field to select. Repeatable.
    #[arg(long = "field")]
    pub fields: Vec<String>,

    #[arg(long, value_enum, default_value_t = ModeArg::Card)]
    pub mode: ModeArg,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Refresh interval in seconds.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=MAX_DURATION_SECS))]
    pub interval_secs: u64,

    /// Stop after this many updates; runs until interrupted when omitted.
    #[arg(long)]
    pub count: Option<u64>,

    /// Field to select. Repeatable.
    #[arg(long = "field")]
    pub fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_parses_repeated_headers_and_fields() {
        let cli = Cli::try_parse_from([
            "ferrodash",
            "fetch",
            "https://api.test",
            "-H",
            "X-Api-Key: k",
            "--header",
            "Accept: application/json",
            "--field",
            "close",
            "--mode",
            "chart",
            "--pretty",
        ])
        .expect("parses");

        assert!(cli.pretty);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch command");
        };
        assert_eq!(args.endpoint.headers.len(), 2);
        assert_eq!(args.fields, ["close"]);
        assert_eq!(args.mode, ModeArg::Chart);
        assert_eq!(args.ttl_secs, 30);
    }

    #[test]
    fn watch_rejects_zero_interval() {
        let parsed = Cli::try_parse_from([
            "ferrodash",
            "watch",
            "https://api.test",
            "--interval-secs",
            "0",
        ]);

        assert!(parsed.is_err());
    }

    #[test]
    fn fetch_rejects_ttl_beyond_one_year() {
        let parsed = Cli::try_parse_from([
            "ferrodash",
            "fetch",
            "https://api.test",
            "--ttl-secs",
            "99999999999999",
        ]);

        assert!(parsed.is_err());
    }
}
