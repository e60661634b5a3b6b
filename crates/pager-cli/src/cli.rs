//! CLI argument definitions for the pager demo.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "pager",
    version,
    about = "Pager demo - paginate and search an in-memory album catalog",
    long_about = "Drive the pager loading engine against an in-memory album catalog.\n\n\
                  Each catalog request is delayed to simulate a remote service, so\n\
                  de-duplication, pagination and debouncing become visible."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -vvv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Loader settings file (TOML).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Simulated latency of each catalog request, in milliseconds.
    #[arg(long = "latency-ms", default_value_t = 80, global = true)]
    pub latency_ms: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// Page through the catalog until it is exhausted.
    Browse(BrowseArgs),

    /// Type a burst of searches and show which one reached the catalog.
    Search(SearchArgs),
}

#[derive(Parser)]
pub struct BrowseArgs {
    /// Only list albums by this artist.
    #[arg(long = "artist", value_name = "NAME")]
    pub artist: Option<String>,

    /// Albums fetched per page.
    #[arg(long = "page-size", default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub page_size: u16,

    /// Stop after this many pages even if more are available.
    #[arg(long = "max-pages", value_name = "N")]
    pub max_pages: Option<usize>,

    /// Remove albums from the loaded list by id (applied locally, no refetch).
    #[arg(long = "remove", value_name = "ID", value_delimiter = ',')]
    pub remove: Vec<u32>,
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Search texts, typed one after another.
    #[arg(value_name = "TEXT", required = true)]
    pub texts: Vec<String>,

    /// Pause between two keystrokes, in milliseconds.
    #[arg(long = "interval-ms", default_value_t = 150)]
    pub interval_ms: u64,

    /// Override the debounce delay from the config, in milliseconds.
    #[arg(long = "debounce-ms")]
    pub debounce_ms: Option<u64>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_parses_removals() {
        let cli = Cli::try_parse_from([
            "pager", "browse", "--artist", "Miles Davis", "--remove", "4,8", "--page-size", "2",
        ])
        .unwrap();
        let Command::Browse(args) = cli.command else {
            panic!("expected browse");
        };
        assert_eq!(args.artist.as_deref(), Some("Miles Davis"));
        assert_eq!(args.remove, vec![4, 8]);
        assert_eq!(args.page_size, 2);
        assert_eq!(cli.latency_ms, 80);
    }

    #[test]
    fn test_search_requires_text() {
        assert!(Cli::try_parse_from(["pager", "search"]).is_err());
        let cli = Cli::try_parse_from(["pager", "--latency-ms", "5", "search", "b", "bl", "blue"])
            .unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.texts, vec!["b", "bl", "blue"]);
        assert_eq!(cli.latency_ms, 5);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        assert!(Cli::try_parse_from(["pager", "browse", "--page-size", "0"]).is_err());
    }
}
