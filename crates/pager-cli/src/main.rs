//! Pager demo CLI.

use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use pager_cli::catalog::Catalog;
use pager_cli::commands::{run_browse, run_search};
use pager_cli::logging::{LogConfig, LogFormat, init_logging};
use pager_cli::types::{BrowseOptions, SearchOptions};
use pager_engine::LoaderConfig;
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{BrowseArgs, Cli, Command, LogFormatArg, LogLevelArg, SearchArgs};
use crate::summary::{print_browse, print_search};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => LoaderConfig::load_from(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    let catalog = Catalog::demo().with_latency(Duration::from_millis(cli.latency_ms));
    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;

    match cli.command {
        Command::Browse(args) => {
            let report = runtime.block_on(run_browse(&catalog, &config, &browse_options(args)))?;
            print_browse(&report);
        }
        Command::Search(args) => {
            let report = runtime.block_on(run_search(&catalog, &config, &search_options(args)))?;
            print_search(&report);
        }
    }
    Ok(())
}

fn browse_options(args: BrowseArgs) -> BrowseOptions {
    BrowseOptions {
        artist: args.artist,
        page_size: usize::from(args.page_size),
        max_pages: args.max_pages,
        remove: args.remove,
    }
}

fn search_options(args: SearchArgs) -> SearchOptions {
    SearchOptions {
        texts: args.texts,
        interval: Duration::from_millis(args.interval_ms),
        debounce_ms: args.debounce_ms,
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
