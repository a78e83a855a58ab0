//! Selfheal CLI Library
//!
//! Command-line front end for the selfheal engine. Pages are read from HTML
//! files; the element tables live in a store directory (`resources/` unless
//! `--store` says otherwise).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, FormatArg, HealArgs, LocateArgs, PageArgs, RecordArgs,
    ScrapeArgs, ThresholdArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult, EXIT_NOT_HEALED};
pub use output::{OutputFormat, Reporter};

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Build the CLI configuration from parsed arguments
#[must_use]
pub fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_store(cli.store.clone())
        .with_heal_config(cli.config.clone())
        .with_log_json(cli.log_json)
}

/// Log filter: `-v`/`-q` win, then `RUST_LOG`, then the default level
#[must_use]
pub fn log_filter(verbosity: Verbosity) -> EnvFilter {
    if verbosity == Verbosity::Normal {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()))
    } else {
        EnvFilter::new(verbosity.log_directive())
    }
}

/// Install the stderr log subscriber. Returns `false` when a global
/// subscriber was already set; that one stays in place.
pub fn init_logging(config: &CliConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(config.verbosity))
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder
            .with_ansi(config.color.should_color())
            .try_init()
    };
    installed.is_ok()
}

/// Run a parsed command line
pub fn run(cli: &Cli) -> CliResult<()> {
    let config = build_config(cli);
    if !init_logging(&config) {
        debug!("Keeping the log subscriber already installed");
    }
    let mut reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match &cli.command {
        Commands::Scrape(args) => handlers::run_scrape(&config, &reporter, args),
        Commands::Record(args) => handlers::run_record(&config, &mut reporter, args),
        Commands::Locate(args) => handlers::run_locate(&config, &reporter, args),
        Commands::Heal(args) => handlers::run_heal(&config, &reporter, args),
        Commands::Config(args) => handlers::run_config(&config, &reporter, args),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_build_config_from_flags() {
        let cli = Cli::try_parse_from([
            "selfheal", "-q", "--color", "never", "--store", "/tmp/st", "--log-json", "config",
        ])
        .unwrap();
        let config = build_config(&cli);
        assert_eq!(config.verbosity, Verbosity::Quiet);
        assert_eq!(config.color, ColorChoice::Never);
        assert_eq!(config.store(), std::path::Path::new("/tmp/st"));
        assert!(config.log_json);
    }

    #[test]
    fn test_second_logging_init_keeps_first_subscriber() {
        let config = CliConfig::new().with_color(ColorChoice::Never);
        init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn test_explicit_verbosity_sets_filter() {
        let filter = log_filter(Verbosity::Debug);
        assert_eq!(filter.to_string(), "debug");
    }
}
