//! CLI command definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::output::OutputFormat;

/// Selfheal: recover broken browser-test locators
#[derive(Parser, Debug)]
#[command(name = "selfheal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Directory holding the element tables
    #[arg(long, global = true, env = "SELFHEAL_STORE", default_value = "resources")]
    pub store: PathBuf,

    /// Healing configuration file (YAML or JSON)
    #[arg(short, long, global = true, env = "SELFHEAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape a page into the current-page table
    Scrape(ScrapeArgs),

    /// Record elements found by locator into the historical table
    Record(RecordArgs),

    /// Find an element, healing the locator if it no longer resolves
    Locate(LocateArgs),

    /// Propose a replacement for a stale locator from the stored tables
    Heal(HealArgs),

    /// Show or write the healing configuration
    Config(ConfigArgs),
}

/// The page a command works on
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// HTML file holding the page source
    #[arg(value_name = "PAGE")]
    pub page: PathBuf,

    /// URL recorded for the page (defaults to the file path)
    #[arg(long)]
    pub url: Option<String>,
}

impl PageArgs {
    /// URL to record for the page
    #[must_use]
    pub fn effective_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.page.display().to_string())
    }
}

/// Arguments for the scrape command
#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Page to scrape
    #[command(flatten)]
    pub page: PageArgs,

    /// Tags to scrape, comma-separated (overrides the configuration)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Record each element's bounding rectangle
    #[arg(long)]
    pub capture_rect: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the record command
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Page the elements are on
    #[command(flatten)]
    pub page: PageArgs,

    /// Locators of the elements to record
    #[arg(required = true, num_args = 1..)]
    pub locators: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the locate command
#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Page to search
    #[command(flatten)]
    pub page: PageArgs,

    /// Locator to find
    pub locator: String,

    /// Do not write found elements to the historical table
    #[arg(long)]
    pub no_record: bool,

    /// Threshold settings
    #[command(flatten)]
    pub threshold: ThresholdArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the heal command
#[derive(Args, Debug)]
pub struct HealArgs {
    /// Stale locator
    pub locator: String,

    /// Threshold settings
    #[command(flatten)]
    pub threshold: ThresholdArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Overrides for the acceptance threshold
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ThresholdArgs {
    /// Minimum similarity in [0, 1] for a replacement to be accepted
    #[arg(long, conflicts_with = "no_threshold")]
    pub threshold: Option<f64>,

    /// Accept the closest element whatever its similarity
    #[arg(long)]
    pub no_threshold: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective configuration as YAML to this path
    #[arg(long)]
    pub write: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}
