//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shopsync: synchronized end-to-end scenarios for the Luma storefront
#[derive(Parser, Debug)]
#[command(name = "shopsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "compact", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run storefront scenarios in a browser
    Run(RunArgs),

    /// Validate a run configuration
    CheckConfig(CheckConfigArgs),

    /// List the available scenarios
    Scenarios,

    /// Parse displayed prices the way verification does
    ParsePrice(ParsePriceArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Run configuration (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Scenario to run (repeatable; default: all, in suite order)
    #[arg(short, long = "scenario")]
    pub scenarios: Vec<String>,

    /// Fail a step when the page does not settle
    #[arg(long)]
    pub strict: bool,

    /// Run the browser with a window
    #[arg(long)]
    pub headed: bool,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: ReportFormat,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the check-config command
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Run configuration (YAML)
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Arguments for the parse-price command
#[derive(Parser, Debug)]
pub struct ParsePriceArgs {
    /// Displayed price text, e.g. "$1,234.56"
    #[arg(required = true)]
    pub raw: Vec<String>,
}

/// Report format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON
    Json,
    /// JUnit XML
    Junit,
}

/// Log line format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One compact line per event
    #[default]
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
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
