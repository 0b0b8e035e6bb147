//! Shopsync CLI library
//!
//! Command-line front end for the shopsync engine: loads a run
//! configuration, runs storefront scenarios on fresh browser sessions and
//! reports the outcomes.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod runner;

pub use commands::{
    CheckConfigArgs, Cli, ColorArg, Commands, LogFormat, ParsePriceArgs, ReportFormat, RunArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Reporter;
