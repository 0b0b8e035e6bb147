//! Shopsync CLI: synchronized storefront scenarios
//!
//! ## Usage
//!
//! ```bash
//! shopsync run -c run.yaml                    # Whole suite
//! shopsync run -c run.yaml -s filter -s login # Selected scenarios
//! shopsync run -c run.yaml --format junit -o junit.xml
//! shopsync check-config -c run.yaml
//! shopsync parse-price '$1,234.56'
//! ```

use clap::Parser;
use shopsync::Scenario;
use shopsync_cli::{
    logging, runner, CheckConfigArgs, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands,
    ParsePriceArgs, Reporter, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity, cli.log_format);
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match cli.command {
        Commands::Run(args) => {
            let report = runner::run(&args, &reporter)?;
            if report.all_passed() {
                Ok(())
            } else {
                Err(CliError::ScenariosFailed {
                    failed: report.failed_count(),
                    total: report.outcomes.len(),
                })
            }
        }
        Commands::CheckConfig(args) => run_check_config(&args, &reporter),
        Commands::Scenarios => {
            for scenario in Scenario::ALL {
                println!("{scenario}");
            }
            Ok(())
        }
        Commands::ParsePrice(args) => run_parse_price(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
}

fn run_check_config(args: &CheckConfigArgs, reporter: &Reporter) -> CliResult<()> {
    let config = runner::load_config(&args.config, false, false)?;
    reporter.line(&format!("Config valid: {}", args.config.display()));
    reporter.line(&format!("  Base URL: {}", config.base_url));
    reporter.line(&format!(
        "  Wait: {}ms every {}ms, {} attempt(s) on stale elements",
        config.default_timeout, config.poll_interval, config.retry_attempts
    ));
    reporter.line(&format!(
        "  Stabilization: overlay {}ms, ajax {}ms, replacement {}ms ({})",
        config.stabilization.overlay_timeout,
        config.stabilization.ajax_timeout,
        config.stabilization.replacement_timeout,
        if config.strict_stabilization { "strict" } else { "best effort" }
    ));
    reporter.line(&format!(
        "  Credentials: {}",
        config
            .credentials
            .as_ref()
            .map_or("none", |c| c.email.as_str())
    ));
    Ok(())
}

fn run_parse_price(args: &ParsePriceArgs) -> CliResult<()> {
    let mut rejected = 0;
    for (raw, parsed) in runner::parse_prices(&args.raw) {
        match parsed {
            Ok(price) => println!("{raw}\t{price}"),
            Err(e) => {
                rejected += 1;
                eprintln!("{raw}\t{e}");
            }
        }
    }
    if rejected == 0 {
        Ok(())
    } else {
        Err(CliError::invalid_argument(format!(
            "{rejected} price(s) could not be parsed"
        )))
    }
}
