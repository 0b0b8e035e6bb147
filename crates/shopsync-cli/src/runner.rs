//! Scenario runner behind the `run` command

use crate::commands::{ReportFormat, RunArgs};
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use shopsync::{Price, RunConfig, RunReport, Scenario, ScenarioOutcome};
use std::path::Path;
use tracing::info;

/// Scenarios named on the command line, or the whole suite
pub fn selected_scenarios(names: &[String]) -> CliResult<Vec<Scenario>> {
    if names.is_empty() {
        return Ok(Scenario::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| {
            name.parse::<Scenario>().map_err(|_| {
                let known: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
                CliError::invalid_argument(format!(
                    "unknown scenario {name:?} (known: {})",
                    known.join(", ")
                ))
            })
        })
        .collect()
}

/// Load and validate the run configuration, then apply command-line overrides
pub fn load_config(path: &Path, strict: bool, headed: bool) -> CliResult<RunConfig> {
    if !path.is_file() {
        return Err(CliError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let mut config = RunConfig::load(path)?;
    config.strict_stabilization |= strict;
    if headed {
        config.browser.headless = false;
    }
    Ok(config)
}

/// Render a report in the requested format
pub fn render(report: &RunReport, format: ReportFormat) -> CliResult<String> {
    Ok(match format {
        ReportFormat::Text => report.render_text(),
        ReportFormat::Json => report.to_json()?,
        ReportFormat::Junit => report.render_junit(),
    })
}

/// Parse each raw price; `Err` carries the rejection message
pub fn parse_prices(raw: &[String]) -> Vec<(String, Result<Price, String>)> {
    raw.iter()
        .map(|r| (r.clone(), Price::parse(r).map_err(|e| e.to_string())))
        .collect()
}

/// Execute the `run` command
pub fn run(args: &RunArgs, reporter: &Reporter) -> CliResult<RunReport> {
    let scenarios = selected_scenarios(&args.scenarios)?;
    let config = load_config(&args.config, args.strict, args.headed)?;
    info!(base_url = %config.base_url, scenarios = scenarios.len(), "starting run");

    let outcomes = execute(&config, &scenarios)?;
    let report = RunReport::new("storefront", outcomes);
    if args.format == ReportFormat::Text {
        for outcome in &report.outcomes {
            reporter.outcome(outcome);
        }
        reporter.summary(&report);
    } else {
        reporter.line(&render(&report, args.format)?);
    }

    if let Some(path) = &args.output {
        std::fs::write(path, render(&report, args.format)?)?;
        info!(path = %path.display(), "report written");
    }
    Ok(report)
}

#[cfg(feature = "browser")]
fn execute(config: &RunConfig, scenarios: &[Scenario]) -> CliResult<Vec<ScenarioOutcome>> {
    use shopsync::scenario::run_suite;
    use shopsync::{CdpSession, ScenarioContext};

    let ctx = ScenarioContext::new(config.clone());
    Ok(run_suite(&ctx, scenarios, || CdpSession::launch(&config.browser)))
}

#[cfg(not(feature = "browser"))]
fn execute(_config: &RunConfig, _scenarios: &[Scenario]) -> CliResult<Vec<ScenarioOutcome>> {
    Err(CliError::BrowserUnavailable)
}
