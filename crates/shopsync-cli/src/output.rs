//! Terminal output

use console::{style, Style, Term};
use shopsync::{RunReport, ScenarioOutcome};

/// Writes scenario results to the terminal
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Reporter {
    /// Reporter on stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// One line per outcome; failures are printed even in quiet mode
    pub fn outcome(&self, outcome: &ScenarioOutcome) {
        if outcome.passed {
            if self.quiet {
                return;
            }
            let prefix = if self.use_color {
                style("✓").green().bold().to_string()
            } else {
                "PASS".to_string()
            };
            let _ = self
                .term
                .write_line(&format!("{prefix} {} ({}ms)", outcome.name, outcome.elapsed_ms));
            return;
        }

        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self
            .term
            .write_line(&format!("{prefix} {} ({}ms)", outcome.name, outcome.elapsed_ms));
        if let Some(diagnostic) = &outcome.diagnostic {
            let step = outcome.steps.last().map_or("", String::as_str);
            let _ = self.term.write_line(&format!("    at {step:?}: {diagnostic}"));
        }
    }

    /// Closing summary line
    pub fn summary(&self, report: &RunReport) {
        if self.quiet && report.all_passed() {
            return;
        }
        let total = report.outcomes.len();
        let passed = report.passed_count();
        let failed = report.failed_count();
        let seconds = report.total_ms() as f64 / 1000.0;
        let line = if self.use_color {
            let status = if failed > 0 {
                Style::new().red().bold().apply_to("FAILED")
            } else {
                Style::new().green().bold().apply_to("PASSED")
            };
            format!("{status} {total} scenarios in {seconds:.2}s ({passed} passed, {failed} failed)")
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            format!("{status} {total} scenarios in {seconds:.2}s ({passed} passed, {failed} failed)")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&line);
    }

    /// Plain line, suppressed in quiet mode
    pub fn line(&self, text: &str) {
        if !self.quiet {
            let _ = self.term.write_line(text);
        }
    }
}
