//! Suite reports: text summary, JSON and JUnit XML

use crate::result::SyncResult;
use crate::scenario::ScenarioOutcome;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Outcomes of one suite run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Suite name
    pub suite_name: String,
    /// Scenario outcomes in run order
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    /// Report over `outcomes`
    #[must_use]
    pub fn new(suite_name: impl Into<String>, outcomes: Vec<ScenarioOutcome>) -> Self {
        Self {
            suite_name: suite_name.into(),
            outcomes,
        }
    }

    /// Number of passing scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// Number of failing scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.passed_count()
    }

    /// Every scenario passed (vacuously true for an empty run)
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Total wall time in milliseconds
    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.outcomes.iter().map(|o| o.elapsed_ms).sum()
    }

    /// Failing outcomes
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed).collect()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed",
            self.suite_name,
            self.passed_count(),
            self.outcomes.len()
        )
    }

    /// Human-readable report, one line per scenario plus diagnostics
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            let mark = if outcome.passed { '✓' } else { '✗' };
            let _ = writeln!(out, "{mark} {} ({}ms)", outcome.name, outcome.elapsed_ms);
            if let Some(diagnostic) = &outcome.diagnostic {
                let step = outcome.steps.last().map_or("", String::as_str);
                let _ = writeln!(out, "    at step {step:?}: {diagnostic}");
            }
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }

    /// Pretty JSON
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" tests="{}" failures="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.outcomes.len(),
            self.failed_count(),
            self.total_ms() as f64 / 1000.0
        );
        for outcome in &self.outcomes {
            let _ = writeln!(
                xml,
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&outcome.name),
                outcome.elapsed_ms as f64 / 1000.0
            );
            if let Some(diagnostic) = &outcome.diagnostic {
                let _ = writeln!(
                    xml,
                    r#"    <failure message="{}">{}</failure>"#,
                    escape_xml(diagnostic),
                    escape_xml(&outcome.steps.join(" > "))
                );
            }
            xml.push_str("  </testcase>\n");
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write JUnit XML to `path`
    pub fn write_junit(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        std::fs::write(path, self.render_junit())?;
        Ok(())
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;

    fn outcome(name: &str, failure: Option<&str>) -> ScenarioOutcome {
        ScenarioOutcome {
            name: name.to_string(),
            passed: failure.is_none(),
            diagnostic: failure.map(str::to_string),
            error: failure.map(|_| ErrorKind::AssertionFailure),
            steps: vec!["sign in".into(), "verify order total".into()],
            elapsed_ms: 1500,
            phase: None,
        }
    }

    fn mixed() -> RunReport {
        RunReport::new(
            "storefront",
            vec![
                outcome("login", None),
                outcome("checkout", Some("total <60.00> != 59.99")),
            ],
        )
    }

    #[test]
    fn test_counts() {
        let report = mixed();
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.all_passed());
        assert_eq!(report.failures()[0].name, "checkout");
        assert_eq!(report.total_ms(), 3000);
        assert_eq!(report.summary(), "storefront: 1/2 passed");
    }

    #[test]
    fn test_empty_run_passes() {
        assert!(RunReport::default().all_passed());
    }

    #[test]
    fn test_text_marks_and_diagnostic() {
        let text = mixed().render_text();
        assert!(text.contains("✓ login"));
        assert!(text.contains("✗ checkout"));
        assert!(text.contains("at step \"verify order total\""));
    }

    #[test]
    fn test_json_parses_back() {
        let report = mixed();
        let back: RunReport = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_json_carries_phase_only_when_set() {
        let mut report = mixed();
        assert!(!report.to_json().unwrap().contains("\"phase\""));
        report.outcomes[1].phase = Some(crate::verify::ScenarioPhase::Failed);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"phase\": \"Failed\""));
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.outcomes[1].phase, Some(crate::verify::ScenarioPhase::Failed));
    }

    #[test]
    fn test_junit_escapes_failure() {
        let xml = mixed().render_junit();
        assert!(xml.contains(r#"tests="2" failures="1""#));
        assert!(xml.contains("total &lt;60.00&gt; != 59.99"));
        assert!(xml.contains("sign in &gt; verify order total"));
    }

    #[test]
    fn test_write_junit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junit.xml");
        mixed().write_junit(&path).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().starts_with("<?xml"));
    }
}
