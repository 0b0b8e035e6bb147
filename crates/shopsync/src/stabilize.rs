//! Page Stabilization Protocol
//!
//! After an action that triggers an asynchronous refresh (filter click,
//! filter removal) the page is considered stable once:
//!
//! 1. the loading overlay is gone,
//! 2. the async-activity probe reports no in-flight requests and a complete document,
//! 3. the container captured before the action has been replaced.
//!
//! Each step has its own budget. In [`StabilizationMode::BestEffort`] a
//! step that times out is logged and recorded, and the protocol moves on.
//! In [`StabilizationMode::Strict`] the first timed-out step is an error.

use crate::catalog::product;
use crate::driver::{ElementHandle, Session};
use crate::locator::Locator;
use crate::result::{SyncError, SyncResult};
use crate::wait::{conditions, WaitOutcome, WaitSpec, Waiter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Default overlay budget (10 seconds)
pub const DEFAULT_OVERLAY_TIMEOUT_MS: u64 = 10_000;

/// Default async-activity budget (15 seconds)
pub const DEFAULT_AJAX_TIMEOUT_MS: u64 = 15_000;

/// Default container-replacement budget (10 seconds)
pub const DEFAULT_REPLACEMENT_TIMEOUT_MS: u64 = 10_000;

/// What a timed-out step means for the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StabilizationMode {
    /// Log, record and continue
    #[default]
    BestEffort,
    /// Fail with `WaitTimeout`
    Strict,
}

/// The three protocol steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StabilizationStep {
    /// Loading overlay absent or invisible
    Overlay,
    /// No in-flight requests, document complete
    AsyncActivity,
    /// Captured container detached
    Replacement,
}

impl fmt::Display for StabilizationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overlay => "loading overlay",
            Self::AsyncActivity => "async activity",
            Self::Replacement => "container replacement",
        })
    }
}

/// Timeouts and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizationConfig {
    /// Budget for the overlay step
    pub overlay_timeout: Duration,
    /// Budget for the async-activity step
    pub ajax_timeout: Duration,
    /// Budget for the replacement step
    pub replacement_timeout: Duration,
    /// Poll cadence for every step
    pub poll_interval: Duration,
    /// Behavior on a timed-out step
    pub mode: StabilizationMode,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            overlay_timeout: Duration::from_millis(DEFAULT_OVERLAY_TIMEOUT_MS),
            ajax_timeout: Duration::from_millis(DEFAULT_AJAX_TIMEOUT_MS),
            replacement_timeout: Duration::from_millis(DEFAULT_REPLACEMENT_TIMEOUT_MS),
            poll_interval: WaitSpec::default().poll_interval(),
            mode: StabilizationMode::BestEffort,
        }
    }
}

impl StabilizationConfig {
    /// Set the mode
    #[must_use]
    pub const fn with_mode(mut self, mode: StabilizationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Same budget for every step
    #[must_use]
    pub const fn with_uniform_timeout(mut self, timeout: Duration) -> Self {
        self.overlay_timeout = timeout;
        self.ajax_timeout = timeout;
        self.replacement_timeout = timeout;
        self
    }

    /// Set the poll cadence
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn waiter(&self, timeout: Duration) -> Waiter {
        Waiter::new(WaitSpec::clamped(timeout, self.poll_interval))
    }
}

/// How one step went
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Which step
    pub step: StabilizationStep,
    /// Whether it completed before its budget
    pub satisfied: bool,
    /// Time spent, in milliseconds
    pub elapsed_ms: u64,
}

/// Record of a settle run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilizationReport {
    /// Steps in the order they ran
    pub steps: Vec<StepOutcome>,
}

impl StabilizationReport {
    /// Every step that ran completed in time
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.steps.iter().all(|s| s.satisfied)
    }

    /// Steps that timed out
    #[must_use]
    pub fn timed_out(&self) -> Vec<StabilizationStep> {
        self.steps
            .iter()
            .filter(|s| !s.satisfied)
            .map(|s| s.step)
            .collect()
    }
}

/// Container captured before an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    container: Option<ElementHandle>,
}

impl Snapshot {
    /// Snapshot without a container; the replacement step is skipped
    #[must_use]
    pub const fn empty() -> Self {
        Self { container: None }
    }

    /// The captured container, if one was present
    #[must_use]
    pub const fn container(&self) -> Option<&ElementHandle> {
        self.container.as_ref()
    }
}

/// Runs the protocol over a session
#[derive(Debug, Clone)]
pub struct Stabilizer {
    config: StabilizationConfig,
    overlay: Locator,
    container: Locator,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(StabilizationConfig::default())
    }
}

impl Stabilizer {
    /// Stabilizer for the product listing (`.loading-mask` over the product grid)
    #[must_use]
    pub fn new(config: StabilizationConfig) -> Self {
        Self {
            config,
            overlay: product::LOADING_MASK,
            container: product::PRODUCT_GRID,
        }
    }

    /// Watch a different overlay and container
    #[must_use]
    pub fn watching(mut self, overlay: Locator, container: Locator) -> Self {
        self.overlay = overlay;
        self.container = container;
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &StabilizationConfig {
        &self.config
    }

    /// Snapshot the container before an action
    pub fn capture<S: Session + ?Sized>(&self, session: &S) -> Snapshot {
        let container = conditions::present(session, &self.container);
        debug!(container = ?container, "captured container");
        Snapshot { container }
    }

    /// Wait for the page to settle after an action
    ///
    /// # Errors
    ///
    /// In strict mode, `WaitTimeout` for the first step that timed out.
    pub fn settle<S: Session + ?Sized>(
        &self,
        session: &S,
        snapshot: &Snapshot,
    ) -> SyncResult<StabilizationReport> {
        let mut report = StabilizationReport::default();

        let overlay = self
            .config
            .waiter(self.config.overlay_timeout)
            .until_invisible(session, &self.overlay);
        self.record(&mut report, StabilizationStep::Overlay, &overlay)?;

        let activity = self.config.waiter(self.config.ajax_timeout).wait_for(
            "async activity to finish",
            || match session.async_activity() {
                Ok(activity) => activity.is_quiescent(),
                Err(e) => {
                    debug!(error = %e, "async probe failed");
                    false
                }
            },
        );
        self.record(&mut report, StabilizationStep::AsyncActivity, &activity)?;

        if let Some(container) = snapshot.container() {
            let replaced = self
                .config
                .waiter(self.config.replacement_timeout)
                .until_detached(session, container);
            self.record(&mut report, StabilizationStep::Replacement, &replaced)?;
        }

        Ok(report)
    }

    fn record(
        &self,
        report: &mut StabilizationReport,
        step: StabilizationStep,
        outcome: &WaitOutcome,
    ) -> SyncResult<()> {
        report.steps.push(StepOutcome {
            step,
            satisfied: outcome.satisfied,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        });
        if outcome.satisfied {
            debug!(%step, polls = outcome.polls, "step settled");
            return Ok(());
        }
        match self.config.mode {
            StabilizationMode::BestEffort => {
                warn!(%step, waited_ms = outcome.elapsed.as_millis() as u64, "step did not settle, continuing");
                Ok(())
            }
            StabilizationMode::Strict => Err(SyncError::WaitTimeout {
                waited_for: outcome.waited_for.clone(),
                ms: outcome.elapsed.as_millis() as u64,
            }),
        }
    }

    /// Capture, run `action`, then settle
    ///
    /// # Errors
    ///
    /// Errors from `action`, or from [`Stabilizer::settle`] in strict mode.
    pub fn act_and_settle<S, T, F>(&self, session: &S, action: F) -> SyncResult<(T, StabilizationReport)>
    where
        S: Session + ?Sized,
        F: FnOnce() -> SyncResult<T>,
    {
        let snapshot = self.capture(session);
        let value = action()?;
        let report = self.settle(session, &snapshot)?;
        Ok((value, report))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSession};

    fn quick(mode: StabilizationMode) -> Stabilizer {
        Stabilizer::new(
            StabilizationConfig::default()
                .with_uniform_timeout(Duration::from_millis(80))
                .with_poll_interval(Duration::from_millis(5))
                .with_mode(mode),
        )
    }

    fn listing() -> MockSession {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let _ = doc.add(MockNode::new(&product::PRODUCT_GRID));
        });
        session
    }

    #[test]
    fn test_quiet_page_settles_immediately() {
        let session = MockSession::new();
        let report = quick(StabilizationMode::Strict)
            .settle(&session, &Snapshot::empty())
            .unwrap();
        assert!(report.is_settled());
        assert_eq!(report.steps.len(), 2);
    }

    #[test]
    fn test_waits_for_overlay_requests_and_replacement() {
        let session = listing();
        let stabilizer = quick(StabilizationMode::Strict);
        let (_, report) = stabilizer
            .act_and_settle(&session, || {
                session.with_doc(|doc| {
                    let mask = doc.add(MockNode::new(&product::LOADING_MASK));
                    doc.in_flight = Some(1);
                    doc.after(Duration::from_millis(15), move |d| d.node_mut(mask).displayed = false);
                    doc.after(Duration::from_millis(25), |d| d.in_flight = Some(0));
                    doc.after(Duration::from_millis(35), |d| {
                        d.detach_all(&product::PRODUCT_GRID);
                        let _ = d.add(MockNode::new(&product::PRODUCT_GRID));
                    });
                });
                Ok(())
            })
            .unwrap();
        assert!(report.is_settled());
        assert_eq!(
            report.steps.iter().map(|s| s.step).collect::<Vec<_>>(),
            vec![
                StabilizationStep::Overlay,
                StabilizationStep::AsyncActivity,
                StabilizationStep::Replacement
            ]
        );
    }

    #[test]
    fn test_page_without_probe_counts_as_idle() {
        let session = MockSession::new();
        session.with_doc(|doc| doc.in_flight = None);
        let report = quick(StabilizationMode::Strict)
            .settle(&session, &Snapshot::empty())
            .unwrap();
        assert!(report.is_settled());
    }

    #[test]
    fn test_best_effort_records_timeout_and_continues() {
        let session = listing();
        let stabilizer = quick(StabilizationMode::BestEffort);
        let snapshot = stabilizer.capture(&session);
        assert!(snapshot.container().is_some());
        let report = stabilizer.settle(&session, &snapshot).unwrap();
        assert!(!report.is_settled());
        assert_eq!(report.timed_out(), vec![StabilizationStep::Replacement]);
    }

    #[test]
    fn test_strict_fails_on_first_timeout() {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let _ = doc.add(MockNode::new(&product::LOADING_MASK));
        });
        let err = quick(StabilizationMode::Strict)
            .settle(&session, &Snapshot::empty())
            .unwrap_err();
        match err {
            SyncError::WaitTimeout { waited_for, .. } => {
                assert!(waited_for.contains("loading overlay"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_action_error_skips_settle() {
        let session = listing();
        let err = quick(StabilizationMode::Strict)
            .act_and_settle(&session, || -> SyncResult<()> {
                Err(SyncError::not_found("color option 50"))
            })
            .unwrap_err();
        assert!(matches!(err, SyncError::ElementNotFound { .. }));
    }
}
