//! Condition Poller
//!
//! The single wait primitive of the engine: evaluate a predicate against
//! live page state at a fixed cadence until it holds or a deadline passes.
//! Every higher-level wait (visibility, staleness, title, async activity)
//! is a predicate handed to [`poll`]; there are no bespoke wait loops.
//!
//! A timed-out poll is a value (`false` / unsatisfied [`WaitOutcome`]), not
//! an error. Callers that need a hard guarantee use [`Waiter::require`].

use crate::driver::{ElementHandle, Session, SessionExt};
use crate::locator::Locator;
use crate::result::{SyncError, SyncResult};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT SPEC
// =============================================================================

/// Timeout and cadence of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitSpec {
    /// Create a wait spec.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `poll_interval` exceeds `timeout`.
    pub fn new(timeout: Duration, poll_interval: Duration) -> SyncResult<Self> {
        if poll_interval > timeout {
            return Err(SyncError::config(format!(
                "poll interval {}ms exceeds timeout {}ms",
                poll_interval.as_millis(),
                timeout.as_millis()
            )));
        }
        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    /// Create a wait spec from milliseconds
    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> SyncResult<Self> {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_interval_ms),
        )
    }

    /// Like [`WaitSpec::new`], but shrinks the interval to fit the timeout
    #[must_use]
    pub fn clamped(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.min(timeout),
        }
    }

    /// Same cadence, different timeout; the interval shrinks if it would exceed it
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: self.poll_interval.min(timeout),
        }
    }

    /// Total time budget
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between predicate evaluations
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    /// Whether the condition held before the deadline
    pub satisfied: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of predicate evaluations
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll until `probe` yields a value or the deadline passes.
///
/// The final sleep is clamped to the remaining budget, so the call returns
/// within `timeout + poll_interval` as long as a single probe is fast.
pub fn poll_for<T, F>(mut probe: F, spec: &WaitSpec) -> (Option<T>, u32, Duration)
where
    F: FnMut() -> Option<T>,
{
    let start = Instant::now();
    let deadline = start + spec.timeout;
    let mut polls = 0u32;

    loop {
        polls += 1;
        if let Some(value) = probe() {
            return (Some(value), polls, start.elapsed());
        }
        let now = Instant::now();
        if now >= deadline {
            return (None, polls, start.elapsed());
        }
        std::thread::sleep(spec.poll_interval.min(deadline - now));
    }
}

/// Poll `predicate` until it returns true (`true`) or the timeout elapses (`false`)
pub fn poll<F>(mut predicate: F, spec: &WaitSpec) -> bool
where
    F: FnMut() -> bool,
{
    poll_for(|| predicate().then_some(()), spec).0.is_some()
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Probes over live page state.
///
/// Reading a stale or missing element means "not yet"; transport faults are
/// logged and also treated as "not yet" so a flaky read cannot abort a wait.
pub mod conditions {
    use super::*;

    fn settle_read<T>(what: &Locator, read: SyncResult<Option<T>>) -> Option<T> {
        match read {
            Ok(value) => value,
            Err(SyncError::StaleReference { .. } | SyncError::ElementNotFound { .. }) => None,
            Err(e) => {
                debug!(locator = %what, error = %e, "condition read failed");
                None
            }
        }
    }

    /// First match of `locator`
    pub fn present<S: Session + ?Sized>(session: &S, locator: &Locator) -> Option<ElementHandle> {
        settle_read(
            locator,
            session.resolve_all(locator).map(|h| h.into_iter().next()),
        )
    }

    /// First displayed match of `locator`
    pub fn visible<S: Session + ?Sized>(session: &S, locator: &Locator) -> Option<ElementHandle> {
        let read = session.resolve_all(locator).and_then(|handles| {
            for handle in handles {
                if session.is_displayed(&handle)? {
                    return Ok(Some(handle));
                }
            }
            Ok(None)
        });
        settle_read(locator, read)
    }

    /// First displayed and enabled match of `locator`
    pub fn clickable<S: Session + ?Sized>(session: &S, locator: &Locator) -> Option<ElementHandle> {
        let read = session.resolve_all(locator).and_then(|handles| {
            for handle in handles {
                if session.is_displayed(&handle)? && session.is_enabled(&handle)? {
                    return Ok(Some(handle));
                }
            }
            Ok(None)
        });
        settle_read(locator, read)
    }

    /// No match of `locator` is displayed (absent counts as invisible)
    pub fn invisible<S: Session + ?Sized>(session: &S, locator: &Locator) -> bool {
        match session.resolve_all(locator) {
            Ok(handles) => handles.iter().all(|h| match session.is_displayed(h) {
                Ok(shown) => !shown,
                Err(SyncError::StaleReference { .. }) => true,
                Err(e) => {
                    debug!(locator = %locator, error = %e, "visibility read failed");
                    false
                }
            }),
            Err(e) => {
                debug!(locator = %locator, error = %e, "resolution failed");
                false
            }
        }
    }

    /// The handle no longer points into the document
    pub fn detached<S: Session + ?Sized>(session: &S, handle: &ElementHandle) -> bool {
        match session.is_attached(handle) {
            Ok(attached) => !attached,
            Err(e) => {
                debug!(handle = %handle, error = %e, "attachment read failed");
                false
            }
        }
    }

    /// Exactly `expected` matches of `locator` are attached
    pub fn count_equals<S: Session + ?Sized>(session: &S, locator: &Locator, expected: usize) -> bool {
        settle_read(locator, session.count(locator).map(Some)) == Some(expected)
    }

    /// Page title contains `fragment`
    pub fn title_contains<S: Session + ?Sized>(session: &S, fragment: &str) -> bool {
        session.title().is_ok_and(|t| t.contains(fragment))
    }
}

// =============================================================================
// WAITER
// =============================================================================

/// Named waits over a session, all expressed through [`poll`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    spec: WaitSpec,
}

impl Waiter {
    /// Create a waiter with the given spec
    #[must_use]
    pub const fn new(spec: WaitSpec) -> Self {
        Self { spec }
    }

    /// The spec in use
    #[must_use]
    pub const fn spec(&self) -> &WaitSpec {
        &self.spec
    }

    /// Same cadence, different timeout
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            spec: self.spec.with_timeout(timeout),
        }
    }

    /// Wait for a predicate; never errors
    pub fn wait_for<F>(&self, waited_for: impl Into<String>, predicate: F) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        let mut predicate = predicate;
        let waited_for = waited_for.into();
        let (hit, polls, elapsed) = poll_for(|| predicate().then_some(()), &self.spec);
        let satisfied = hit.is_some();
        trace!(%waited_for, satisfied, polls, elapsed_ms = elapsed.as_millis() as u64, "wait finished");
        WaitOutcome {
            satisfied,
            elapsed,
            polls,
            waited_for,
        }
    }

    /// Wait for a predicate; timing out is a `WaitTimeout` error
    pub fn require<F>(&self, waited_for: impl Into<String>, predicate: F) -> SyncResult<WaitOutcome>
    where
        F: FnMut() -> bool,
    {
        let outcome = self.wait_for(waited_for, predicate);
        if outcome.satisfied {
            Ok(outcome)
        } else {
            Err(self.timeout_error(outcome.waited_for))
        }
    }

    fn find<F>(&self, waited_for: String, probe: F) -> SyncResult<ElementHandle>
    where
        F: FnMut() -> Option<ElementHandle>,
    {
        poll_for(probe, &self.spec)
            .0
            .ok_or_else(|| self.timeout_error(waited_for))
    }

    fn timeout_error(&self, waited_for: String) -> SyncError {
        SyncError::WaitTimeout {
            waited_for,
            ms: self.spec.timeout.as_millis() as u64,
        }
    }

    /// Wait until `locator` has a match; returns the freshly resolved handle
    pub fn until_present<S: Session + ?Sized>(
        &self,
        session: &S,
        locator: &Locator,
    ) -> SyncResult<ElementHandle> {
        self.find(format!("{} to be present", locator.name()), || {
            conditions::present(session, locator)
        })
    }

    /// Wait until a match of `locator` is displayed
    pub fn until_visible<S: Session + ?Sized>(
        &self,
        session: &S,
        locator: &Locator,
    ) -> SyncResult<ElementHandle> {
        self.find(format!("{} to be visible", locator.name()), || {
            conditions::visible(session, locator)
        })
    }

    /// Wait until a match of `locator` is displayed and enabled
    pub fn until_clickable<S: Session + ?Sized>(
        &self,
        session: &S,
        locator: &Locator,
    ) -> SyncResult<ElementHandle> {
        self.find(format!("{} to be clickable", locator.name()), || {
            conditions::clickable(session, locator)
        })
    }

    /// Wait until no match of `locator` is displayed
    pub fn until_invisible<S: Session + ?Sized>(&self, session: &S, locator: &Locator) -> WaitOutcome {
        self.wait_for(format!("{} to disappear", locator.name()), || {
            conditions::invisible(session, locator)
        })
    }

    /// Wait until `handle` is detached from the document
    pub fn until_detached<S: Session + ?Sized>(
        &self,
        session: &S,
        handle: &ElementHandle,
    ) -> WaitOutcome {
        self.wait_for(format!("{handle} to be replaced"), || {
            conditions::detached(session, handle)
        })
    }

    /// Wait until `locator` has exactly `expected` matches
    pub fn until_count<S: Session + ?Sized>(
        &self,
        session: &S,
        locator: &Locator,
        expected: usize,
    ) -> WaitOutcome {
        self.wait_for(format!("{} count to be {expected}", locator.name()), || {
            conditions::count_equals(session, locator, expected)
        })
    }

    /// Wait until the page title contains `fragment`
    pub fn until_title_contains<S: Session + ?Sized>(
        &self,
        session: &S,
        fragment: &str,
    ) -> SyncResult<WaitOutcome> {
        self.require(format!("title containing {fragment:?}"), || {
            conditions::title_contains(session, fragment)
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::cell::Cell;

    mod wait_spec_tests {
        use super::*;

        #[test]
        fn test_default() {
            let spec = WaitSpec::default();
            assert_eq!(spec.timeout(), Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS));
            assert_eq!(
                spec.poll_interval(),
                Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
            );
        }

        #[test]
        fn test_rejects_interval_above_timeout() {
            let err = WaitSpec::from_millis(100, 200).unwrap_err();
            assert!(matches!(err, SyncError::Config { .. }));
        }

        #[test]
        fn test_interval_equal_to_timeout_is_valid() {
            assert!(WaitSpec::from_millis(100, 100).is_ok());
        }

        #[test]
        fn test_with_timeout_clamps_interval() {
            let spec = WaitSpec::from_millis(1000, 500)
                .unwrap()
                .with_timeout(Duration::from_millis(200));
            assert_eq!(spec.poll_interval(), Duration::from_millis(200));
        }
    }

    mod poll_tests {
        use super::*;

        #[test]
        fn test_immediate_success_polls_once() {
            let spec = WaitSpec::from_millis(1000, 10).unwrap();
            let (hit, polls, _) = poll_for(|| Some(7), &spec);
            assert_eq!(hit, Some(7));
            assert_eq!(polls, 1);
        }

        #[test]
        fn test_eventual_success() {
            let spec = WaitSpec::from_millis(1000, 5).unwrap();
            let calls = Cell::new(0);
            let ok = poll(
                || {
                    calls.set(calls.get() + 1);
                    calls.get() >= 3
                },
                &spec,
            );
            assert!(ok);
            assert_eq!(calls.get(), 3);
        }

        #[test]
        fn test_timeout_returns_false() {
            let spec = WaitSpec::from_millis(30, 10).unwrap();
            let start = Instant::now();
            assert!(!poll(|| false, &spec));
            assert!(start.elapsed() >= Duration::from_millis(30));
        }

        #[test]
        fn test_zero_timeout_evaluates_once() {
            let spec = WaitSpec::from_millis(0, 0).unwrap();
            let calls = Cell::new(0);
            let ok = poll(
                || {
                    calls.set(calls.get() + 1);
                    false
                },
                &spec,
            );
            assert!(!ok);
            assert_eq!(calls.get(), 1);
        }

        #[test]
        fn test_bounded_return() {
            let spec = WaitSpec::from_millis(50, 40).unwrap();
            let start = Instant::now();
            let _ = poll(|| false, &spec);
            // timeout + interval plus scheduler slack
            assert!(start.elapsed() < Duration::from_millis(50 + 40 + 200));
        }
    }

    mod waiter_tests {
        use super::*;

        #[test]
        fn test_wait_for_records_description() {
            let waiter = Waiter::new(WaitSpec::from_millis(20, 5).unwrap());
            let outcome = waiter.wait_for("spinner", || true);
            assert!(outcome.satisfied);
            assert_eq!(outcome.waited_for, "spinner");
            assert_eq!(outcome.polls, 1);
        }

        #[test]
        fn test_require_maps_timeout() {
            let waiter = Waiter::new(WaitSpec::from_millis(20, 5).unwrap());
            let err = waiter.require("toast", || false).unwrap_err();
            match err {
                SyncError::WaitTimeout { waited_for, ms } => {
                    assert_eq!(waited_for, "toast");
                    assert_eq!(ms, 20);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod condition_tests {
        use super::*;
        use crate::mock::{MockNode, MockSession};

        const SPINNER: Locator = Locator::css("spinner", ".loading-mask");
        const TILE: Locator = Locator::css("tile", ".product-item");

        fn fast() -> Waiter {
            Waiter::new(WaitSpec::from_millis(200, 5).unwrap())
        }

        #[test]
        fn test_absent_counts_as_invisible() {
            let session = MockSession::new();
            assert!(conditions::invisible(&session, &SPINNER));
        }

        #[test]
        fn test_spinner_hides_later() {
            let session = MockSession::new();
            session.with_doc(|doc| {
                let id = doc.add(MockNode::new(&SPINNER));
                doc.after(Duration::from_millis(30), move |d| d.node_mut(id).displayed = false);
            });
            assert!(!conditions::invisible(&session, &SPINNER));
            let outcome = fast().until_invisible(&session, &SPINNER);
            assert!(outcome.satisfied);
            assert!(outcome.polls > 1);
        }

        #[test]
        fn test_until_visible_returns_fresh_handle() {
            let session = MockSession::new();
            session.with_doc(|doc| {
                let _ = doc.add(MockNode::new(&TILE).hidden());
                let _ = doc.add(MockNode::new(&TILE));
            });
            let handle = fast().until_visible(&session, &TILE).unwrap();
            assert_eq!(handle.id, "1");
        }

        #[test]
        fn test_until_clickable_times_out_on_disabled() {
            let session = MockSession::new();
            session.with_doc(|doc| {
                let _ = doc.add(MockNode::new(&TILE).disabled());
            });
            let waiter = Waiter::new(WaitSpec::from_millis(20, 5).unwrap());
            let err = waiter.until_clickable(&session, &TILE).unwrap_err();
            assert!(matches!(err, SyncError::WaitTimeout { .. }));
        }

        #[test]
        fn test_detached_after_replacement() {
            let session = MockSession::new();
            let id = session.with_doc(|doc| doc.add(MockNode::new(&TILE)));
            let handle = session.resolve(&TILE).unwrap();
            session.with_doc(|doc| doc.after(Duration::from_millis(20), move |d| d.detach(id)));
            assert!(fast().until_detached(&session, &handle).satisfied);
        }

        #[test]
        fn test_count_equals() {
            let session = MockSession::new();
            session.with_doc(|doc| {
                let a = doc.add(MockNode::new(&TILE));
                let _ = doc.add(MockNode::new(&TILE));
                doc.after(Duration::from_millis(20), move |d| d.detach(a));
            });
            assert!(conditions::count_equals(&session, &TILE, 2));
            assert!(fast().until_count(&session, &TILE, 1).satisfied);
        }

        #[test]
        fn test_title_contains() {
            let session = MockSession::new();
            session.with_doc(|doc| doc.title = "Shopping Cart".into());
            assert!(fast().until_title_contains(&session, "Cart").is_ok());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn prop_poll_never_overruns(timeout_ms in 0u64..40, interval_ms in 1u64..20) {
                let interval_ms = interval_ms.min(timeout_ms.max(1));
                let spec = WaitSpec::from_millis(timeout_ms.max(interval_ms), interval_ms).unwrap();
                let start = Instant::now();
                let _ = poll(|| false, &spec);
                let bound = spec.timeout() + spec.poll_interval() + Duration::from_millis(200);
                prop_assert!(start.elapsed() <= bound);
            }

            #[test]
            fn prop_true_predicate_always_satisfied(timeout_ms in 0u64..50) {
                let spec = WaitSpec::from_millis(timeout_ms, 0).unwrap();
                prop_assert!(poll(|| true, &spec));
            }
        }
    }
}
