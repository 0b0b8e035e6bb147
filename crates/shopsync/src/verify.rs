//! Verification Predicates
//!
//! Compare expected state against what the live page shows right now.
//! Every predicate re-resolves its locators; nothing read here outlives the
//! call. Failures carry the expected and observed values.

use crate::catalog::{cart, product};
use crate::driver::{Session, SessionExt};
use crate::locator::Locator;
use crate::price::{Price, PriceRange, PriceSample};
use crate::result::{SyncError, SyncResult};
use crate::retry::with_retry;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Full scans attempted by [`verify_filter_applied`] before giving up on a moving grid
pub const FILTER_SCANS: u32 = 3;

// =============================================================================
// COUNTS
// =============================================================================

/// Displayed matches of `locator` must equal `expected`
///
/// # Errors
///
/// `AssertionFailure` with the observed count.
pub fn verify_count<S: Session + ?Sized>(
    session: &S,
    locator: &Locator,
    expected: usize,
) -> SyncResult<usize> {
    let observed = session.count_displayed(locator)?;
    debug!(locator = %locator, expected, observed, "count check");
    if observed == expected {
        Ok(observed)
    } else {
        Err(SyncError::assertion(
            format!("{} count", locator.name()),
            expected,
            observed,
        ))
    }
}

// =============================================================================
// FILTERS
// =============================================================================

/// Every displayed product must carry `marker` somewhere inside its tile.
///
/// A stale tile restarts the whole scan, at most [`FILTER_SCANS`] times.
///
/// # Errors
///
/// `AssertionFailure` naming the first non-conforming product (or an empty
/// listing), `RetryExhausted` when the grid kept changing under every scan.
pub fn verify_filter_applied<S: Session + ?Sized>(
    session: &S,
    marker: &Locator,
) -> SyncResult<usize> {
    with_retry(FILTER_SCANS, || scan_for_marker(session, marker))
}

fn scan_for_marker<S: Session + ?Sized>(session: &S, marker: &Locator) -> SyncResult<usize> {
    let tiles = session.resolve_all(&product::PRODUCT_ITEM)?;
    if tiles.is_empty() {
        return Err(SyncError::assertion(
            format!("products showing {}", marker.name()),
            "at least 1 product",
            "0 products",
        ));
    }
    for (index, tile) in tiles.iter().enumerate() {
        let marked = session.find_within(tile, marker.selector(), marker.name())?;
        if marked.is_empty() {
            return Err(SyncError::assertion(
                format!("product {} showing {}", index + 1, marker.name()),
                "marker present",
                "marker missing",
            ));
        }
    }
    Ok(tiles.len())
}

/// One entry of the "Now Shopping by" block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFilter {
    /// Filter name, e.g. `Color`
    pub label: String,
    /// Selected value, e.g. `Blue`
    pub value: String,
}

/// Filters currently applied on the listing, read from the live page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Applied filters in page order
    pub applied: Vec<AppliedFilter>,
}

impl FilterState {
    /// Read the "Now Shopping by" block
    pub fn read<S: Session + ?Sized>(session: &S) -> SyncResult<Self> {
        with_retry(FILTER_SCANS, || {
            let mut applied = Vec::new();
            for item in session.resolve_all(&product::ACTIVE_FILTER)? {
                let label = session.resolve_within(&item, &product::ACTIVE_FILTER_LABEL)?;
                let value = session.resolve_within(&item, &product::ACTIVE_FILTER_VALUE)?;
                applied.push(AppliedFilter {
                    label: session.text(&label)?.trim().to_string(),
                    value: session.text(&value)?.trim().to_string(),
                });
            }
            Ok(Self { applied })
        })
    }

    /// Whether a filter with `label` is applied (case-insensitive)
    #[must_use]
    pub fn has(&self, label: &str) -> bool {
        self.value_of(label).is_some()
    }

    /// Value of the filter with `label`
    #[must_use]
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.applied
            .iter()
            .find(|f| f.label.eq_ignore_ascii_case(label))
            .map(|f| f.value.as_str())
    }

    /// The filter with `label` must be applied; returns its value
    ///
    /// # Errors
    ///
    /// `AssertionFailure` listing the filters that are applied.
    pub fn require(&self, label: &str) -> SyncResult<&str> {
        self.value_of(label).ok_or_else(|| {
            let applied: Vec<&str> = self.applied.iter().map(|f| f.label.as_str()).collect();
            SyncError::assertion(
                format!("{label} filter"),
                "applied",
                if applied.is_empty() {
                    "no filters applied".to_string()
                } else {
                    format!("applied: {}", applied.join(", "))
                },
            )
        })
    }
}

// =============================================================================
// PRICES
// =============================================================================

/// Read every displayed price matching `locator`
pub fn read_prices<S: Session + ?Sized>(
    session: &S,
    locator: &Locator,
) -> SyncResult<Vec<PriceSample>> {
    with_retry(FILTER_SCANS, || {
        session
            .resolve_all(locator)?
            .iter()
            .map(|h| session.text(h).map(PriceSample::read))
            .collect()
    })
}

/// Every sample must parse and fall within `range`
///
/// An empty batch passes only when `allow_empty` is set.
///
/// # Errors
///
/// `AssertionFailure` reporting the first offending raw value.
pub fn verify_price_range(
    samples: &[PriceSample],
    range: PriceRange,
    allow_empty: bool,
) -> SyncResult<()> {
    if samples.is_empty() && !allow_empty {
        return Err(SyncError::assertion(
            "listed prices",
            "at least 1 price",
            "no prices",
        ));
    }
    for sample in samples {
        match sample.parsed {
            Some(price) if range.contains(price) => {}
            Some(_) => {
                return Err(SyncError::assertion(
                    "listed price within range",
                    range,
                    &sample.raw,
                ));
            }
            None => {
                return Err(SyncError::assertion(
                    "listed price readable",
                    "a price",
                    format!("{:?}", sample.raw),
                ));
            }
        }
    }
    Ok(())
}

// =============================================================================
// CART
// =============================================================================

/// Line subtotals must add up to the order total exactly
///
/// # Errors
///
/// `AssertionFailure` with the sum as expected and the displayed total as observed.
pub fn verify_totals(subtotals: &[Price], total: Price) -> SyncResult<Price> {
    let sum = subtotals
        .iter()
        .try_fold(Price::ZERO, |acc, p| acc.checked_add(*p))
        .ok_or_else(|| SyncError::assertion("subtotal sum", "a representable amount", "overflow"))?;
    if sum == total {
        Ok(sum)
    } else {
        Err(SyncError::assertion("order total", sum, total))
    }
}

/// Parse a batch of samples, failing on the first unreadable one
///
/// # Errors
///
/// `AssertionFailure` reporting the raw text.
pub fn parsed_prices(samples: &[PriceSample], what: &str) -> SyncResult<Vec<Price>> {
    samples
        .iter()
        .map(|s| {
            s.parsed.ok_or_else(|| {
                SyncError::assertion(format!("{what} readable"), "a price", format!("{:?}", s.raw))
            })
        })
        .collect()
}

/// The cart is empty when its "no items" message is visible
pub fn is_cart_empty<S: Session + ?Sized>(session: &S) -> SyncResult<bool> {
    Ok(session.count_displayed(&cart::EMPTY_MESSAGE)? > 0)
}

// =============================================================================
// SCENARIO PHASE
// =============================================================================

/// Phase of a filter-and-verify run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioPhase {
    /// Nothing applied yet
    Idle,
    /// A filter click went out
    FilterApplied,
    /// Waiting for the listing to settle
    Stabilizing,
    /// All checks passed
    Verified,
    /// A check failed
    Failed,
}

impl fmt::Display for ScenarioPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ScenarioPhase {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }

    /// Whether `self → next` is a legal move
    #[must_use]
    pub const fn can_advance(self, next: Self) -> bool {
        match (self, next) {
            (Self::Verified | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Idle | Self::Stabilizing, Self::FilterApplied)
            | (Self::FilterApplied, Self::Stabilizing)
            | (Self::Stabilizing, Self::Verified) => true,
            _ => false,
        }
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// `AssertionFailure` on an illegal move.
    pub fn advance(self, next: Self) -> SyncResult<Self> {
        if self.can_advance(next) {
            info!(from = %self, to = %next, "phase");
            Ok(next)
        } else {
            Err(SyncError::assertion(
                "scenario phase transition",
                format!("a legal successor of {self}"),
                next,
            ))
        }
    }
}
