//! Shopsync: UI synchronization and verification for storefront e2e tests
//!
//! Browser-driven storefront tests fail for timing reasons far more often
//! than for real defects: a filter click starts an AJAX refresh, a loading
//! mask covers the grid, the product list is replaced wholesale, and a click
//! lands on an overlay. Shopsync turns those races into bounded, observable
//! waits and retries, and checks the resulting page state exactly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  scenario ──► pages (Storefront) ──► verify                      │
//! │                  │                                                │
//! │        ┌─────────┼───────────┬──────────────┐                    │
//! │        ▼         ▼           ▼              ▼                    │
//! │      wait     action     stabilize        retry                  │
//! │        └─────────┴───────────┴──────────────┘                    │
//! │                        │                                          │
//! │                 Session (driver)                                  │
//! │              ┌─────────┴─────────┐                                │
//! │          CdpSession          MockSession                          │
//! │       (feature browser)      (scripted)                           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Waits poll a condition at a fixed interval until a deadline; nothing in
//! the engine sleeps for a fixed time. Element handles are re-resolved after
//! every wait, and a stale handle is retried a bounded number of times.
//! Prices are integer cents end to end.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod action;
#[allow(missing_docs)]
pub mod catalog;
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::similar_names)]
mod cdp;
mod config;
mod driver;
mod locator;
pub mod mock;
pub mod pages;
mod price;
#[allow(clippy::format_push_string)]
mod report;
mod result;
mod retry;
pub mod scenario;
mod stabilize;
pub mod verify;
mod wait;

pub use action::{ActionExecutor, ActionKind, ActionOptions, ActionResult, FallbackStrategy};
#[cfg(feature = "browser")]
pub use cdp::CdpSession;
pub use config::{
    BrowserSettings, Credentials, RunConfig, StabilizationTimeouts, ENV_BASE_URL, ENV_EMAIL,
    ENV_PASSWORD,
};
pub use driver::{scripts, AsyncActivity, ElementHandle, Session, SessionExt};
pub use locator::{Locator, Selector};
pub use price::{Price, PriceError, PriceRange, PriceSample};
pub use report::RunReport;
pub use result::{ErrorKind, SyncError, SyncResult};
pub use retry::{with_retry, with_retry_report, RetryPolicy, RetryReport, DEFAULT_MAX_ATTEMPTS};
pub use scenario::{FilterPlan, Scenario, ScenarioContext, ScenarioOutcome};
pub use stabilize::{
    Snapshot, StabilizationConfig, StabilizationMode, StabilizationReport, StabilizationStep,
    Stabilizer, StepOutcome, DEFAULT_AJAX_TIMEOUT_MS, DEFAULT_OVERLAY_TIMEOUT_MS,
    DEFAULT_REPLACEMENT_TIMEOUT_MS,
};
pub use verify::ScenarioPhase;
pub use wait::{
    conditions, poll, poll_for, WaitOutcome, WaitSpec, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
