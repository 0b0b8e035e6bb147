//! Workflow scripts
//!
//! End-to-end scenarios composed from page objects. Each scenario takes the
//! session and an immutable [`ScenarioContext`] and returns a
//! [`ScenarioOutcome`]; the first error stops the scenario and becomes its
//! diagnostic. A scenario that produces new state (account creation) hands
//! back a new context instead of mutating the old one.

use crate::catalog::{cart, product};
use crate::config::{Credentials, RunConfig};
use crate::driver::Session;
use crate::pages::{NewAccount, Storefront, REGISTRATION_GREETING};
use crate::price::PriceRange;
use crate::result::{ErrorKind, SyncError, SyncResult};
use crate::verify::ScenarioPhase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info, info_span};

/// Color option id of "Blue" in the storefront's layered navigation
pub const BLUE_OPTION_ID: u32 = 50;

/// Price bucket `$50.00 - $59.99`
pub const FIFTY_TO_SIXTY: &str = "50-60";

/// Immutable inputs threaded through scenario calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioContext {
    config: RunConfig,
    credentials: Option<Credentials>,
}

impl ScenarioContext {
    /// Context from a validated configuration; credentials come from the config
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        let credentials = config.credentials.clone();
        Self {
            config,
            credentials,
        }
    }

    /// Same configuration, different account
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            config: self.config.clone(),
            credentials: Some(credentials),
        }
    }

    /// Run configuration
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Account to sign in with, if any
    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    fn require_credentials(&self) -> SyncResult<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| SyncError::config("this scenario signs in; set credentials"))
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Whether every step succeeded
    pub passed: bool,
    /// Failure description, if any
    pub diagnostic: Option<String>,
    /// Classification of the failure, if any
    pub error: Option<ErrorKind>,
    /// Steps that ran, in order (the failing one last)
    pub steps: Vec<String>,
    /// Wall time in milliseconds
    pub elapsed_ms: u64,
    /// Final phase, for scenarios that track one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ScenarioPhase>,
}

/// Step recorder for one scenario run
#[derive(Debug)]
pub struct ScenarioRun {
    name: &'static str,
    steps: Vec<String>,
    started: Instant,
}

impl ScenarioRun {
    /// Start recording
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        info!(scenario = name, "scenario started");
        Self {
            name,
            steps: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Run and record one step
    pub fn step<T>(&mut self, name: &str, f: impl FnOnce() -> SyncResult<T>) -> SyncResult<T> {
        self.steps.push(name.to_string());
        let _span = info_span!("step", scenario = self.name, step = name).entered();
        let result = f();
        match &result {
            Ok(_) => info!(step = name, "step passed"),
            Err(e) => error!(step = name, error = %e, "step failed"),
        }
        result
    }

    /// Run a boolean check as a step; `false` becomes an assertion failure
    pub fn check(&mut self, name: &str, f: impl FnOnce() -> bool) -> SyncResult<()> {
        self.step(name, || {
            if f() {
                Ok(())
            } else {
                Err(SyncError::assertion(name, true, false))
            }
        })
    }

    /// Close the run with the scenario's result
    #[must_use]
    pub fn finish(self, result: SyncResult<()>) -> ScenarioOutcome {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let (passed, diagnostic, error) = match result {
            Ok(()) => (true, None, None),
            Err(e) => (false, Some(e.to_string()), Some(e.kind())),
        };
        info!(scenario = self.name, passed, elapsed_ms, "scenario finished");
        ScenarioOutcome {
            name: self.name.to_string(),
            passed,
            diagnostic,
            error,
            steps: self.steps,
            elapsed_ms,
            phase: None,
        }
    }
}

/// Parameters of the filter scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPlan {
    /// Color option id
    pub color_option: u32,
    /// Price bucket, e.g. `50-60`
    pub price_bucket: String,
    /// Products expected after both filters
    pub expected_count: usize,
}

impl Default for FilterPlan {
    fn default() -> Self {
        Self {
            color_option: BLUE_OPTION_ID,
            price_bucket: FIFTY_TO_SIXTY.to_string(),
            expected_count: 2,
        }
    }
}

fn open_storefront<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
) -> SyncResult<()> {
    run.step("open storefront", || {
        shop.session().navigate(&ctx.config().url("/"))
    })
}

fn sign_in<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
) -> SyncResult<()> {
    let credentials = ctx.require_credentials()?;
    open_storefront(run, shop, ctx)?;
    run.step("open sign-in form", || shop.login().open())?;
    run.step("sign in", || shop.login().sign_in(credentials))?;
    run.check("logged-in banner visible", || shop.login().is_logged_in())
}

fn apply_filters<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    plan: &FilterPlan,
) -> SyncResult<()> {
    run.step("go to jackets", || shop.home().go_to_jackets())?;
    let _ = run.step("apply color filter", || {
        shop.products().apply_color_filter(plan.color_option)
    })?;
    let _ = run.step("apply price filter", || {
        shop.products().apply_price_filter(&plan.price_bucket)
    })?;
    Ok(())
}

/// Sign in with the context's credentials and sign out again
pub fn login<S: Session + ?Sized>(session: &S, ctx: &ScenarioContext) -> ScenarioOutcome {
    let shop = Storefront::from_config(session, ctx.config());
    let mut run = ScenarioRun::start("login");
    let result = login_steps(&mut run, &shop, ctx);
    run.finish(result)
}

fn login_steps<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
) -> SyncResult<()> {
    sign_in(run, shop, ctx)?;
    let name = run.step("read greeting", || shop.login().logged_in_name())?;
    info!(greeting = %name, "signed in");
    run.step("sign out", || shop.home().sign_out())
}

/// Register a new account; on success the returned context signs in with it
pub fn create_account<S: Session + ?Sized>(
    session: &S,
    ctx: &ScenarioContext,
    account: &NewAccount,
) -> (ScenarioOutcome, Option<ScenarioContext>) {
    let shop = Storefront::from_config(session, ctx.config());
    let mut run = ScenarioRun::start("create-account");
    let result = create_account_steps(&mut run, &shop, ctx, account);
    let next = result
        .is_ok()
        .then(|| ctx.with_credentials(account.credentials.clone()));
    (run.finish(result), next)
}

fn create_account_steps<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
    account: &NewAccount,
) -> SyncResult<()> {
    open_storefront(run, shop, ctx)?;
    run.step("open registration", || shop.account().open_registration())?;
    run.step("fill registration form", || shop.account().fill(account))?;
    run.step("submit registration", || shop.account().submit())?;
    let message = run.step("read success message", || shop.account().success_message())?;
    run.step("check greeting", || {
        if message.contains(REGISTRATION_GREETING) {
            Ok(())
        } else {
            Err(SyncError::assertion(
                "registration message",
                REGISTRATION_GREETING,
                &message,
            ))
        }
    })?;
    run.step("sign out", || shop.home().sign_out())
}

/// Apply color and price filters, then verify marker, count and prices
pub fn filter_and_verify<S: Session + ?Sized>(
    session: &S,
    ctx: &ScenarioContext,
    plan: &FilterPlan,
) -> ScenarioOutcome {
    let shop = Storefront::from_config(session, ctx.config());
    let mut run = ScenarioRun::start("filter-and-verify");
    let mut phase = ScenarioPhase::Idle;
    let result = filter_steps(&mut run, &shop, ctx, plan, &mut phase);
    if result.is_err() && !phase.is_terminal() {
        phase = ScenarioPhase::Failed;
    }
    ScenarioOutcome {
        phase: Some(phase),
        ..run.finish(result)
    }
}

fn filter_steps<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
    plan: &FilterPlan,
    phase: &mut ScenarioPhase,
) -> SyncResult<()> {
    let range =
        PriceRange::from_bucket(&plan.price_bucket).map_err(|e| SyncError::config(e.to_string()))?;
    sign_in(run, shop, ctx)?;
    run.step("go to jackets", || shop.home().go_to_jackets())?;

    *phase = phase.advance(ScenarioPhase::FilterApplied)?;
    let _ = run.step("apply color filter", || {
        shop.products().apply_color_filter(plan.color_option)
    })?;
    *phase = phase.advance(ScenarioPhase::Stabilizing)?;
    let _ = run.step("verify color marker", || {
        shop.products().verify_color_filter(plan.color_option)
    })?;

    *phase = phase.advance(ScenarioPhase::FilterApplied)?;
    let _ = run.step("apply price filter", || {
        shop.products().apply_price_filter(&plan.price_bucket)
    })?;
    *phase = phase.advance(ScenarioPhase::Stabilizing)?;
    run.step("verify price filter applied", || {
        let state = shop.products().filter_state()?;
        let shown = state.require("Price")?;
        info!(shown, "price filter listed");
        Ok(())
    })?;
    let _ = run.step("verify product count", || {
        shop.products().verify_product_count(plan.expected_count)
    })?;
    run.step("verify price range", || shop.products().verify_price_range(range))?;
    *phase = phase.advance(ScenarioPhase::Verified)?;
    Ok(())
}

/// Filter, add everything to the cart, open the cart, cross-check totals
pub fn checkout_to_verification<S: Session + ?Sized>(
    session: &S,
    ctx: &ScenarioContext,
    plan: &FilterPlan,
) -> ScenarioOutcome {
    let shop = Storefront::from_config(session, ctx.config());
    let mut run = ScenarioRun::start("checkout-to-verification");
    let result = checkout_steps(&mut run, &shop, ctx, plan);
    run.finish(result)
}

fn checkout_steps<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
    plan: &FilterPlan,
) -> SyncResult<()> {
    sign_in(run, shop, ctx)?;
    apply_filters(run, shop, plan)?;
    let added = run.step("add all products to cart", || shop.products().add_all_to_cart())?;
    if added == 0 {
        return Err(SyncError::assertion("products added to cart", "at least 1", 0));
    }
    run.check("success message visible", || {
        shop.cart().is_success_message_displayed()
    })?;
    run.step("open cart from message", || {
        shop.cart().open_from_success_message()
    })?;
    run.check("on shopping cart page", || shop.cart().is_on_cart_page())?;
    let _ = run.step("verify order total", || shop.cart().verify_totals())?;
    Ok(())
}

/// Open the cart and delete rows until it is empty
pub fn empty_cart<S: Session + ?Sized>(session: &S, ctx: &ScenarioContext) -> ScenarioOutcome {
    let shop = Storefront::from_config(session, ctx.config());
    let mut run = ScenarioRun::start("empty-cart");
    let result = empty_cart_steps(&mut run, &shop, ctx);
    run.finish(result)
}

fn empty_cart_steps<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
) -> SyncResult<()> {
    sign_in(run, shop, ctx)?;
    run.step("go to cart", || shop.cart().go_to_cart())?;
    let initial = run.step("count cart rows", || shop.cart().item_count())?;
    if initial == 0 {
        return run.check("empty cart message visible", || {
            shop.becomes_visible(&cart::EMPTY_MESSAGE)
        });
    }
    let _ = run.step("delete until empty", || shop.cart().empty())?;
    Ok(())
}

/// Filter, drop the price filter, wishlist two products, check the counter
pub fn wishlist_round_trip<S: Session + ?Sized>(
    session: &S,
    ctx: &ScenarioContext,
    plan: &FilterPlan,
) -> ScenarioOutcome {
    let shop = Storefront::from_config(session, ctx.config());
    let mut run = ScenarioRun::start("wishlist-round-trip");
    let result = wishlist_steps(&mut run, &shop, ctx, plan);
    run.finish(result)
}

fn wishlist_steps<S: Session + ?Sized>(
    run: &mut ScenarioRun,
    shop: &Storefront<'_, S>,
    ctx: &ScenarioContext,
    plan: &FilterPlan,
) -> SyncResult<()> {
    sign_in(run, shop, ctx)?;
    apply_filters(run, shop, plan)?;
    let _ = run.step("remove price filter", || shop.products().remove_price_filter())?;
    let _ = run.step("wait for listing", || {
        shop.waiter()
            .until_present(shop.session(), &product::PRODUCT_ITEM)
    })?;
    run.step("add two products to wishlist", || {
        shop.products().add_first_two_to_wishlist()
    })?;
    run.check("success message visible", || {
        shop.wishlist().is_success_message_displayed()
    })?;
    run.step("go to profile", || shop.home().go_to_profile())?;
    let count = run.step("read wishlist count", || shop.wishlist().item_count())?;
    if count == 2 {
        Ok(())
    } else {
        Err(SyncError::assertion("wishlist count", 2, count))
    }
}

/// Selectable scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// [`create_account`]
    CreateAccount,
    /// [`login`]
    Login,
    /// [`filter_and_verify`]
    Filter,
    /// [`checkout_to_verification`]
    Checkout,
    /// [`wishlist_round_trip`]
    Wishlist,
    /// [`empty_cart`]
    EmptyCart,
}

impl Scenario {
    /// Every scenario, in suite order
    pub const ALL: [Self; 6] = [
        Self::CreateAccount,
        Self::Login,
        Self::Filter,
        Self::Checkout,
        Self::Wishlist,
        Self::EmptyCart,
    ];

    /// Command-line name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateAccount => "create-account",
            Self::Login => "login",
            Self::Filter => "filter",
            Self::Checkout => "checkout",
            Self::Wishlist => "wishlist",
            Self::EmptyCart => "empty-cart",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sc| sc.name() == s)
            .ok_or_else(|| SyncError::config(format!("unknown scenario {s:?}")))
    }
}

/// Run `scenarios` in order, each on a fresh session from `open_session`.
///
/// A passing account creation switches later scenarios to the new account.
/// A session that fails to open fails that scenario only.
pub fn run_suite<S, F>(
    ctx: &ScenarioContext,
    scenarios: &[Scenario],
    mut open_session: F,
) -> Vec<ScenarioOutcome>
where
    S: Session,
    F: FnMut() -> SyncResult<S>,
{
    let mut ctx = ctx.clone();
    let plan = FilterPlan::default();
    let mut outcomes = Vec::with_capacity(scenarios.len());
    for &scenario in scenarios {
        let session = match open_session() {
            Ok(session) => session,
            Err(e) => {
                let run = ScenarioRun::start(scenario.name());
                outcomes.push(run.finish(Err(e)));
                continue;
            }
        };
        let outcome = match scenario {
            Scenario::CreateAccount => {
                let account = NewAccount::timestamped("example.com", "Shopsync123!");
                let (outcome, next) = create_account(&session, &ctx, &account);
                if let Some(next) = next {
                    ctx = next;
                }
                outcome
            }
            Scenario::Login => login(&session, &ctx),
            Scenario::Filter => filter_and_verify(&session, &ctx, &plan),
            Scenario::Checkout => checkout_to_verification(&session, &ctx, &plan),
            Scenario::Wishlist => wishlist_round_trip(&session, &ctx, &plan),
            Scenario::EmptyCart => empty_cart(&session, &ctx),
        };
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ctx() -> ScenarioContext {
        ScenarioContext::new(
            RunConfig::new("https://shop.test").with_credentials(Credentials::new("a@b.c", "pw")),
        )
    }

    #[test]
    fn test_context_is_not_mutated_by_new_credentials() {
        let base = ctx();
        let next = base.with_credentials(Credentials::new("new@b.c", "pw2"));
        assert_eq!(base.credentials().unwrap().email, "a@b.c");
        assert_eq!(next.credentials().unwrap().email, "new@b.c");
        assert_eq!(next.config(), base.config());
    }

    #[test]
    fn test_run_records_steps_until_failure() {
        fn steps(run: &mut ScenarioRun) -> SyncResult<()> {
            run.step("one", || Ok(()))?;
            run.step("two", || -> SyncResult<()> { Err(SyncError::not_found("x")) })?;
            run.step("three", || Ok(()))
        }
        let mut run = ScenarioRun::start("demo");
        let result = steps(&mut run);
        let outcome = run.finish(result);
        assert!(!outcome.passed);
        assert_eq!(outcome.steps, vec!["one", "two"]);
        assert_eq!(outcome.error, Some(ErrorKind::ElementNotFound));
        assert!(outcome.diagnostic.unwrap().contains('x'));
    }

    #[test]
    fn test_check_turns_false_into_assertion() {
        let mut run = ScenarioRun::start("demo");
        let err = run.check("banner", || false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailure);
    }

    #[test]
    fn test_scenario_names_round_trip() {
        for sc in Scenario::ALL {
            assert_eq!(sc.name().parse::<Scenario>().unwrap(), sc);
        }
        assert!("bogus".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_missing_credentials_fail_scenario() {
        let session = crate::mock::MockSession::new();
        let ctx = ScenarioContext::new(RunConfig::new("https://shop.test"));
        let outcome = login(&session, &ctx);
        assert!(!outcome.passed);
        assert_eq!(outcome.error, Some(ErrorKind::Fault));
        assert!(outcome.steps.is_empty());
    }

    #[test]
    fn test_suite_reports_session_failures() {
        let outcomes = run_suite::<crate::mock::MockSession, _>(&ctx(), &[Scenario::Login], || {
            Err(SyncError::session("no browser"))
        });
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].passed);
        assert_eq!(outcomes[0].name, "login");
    }
}
