//! Page objects for the storefront.
//!
//! Each page borrows a [`Storefront`], which bundles the session with the
//! waiter, action executor, stabilizer and retry budget of the run. Page
//! methods never hold an element across a wait; they re-resolve.

mod account;
mod cart;
mod home;
mod login;
mod product;
mod wishlist;

pub use account::{AccountPage, NewAccount, REGISTRATION_GREETING};
pub use cart::{CartPage, CART_TITLE};
pub use home::HomePage;
pub use login::LoginPage;
pub use product::ProductListPage;
pub use wishlist::{parse_counter, WishlistPage};

use crate::action::{ActionExecutor, ActionKind, ActionResult};
use crate::config::RunConfig;
use crate::driver::{scripts, Session};
use crate::locator::Locator;
use crate::result::SyncResult;
use crate::retry::RetryPolicy;
use crate::stabilize::Stabilizer;
use crate::wait::{conditions, Waiter};
use std::fmt;
use tracing::debug;

/// Session plus the synchronization machinery every page uses
pub struct Storefront<'s, S: Session + ?Sized> {
    session: &'s S,
    waiter: Waiter,
    actions: ActionExecutor,
    stabilizer: Stabilizer,
    retry: RetryPolicy,
}

impl<S: Session + ?Sized> fmt::Debug for Storefront<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storefront")
            .field("waiter", &self.waiter)
            .field("stabilizer", &self.stabilizer)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<'s, S: Session + ?Sized> Storefront<'s, S> {
    /// Assemble from parts
    #[must_use]
    pub fn new(session: &'s S, waiter: Waiter, stabilizer: Stabilizer, retry: RetryPolicy) -> Self {
        Self {
            session,
            waiter,
            actions: ActionExecutor::new(),
            stabilizer,
            retry,
        }
    }

    /// Assemble from a validated run configuration
    #[must_use]
    pub fn from_config(session: &'s S, config: &RunConfig) -> Self {
        Self::new(
            session,
            Waiter::new(config.wait_spec()),
            Stabilizer::new(config.stabilization_config()),
            config.retry_policy(),
        )
    }

    /// The underlying session
    #[must_use]
    pub const fn session(&self) -> &'s S {
        self.session
    }

    /// The waiter
    #[must_use]
    pub const fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    /// The action executor
    #[must_use]
    pub const fn actions(&self) -> ActionExecutor {
        self.actions
    }

    /// The stabilizer
    #[must_use]
    pub const fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }

    /// The retry budget
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Login page
    #[must_use]
    pub const fn login(&self) -> LoginPage<'_, 's, S> {
        LoginPage::new(self)
    }

    /// Registration page
    #[must_use]
    pub const fn account(&self) -> AccountPage<'_, 's, S> {
        AccountPage::new(self)
    }

    /// Header and navigation
    #[must_use]
    pub const fn home(&self) -> HomePage<'_, 's, S> {
        HomePage::new(self)
    }

    /// Product listing
    #[must_use]
    pub const fn products(&self) -> ProductListPage<'_, 's, S> {
        ProductListPage::new(self)
    }

    /// Shopping cart
    #[must_use]
    pub const fn cart(&self) -> CartPage<'_, 's, S> {
        CartPage::new(self)
    }

    /// Wishlist
    #[must_use]
    pub const fn wishlist(&self) -> WishlistPage<'_, 's, S> {
        WishlistPage::new(self)
    }

    /// Wait for `locator` to appear, then perform `action` on it.
    ///
    /// The whole sequence is retried if the element goes stale in between.
    pub fn act(&self, locator: &Locator, action: &ActionKind) -> SyncResult<ActionResult> {
        self.retry.run(|| {
            let _ = self.waiter.until_present(self.session, locator)?;
            self.actions.perform(self.session, locator, action)
        })
    }

    /// Click with script fallback
    pub fn click(&self, locator: &Locator) -> SyncResult<ActionResult> {
        self.act(locator, &ActionKind::click())
    }

    /// Wait until visible, then type
    pub fn type_into(&self, locator: &Locator, text: &str) -> SyncResult<ActionResult> {
        self.retry.run(|| {
            let _ = self.waiter.until_visible(self.session, locator)?;
            self.actions
                .perform(self.session, locator, &ActionKind::type_text(text))
        })
    }

    /// Wait until visible, then hover
    pub fn hover(&self, locator: &Locator) -> SyncResult<ActionResult> {
        self.retry.run(|| {
            let _ = self.waiter.until_visible(self.session, locator)?;
            self.actions.perform(self.session, locator, &ActionKind::hover())
        })
    }

    /// Scroll to `locator` and click it through the script channel only
    pub fn script_click(&self, locator: &Locator) -> SyncResult<()> {
        self.retry.run(|| {
            let element = self.waiter.until_present(self.session, locator)?;
            let _ = self
                .session
                .execute_script(scripts::SCROLL_INTO_VIEW, &[&element], None)?;
            let _ = self.session.execute_script(scripts::CLICK, &[&element], None)?;
            debug!(locator = %locator, "script click");
            Ok(())
        })
    }

    /// Run `action`, then wait for the message it produced.
    ///
    /// A match of `message` already on the page when `action` starts must
    /// detach first; only a freshly rendered message confirms the action.
    pub fn expect_fresh<T>(
        &self,
        message: &Locator,
        action: impl FnOnce() -> SyncResult<T>,
    ) -> SyncResult<T> {
        let previous = conditions::present(self.session, message);
        let value = action()?;
        if let Some(previous) = previous {
            let _ = self
                .waiter
                .require(format!("earlier {} to be replaced", message.name()), || {
                    conditions::detached(self.session, &previous)
                })?;
        }
        let _ = self.waiter.until_visible(self.session, message)?;
        Ok(value)
    }

    /// Whether a match of `locator` becomes visible within the wait budget
    pub fn becomes_visible(&self, locator: &Locator) -> bool {
        self.waiter.until_visible(self.session, locator).is_ok()
    }
}
