use super::Storefront;
use crate::action::ActionKind;
use crate::catalog::cart;
use crate::driver::{Session, SessionExt};
use crate::price::{Price, PriceSample};
use crate::result::{SyncError, SyncResult};
use crate::verify;
use tracing::{debug, info};

/// Title fragment of the shopping cart page
pub const CART_TITLE: &str = "Shopping Cart";

/// Toast messages, mini-cart and the shopping cart page
#[derive(Debug)]
pub struct CartPage<'p, 's, S: Session + ?Sized> {
    shop: &'p Storefront<'s, S>,
}

impl<'p, 's, S: Session + ?Sized> CartPage<'p, 's, S> {
    pub(crate) const fn new(shop: &'p Storefront<'s, S>) -> Self {
        Self { shop }
    }

    /// Whether the success toast shows up
    pub fn is_success_message_displayed(&self) -> bool {
        self.shop.becomes_visible(&cart::SUCCESS_MESSAGE)
    }

    /// Follow the cart link inside the success toast
    pub fn open_from_success_message(&self) -> SyncResult<()> {
        let _ = self
            .shop
            .waiter()
            .until_clickable(self.shop.session(), &cart::CART_LINK_IN_MESSAGE)?;
        let _ = self.shop.click(&cart::CART_LINK_IN_MESSAGE)?;
        Ok(())
    }

    /// Mini-cart → "View and Edit Cart" → cart page
    pub fn go_to_cart(&self) -> SyncResult<()> {
        let _ = self.shop.click(&cart::MINICART_TOGGLE)?;
        let _ = self
            .shop
            .waiter()
            .until_visible(self.shop.session(), &cart::MINICART)?;
        let _ = self.shop.click(&cart::VIEW_CART)?;
        let _ = self
            .shop
            .waiter()
            .until_title_contains(self.shop.session(), CART_TITLE)?;
        info!("on shopping cart page");
        Ok(())
    }

    /// Whether the page title says we are on the cart
    pub fn is_on_cart_page(&self) -> bool {
        self.shop
            .waiter()
            .until_title_contains(self.shop.session(), CART_TITLE)
            .is_ok()
    }

    /// Line subtotals, each parsed exactly
    pub fn line_subtotals(&self) -> SyncResult<Vec<Price>> {
        let samples = verify::read_prices(self.shop.session(), &cart::LINE_SUBTOTAL)?;
        verify::parsed_prices(&samples, cart::LINE_SUBTOTAL.name())
    }

    /// Order total from the summary block
    pub fn order_total(&self) -> SyncResult<Price> {
        let session = self.shop.session();
        let sample = self.shop.retry().run(|| {
            let total = self.shop.waiter().until_visible(session, &cart::ORDER_TOTAL)?;
            session.text(&total).map(PriceSample::read)
        })?;
        sample.parsed.ok_or_else(|| {
            SyncError::assertion(
                format!("{} readable", cart::ORDER_TOTAL.name()),
                "a price",
                format!("{:?}", sample.raw),
            )
        })
    }

    /// Line subtotals must add up to the order total
    pub fn verify_totals(&self) -> SyncResult<Price> {
        let subtotals = self.line_subtotals()?;
        let total = self.order_total()?;
        debug!(lines = subtotals.len(), %total, "cross-checking totals");
        verify::verify_totals(&subtotals, total)
    }

    /// Cart rows in the document
    pub fn item_count(&self) -> SyncResult<usize> {
        self.shop.session().count(&cart::CART_ITEM)
    }

    /// Whether the "no items" message is visible now
    pub fn is_empty(&self) -> SyncResult<bool> {
        verify::is_cart_empty(self.shop.session())
    }

    /// Delete the first row and wait for its delete button to detach
    pub fn delete_first_item(&self) -> SyncResult<()> {
        let session = self.shop.session();
        let actions = self.shop.actions();
        let button = self.shop.retry().run(|| {
            let button = self.shop.waiter().until_clickable(session, &cart::DELETE_ITEM)?;
            let _ = actions.perform_on(session, &button, &ActionKind::click())?;
            Ok(button)
        })?;
        let gone = self.shop.waiter().until_detached(session, &button);
        if !gone.satisfied {
            return Err(SyncError::WaitTimeout {
                waited_for: gone.waited_for,
                ms: self.shop.waiter().spec().timeout().as_millis() as u64,
            });
        }
        info!("first cart item deleted");
        Ok(())
    }

    /// Delete rows one at a time until the cart is empty.
    ///
    /// Each deletion must lower the row count by exactly one. Returns the
    /// number of rows deleted.
    pub fn empty(&self) -> SyncResult<usize> {
        let initial = self.item_count()?;
        for deleted in 0..initial {
            let before = self.item_count()?;
            if before == 0 {
                return Err(SyncError::assertion(
                    "cart rows before deletion",
                    initial - deleted,
                    0,
                ));
            }
            self.delete_first_item()?;
            let after = self.item_count()?;
            if after + 1 != before {
                return Err(SyncError::assertion(
                    "cart rows after deletion",
                    before - 1,
                    after,
                ));
            }
            info!(remaining = after, "cart row removed");
        }
        let remaining = self.item_count()?;
        if remaining > 0 {
            return Err(SyncError::assertion("cart rows after emptying", 0, remaining));
        }
        if !self.shop.becomes_visible(&cart::EMPTY_MESSAGE) {
            return Err(SyncError::assertion(
                "empty cart message",
                "visible",
                "not visible",
            ));
        }
        Ok(initial)
    }
}
