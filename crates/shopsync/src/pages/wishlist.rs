use super::Storefront;
use crate::catalog::{account, cart, wishlist};
use crate::driver::{Session, SessionExt};
use crate::result::SyncResult;
use tracing::{info, warn};

/// Digits of a counter label such as `"2 items"`; no digits reads as 0
#[must_use]
pub fn parse_counter(text: &str) -> u32 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

/// Wishlist sidebar reached from the customer menu
#[derive(Debug)]
pub struct WishlistPage<'p, 's, S: Session + ?Sized> {
    shop: &'p Storefront<'s, S>,
}

impl<'p, 's, S: Session + ?Sized> WishlistPage<'p, 's, S> {
    pub(crate) const fn new(shop: &'p Storefront<'s, S>) -> Self {
        Self { shop }
    }

    /// Whether the success toast shows up
    pub fn is_success_message_displayed(&self) -> bool {
        self.shop.becomes_visible(&cart::SUCCESS_MESSAGE)
    }

    /// Open the wishlist from the customer menu
    pub fn open(&self) -> SyncResult<()> {
        let _ = self.shop.click(&account::CUSTOMER_NAME)?;
        let _ = self
            .shop
            .waiter()
            .until_clickable(self.shop.session(), &account::WISHLIST_MENU_LINK)?;
        let _ = self.shop.click(&account::WISHLIST_MENU_LINK)?;
        Ok(())
    }

    /// Open the wishlist and read its item counter
    pub fn item_count(&self) -> SyncResult<u32> {
        self.open()?;
        let session = self.shop.session();
        let text = self.shop.retry().run(|| match session.resolve_all(&wishlist::COUNTER)?.first() {
            Some(counter) => session.text(counter),
            None => Ok(String::new()),
        })?;
        let count = parse_counter(&text);
        if text.trim().is_empty() {
            warn!("wishlist counter missing, reading as 0");
        }
        info!(count, raw = %text.trim(), "wishlist count");
        Ok(count)
    }
}
