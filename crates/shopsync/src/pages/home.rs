use super::Storefront;
use crate::catalog::{account, navigation};
use crate::driver::Session;
use crate::result::SyncResult;
use tracing::info;

/// Header: top menu, customer menu
#[derive(Debug)]
pub struct HomePage<'p, 's, S: Session + ?Sized> {
    shop: &'p Storefront<'s, S>,
}

impl<'p, 's, S: Session + ?Sized> HomePage<'p, 's, S> {
    pub(crate) const fn new(shop: &'p Storefront<'s, S>) -> Self {
        Self { shop }
    }

    /// Women → Tops → Jackets
    pub fn go_to_jackets(&self) -> SyncResult<()> {
        let _ = self.shop.hover(&navigation::WOMEN_MENU)?;
        let _ = self.shop.hover(&navigation::TOPS_MENU)?;
        let result = self.shop.click(&navigation::JACKETS_LINK)?;
        info!(fallback = result.used_fallback, "opened jackets listing");
        Ok(())
    }

    /// Customer account page
    pub fn go_to_profile(&self) -> SyncResult<()> {
        let result = self.shop.click(&account::PROFILE_LINK)?;
        info!(fallback = result.used_fallback, "opened profile");
        Ok(())
    }

    /// Open the customer menu and sign out
    pub fn sign_out(&self) -> SyncResult<()> {
        let _ = self.shop.click(&account::CUSTOMER_MENU_TOGGLE)?;
        let _ = self
            .shop
            .waiter()
            .until_clickable(self.shop.session(), &account::SIGN_OUT_LINK)?;
        let _ = self.shop.click(&account::SIGN_OUT_LINK)?;
        info!("signed out");
        Ok(())
    }
}
