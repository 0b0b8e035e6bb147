use super::Storefront;
use crate::catalog::account;
use crate::config::Credentials;
use crate::driver::Session;
use crate::result::SyncResult;
use tracing::info;

/// Sign-in form and the logged-in banner
#[derive(Debug)]
pub struct LoginPage<'p, 's, S: Session + ?Sized> {
    shop: &'p Storefront<'s, S>,
}

impl<'p, 's, S: Session + ?Sized> LoginPage<'p, 's, S> {
    pub(crate) const fn new(shop: &'p Storefront<'s, S>) -> Self {
        Self { shop }
    }

    /// Follow the header's "Sign In" link
    pub fn open(&self) -> SyncResult<()> {
        let _ = self.shop.click(&account::SIGN_IN_LINK)?;
        Ok(())
    }

    /// Fill the form and submit
    pub fn sign_in(&self, credentials: &Credentials) -> SyncResult<()> {
        let _ = self.shop.type_into(&account::EMAIL, &credentials.email)?;
        let _ = self.shop.type_into(&account::PASSWORD, &credentials.password)?;
        let _ = self.shop.click(&account::SIGN_IN_BUTTON)?;
        info!(email = %credentials.email, "sign-in submitted");
        Ok(())
    }

    /// Whether the logged-in banner shows up
    pub fn is_logged_in(&self) -> bool {
        self.shop.becomes_visible(&account::LOGGED_IN_BANNER)
    }

    /// Greeting text of the logged-in banner
    pub fn logged_in_name(&self) -> SyncResult<String> {
        let banner = self
            .shop
            .waiter()
            .until_visible(self.shop.session(), &account::LOGGED_IN_BANNER)?;
        Ok(self.shop.session().text(&banner)?.trim().to_string())
    }
}
