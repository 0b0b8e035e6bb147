use super::Storefront;
use crate::catalog::account;
use crate::config::Credentials;
use crate::driver::Session;
use crate::result::SyncResult;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Success banner text shown after registration
pub const REGISTRATION_GREETING: &str = "Thank you for registering";

/// Registration form data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Sign-in credentials for the new account
    pub credentials: Credentials,
}

impl NewAccount {
    /// Account with an email made unique by the current time
    #[must_use]
    pub fn timestamped(domain: &str, password: impl Into<String>) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        Self {
            first_name: "Shop".into(),
            last_name: "Sync".into(),
            credentials: Credentials::new(format!("shopsync{millis}@{domain}"), password),
        }
    }
}

/// "Create an Account" form
#[derive(Debug)]
pub struct AccountPage<'p, 's, S: Session + ?Sized> {
    shop: &'p Storefront<'s, S>,
}

impl<'p, 's, S: Session + ?Sized> AccountPage<'p, 's, S> {
    pub(crate) const fn new(shop: &'p Storefront<'s, S>) -> Self {
        Self { shop }
    }

    /// Follow the header's "Create an Account" link
    pub fn open_registration(&self) -> SyncResult<()> {
        let _ = self.shop.click(&account::CREATE_ACCOUNT_LINK)?;
        Ok(())
    }

    /// Fill every field of the form
    pub fn fill(&self, new: &NewAccount) -> SyncResult<()> {
        let _ = self.shop.type_into(&account::FIRST_NAME, &new.first_name)?;
        let _ = self.shop.type_into(&account::LAST_NAME, &new.last_name)?;
        let _ = self
            .shop
            .type_into(&account::REGISTER_EMAIL, &new.credentials.email)?;
        let _ = self
            .shop
            .type_into(&account::REGISTER_PASSWORD, &new.credentials.password)?;
        let _ = self
            .shop
            .type_into(&account::CONFIRM_PASSWORD, &new.credentials.password)?;
        Ok(())
    }

    /// Submit the form
    pub fn submit(&self) -> SyncResult<()> {
        let _ = self.shop.click(&account::CREATE_ACCOUNT_BUTTON)?;
        info!("registration submitted");
        Ok(())
    }

    /// Text of the success banner, once visible
    pub fn success_message(&self) -> SyncResult<String> {
        let banner = self
            .shop
            .waiter()
            .until_visible(self.shop.session(), &account::REGISTER_SUCCESS)?;
        self.shop.session().text(&banner)
    }
}
