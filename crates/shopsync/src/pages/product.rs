use super::Storefront;
use crate::action::ActionKind;
use crate::catalog::{self, cart, product};
use crate::driver::{Session, SessionExt};
use crate::price::{PriceRange, PriceSample};
use crate::result::{SyncError, SyncResult};
use crate::stabilize::StabilizationReport;
use crate::verify::{self, FilterState};
use tracing::{info, warn};

/// Product listing with layered navigation
#[derive(Debug)]
pub struct ProductListPage<'p, 's, S: Session + ?Sized> {
    shop: &'p Storefront<'s, S>,
}

impl<'p, 's, S: Session + ?Sized> ProductListPage<'p, 's, S> {
    pub(crate) const fn new(shop: &'p Storefront<'s, S>) -> Self {
        Self { shop }
    }

    /// Open the Color filter, pick `option_id`, wait for the grid to refresh
    pub fn apply_color_filter(&self, option_id: u32) -> SyncResult<StabilizationReport> {
        let _ = self.shop.click(&product::COLOR_FILTER_TITLE)?;
        let option = catalog::color_option(option_id);
        let (_, report) = self
            .shop
            .stabilizer()
            .act_and_settle(self.shop.session(), || self.shop.click(&option))?;
        info!(option_id, settled = report.is_settled(), "color filter applied");
        Ok(report)
    }

    /// Open the Price filter, pick `bucket` (e.g. `50-60`), wait for the grid to refresh
    pub fn apply_price_filter(&self, bucket: &str) -> SyncResult<StabilizationReport> {
        let _ = self.shop.click(&product::PRICE_FILTER_TITLE)?;
        let option = catalog::price_option(bucket);
        let (_, report) = self
            .shop
            .stabilizer()
            .act_and_settle(self.shop.session(), || self.shop.click(&option))?;
        info!(bucket, settled = report.is_settled(), "price filter applied");
        Ok(report)
    }

    /// Remove the price filter by script click and wait for the grid to refresh
    pub fn remove_price_filter(&self) -> SyncResult<StabilizationReport> {
        let _ = self
            .shop
            .waiter()
            .until_invisible(self.shop.session(), &product::LOADING_MASK);
        let (_, report) = self
            .shop
            .stabilizer()
            .act_and_settle(self.shop.session(), || {
                self.shop.script_click(&product::REMOVE_PRICE_FILTER)
            })?;
        info!(settled = report.is_settled(), "price filter removed");
        Ok(report)
    }

    /// Filters listed under "Now Shopping by"
    pub fn filter_state(&self) -> SyncResult<FilterState> {
        FilterState::read(self.shop.session())
    }

    /// Every listed product shows the selected swatch for `option_id`
    pub fn verify_color_filter(&self, option_id: u32) -> SyncResult<usize> {
        verify::verify_filter_applied(
            self.shop.session(),
            &catalog::selected_color_marker(option_id),
        )
    }

    /// Displayed product tiles
    pub fn product_count(&self) -> SyncResult<usize> {
        self.shop.session().count_displayed(&product::PRODUCT_ITEM)
    }

    /// Displayed product tiles must equal `expected`
    pub fn verify_product_count(&self, expected: usize) -> SyncResult<usize> {
        verify::verify_count(self.shop.session(), &product::PRODUCT_ITEM, expected)
    }

    /// Prices shown in the grid
    pub fn listed_prices(&self) -> SyncResult<Vec<PriceSample>> {
        verify::read_prices(self.shop.session(), &product::LISTED_PRICE)
    }

    /// Every listed price parses and lies in `range`
    pub fn verify_price_range(&self, range: PriceRange) -> SyncResult<()> {
        verify::verify_price_range(&self.listed_prices()?, range, false)
    }

    /// Add every listed product to the cart.
    ///
    /// A product that cannot be added is logged and skipped. Returns how many
    /// were added.
    pub fn add_all_to_cart(&self) -> SyncResult<usize> {
        let session = self.shop.session();
        let total = session.count(&product::PRODUCT_ITEM)?;
        let mut added = 0;
        for index in 0..total {
            match self.add_to_cart(index) {
                Ok(()) => {
                    added += 1;
                    info!(product = index + 1, "added to cart");
                }
                Err(e) => warn!(product = index + 1, error = %e, "product not added to cart"),
            }
        }
        Ok(added)
    }

    fn add_to_cart(&self, index: usize) -> SyncResult<()> {
        let session = self.shop.session();
        let actions = self.shop.actions();
        self.shop.expect_fresh(&cart::SUCCESS_MESSAGE, || {
            self.shop.retry().run(|| {
                let tiles = session.resolve_all(&product::PRODUCT_ITEM)?;
                let tile = tiles
                    .get(index)
                    .ok_or_else(|| SyncError::not_found(format!("product item {}", index + 1)))?;
                let swatch = session.resolve_within(tile, &product::SIZE_SWATCH)?;
                let _ = actions.perform_on(session, &swatch, &ActionKind::click())?;
                let button = session.resolve_within(tile, &product::ADD_TO_CART)?;
                let _ = actions.perform_on(session, &button, &ActionKind::click())?;
                Ok(())
            })
        })
    }

    /// Add the first two products to the wishlist.
    ///
    /// The first add navigates to the wishlist; the listing is re-opened with
    /// history back and re-resolved before the second add.
    pub fn add_first_two_to_wishlist(&self) -> SyncResult<()> {
        self.add_to_wishlist(0)?;
        info!(product = 1, "added to wishlist");

        self.shop.session().go_back()?;
        let _ = self
            .shop
            .waiter()
            .until_present(self.shop.session(), &product::PRODUCT_ITEM)?;

        self.add_to_wishlist(1)?;
        info!(product = 2, "added to wishlist");
        Ok(())
    }

    fn add_to_wishlist(&self, index: usize) -> SyncResult<()> {
        let session = self.shop.session();
        let actions = self.shop.actions().dismissing_overlays();
        self.shop.expect_fresh(&cart::SUCCESS_MESSAGE, || {
            self.shop.retry().run(|| {
                let buttons = session.resolve_all(&product::WISHLIST_BUTTON)?;
                let button = buttons.get(index).ok_or_else(|| {
                    SyncError::not_found(format!("{} {}", product::WISHLIST_BUTTON.name(), index + 1))
                })?;
                let _ = actions.perform_on(session, button, &ActionKind::click())?;
                Ok(())
            })
        })
    }
}
