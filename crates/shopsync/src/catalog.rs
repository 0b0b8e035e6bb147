//! Locator catalog for the Luma storefront.
//!
//! Maps logical UI targets to locator expressions. Static data only; the
//! few parameterized targets are plain constructor functions.

use crate::locator::{Locator, Selector};

/// Header, sign-in and registration
pub mod account {
    use super::Locator;

    pub const SIGN_IN_LINK: Locator =
        Locator::xpath("sign in link", "//a[contains(text(),'Sign In')]");
    pub const EMAIL: Locator = Locator::id("login email", "email");
    pub const PASSWORD: Locator = Locator::id("login password", "pass");
    pub const SIGN_IN_BUTTON: Locator = Locator::id("sign in button", "send2");
    pub const LOGGED_IN_BANNER: Locator = Locator::xpath(
        "logged-in banner",
        "//div[@class='panel header']//span[@class='logged-in']",
    );

    pub const CREATE_ACCOUNT_LINK: Locator =
        Locator::xpath("create account link", "//a[contains(text(),'Create an Account')]");
    pub const FIRST_NAME: Locator = Locator::id("first name", "firstname");
    pub const LAST_NAME: Locator = Locator::id("last name", "lastname");
    pub const REGISTER_EMAIL: Locator = Locator::id("registration email", "email_address");
    pub const REGISTER_PASSWORD: Locator = Locator::id("registration password", "password");
    pub const CONFIRM_PASSWORD: Locator =
        Locator::id("password confirmation", "password-confirmation");
    pub const CREATE_ACCOUNT_BUTTON: Locator = Locator::xpath(
        "create account button",
        "//button[@title='Create an Account']",
    );
    pub const REGISTER_SUCCESS: Locator = Locator::xpath(
        "registration success message",
        "//div[@class='message-success success message']",
    );

    pub const CUSTOMER_MENU_TOGGLE: Locator = Locator::xpath(
        "customer menu toggle",
        "//button[@data-action='customer-menu-toggle']",
    );
    pub const SIGN_OUT_LINK: Locator =
        Locator::xpath("sign out link", "//a[contains(text(), 'Sign Out')]");
    pub const PROFILE_LINK: Locator =
        Locator::xpath("profile link", "//a[contains(@href, 'customer/account')]");
    pub const CUSTOMER_NAME: Locator = Locator::css("customer name", "span.customer-name");
    pub const WISHLIST_MENU_LINK: Locator =
        Locator::css("wishlist menu link", "div.customer-menu a[href*='wishlist']");
}

/// Top navigation menu
pub mod navigation {
    use super::Locator;

    pub const WOMEN_MENU: Locator = Locator::xpath("women menu", "//span[text()='Women']");
    pub const TOPS_MENU: Locator = Locator::xpath("tops menu", "//span[text()='Tops']");
    pub const JACKETS_LINK: Locator =
        Locator::xpath("jackets link", "//a[span[text()='Jackets']]");
}

/// Product listing, layered navigation filters and grid
pub mod product {
    use super::Locator;

    pub const LOADING_MASK: Locator = Locator::css("loading overlay", ".loading-mask");
    pub const PRODUCT_GRID: Locator =
        Locator::css("product grid", ".products.wrapper.grid.products-grid");
    pub const PRODUCT_ITEM: Locator = Locator::css("product item", ".product-item");
    pub const LISTED_PRICE: Locator = Locator::xpath(
        "listed price",
        "//ol[@class='products list items product-items']//span[@class='price']",
    );
    pub const COLOR_FILTER_TITLE: Locator = Locator::xpath(
        "color filter toggle",
        "//div[contains(@class, 'filter-options-title') and text()='Color']",
    );
    pub const PRICE_FILTER_TITLE: Locator = Locator::xpath(
        "price filter toggle",
        "//div[contains(@class, 'filter-options-title') and text()='Price']",
    );
    pub const REMOVE_PRICE_FILTER: Locator = Locator::xpath(
        "remove price filter",
        "//a[@class='action remove' and contains(@title, 'Remove Price')]",
    );
    pub const ACTIVE_FILTER: Locator =
        Locator::css("active filter", ".filter-current .items .item");
    pub const ACTIVE_FILTER_LABEL: Locator = Locator::css("active filter label", ".filter-label");
    pub const ACTIVE_FILTER_VALUE: Locator = Locator::css("active filter value", ".filter-value");
    pub const SIZE_SWATCH: Locator = Locator::css("size swatch", ".swatch-option.text");
    pub const ADD_TO_CART: Locator =
        Locator::css("add to cart button", ".actions-primary button.tocart");
    pub const WISHLIST_BUTTON: Locator =
        Locator::css("add to wishlist button", ".actions-secondary .towishlist");
}

/// Toast messages, mini-cart and the shopping cart page
pub mod cart {
    use super::Locator;

    pub const SUCCESS_MESSAGE: Locator = Locator::css("success message", ".message-success");
    pub const CART_LINK_IN_MESSAGE: Locator = Locator::css(
        "cart link in success message",
        ".message-success a[href*='checkout/cart']",
    );
    pub const LINE_SUBTOTAL: Locator =
        Locator::css("line subtotal", "td.col.subtotal span.price");
    pub const ORDER_TOTAL: Locator = Locator::css("order total", ".grand.totals .price");
    pub const CART_ITEM: Locator = Locator::css("cart item", ".cart.item");
    pub const DELETE_ITEM: Locator = Locator::css("delete item button", "a.action.action-delete");
    pub const EMPTY_MESSAGE: Locator = Locator::xpath(
        "empty cart message",
        "//div[@class='cart-empty']/p[contains(text(),'You have no items in your shopping cart')]",
    );
    pub const MINICART_TOGGLE: Locator = Locator::css("mini cart toggle", ".action.showcart");
    pub const MINICART: Locator = Locator::css("mini cart", ".block-minicart");
    pub const VIEW_CART: Locator = Locator::xpath(
        "view and edit cart",
        "//a[@class='action viewcart']//span[contains(text(),'View and Edit Cart')]",
    );
}

/// Wishlist sidebar
pub mod wishlist {
    use super::Locator;

    pub const COUNTER: Locator = Locator::css("wishlist counter", ".counter.qty");
}

/// Option link inside the color filter, keyed by the storefront's option id
#[must_use]
pub fn color_option(option_id: u32) -> Locator {
    Locator::new(
        format!("color option {option_id}"),
        Selector::xpath(format!("//a[contains(@href, 'color={option_id}')]/div")),
    )
}

/// "Selected" swatch marker for a color option inside a product tile
#[must_use]
pub fn selected_color_marker(option_id: u32) -> Locator {
    Locator::new(
        format!("selected color marker {option_id}"),
        Selector::css(format!("div[option-id='{option_id}'].swatch-option.color.selected")),
    )
}

/// Option link inside the price filter for a `low-high` bucket
#[must_use]
pub fn price_option(bucket: &str) -> Locator {
    Locator::new(
        format!("price option {bucket}"),
        Selector::xpath(format!("//a[contains(@href, 'price={bucket}')]")),
    )
}
