//! Scripted Luma storefront for scenario tests.
//!
//! Interactions mutate the mock document the way the live store does:
//! filter clicks show the loading mask, keep a request in flight, then
//! replace the product grid a little later; wishlist adds leave the listing
//! and history back rebuilds it.

#![allow(dead_code)]

use shopsync::catalog::{self, account, cart, navigation, product, wishlist};
use shopsync::mock::{MockDocument, MockNode, MockSession};
use shopsync::scenario::BLUE_OPTION_ID;
use shopsync::{Credentials, Locator, Price, RunConfig, StabilizationTimeouts};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Promo popup covering the wishlist buttons
pub const PROMO_POPUP: Locator = Locator::css("promo popup", ".popup");

/// Delay between an interaction and the page reacting to it
pub const REFRESH: Duration = Duration::from_millis(30);

/// One product tile
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    pub price: &'static str,
    pub blue: bool,
}

const fn tile(price: &'static str, blue: bool) -> Tile {
    Tile { price, blue }
}

pub const ALL_JACKETS: &[Tile] = &[
    tile("$45.00", true),
    tile("$52.00", true),
    tile("$69.00", false),
    tile("$59.99", true),
    tile("$55.00", false),
];
pub const BLUE_JACKETS: &[Tile] = &[tile("$45.00", true), tile("$52.00", true), tile("$59.99", true)];
pub const BLUE_FIFTY_TO_SIXTY: &[Tile] = &[tile("$52.00", true), tile("$59.99", true)];

/// Shared storefront state and behavior switches
#[derive(Debug, Clone, Default)]
pub struct Shop {
    /// Line subtotals currently in the cart
    pub cart: Rc<RefCell<Vec<&'static str>>>,
    /// Items on the wishlist
    pub wishlist: Rc<Cell<u32>>,
    /// Tiles the listing shows right now
    pub listing: Rc<Cell<&'static [Tile]>>,
    /// Displayed order total; computed from the lines when unset
    pub total_override: Option<&'static str>,
    /// Filter clicks leave the grid untouched
    pub frozen_grid: bool,
    /// Positions of tiles whose cart and wishlist buttons do nothing
    pub inert_tiles: &'static [usize],
    /// The price filter is applied but never listed under "Now Shopping by"
    pub unlisted_price_filter: bool,
}

impl Shop {
    pub fn with_cart(lines: &[&'static str]) -> Self {
        let shop = Self::default();
        shop.cart.borrow_mut().extend_from_slice(lines);
        shop
    }
}

/// Configuration with tight timeouts and signed-in credentials
pub fn config() -> RunConfig {
    let mut config = RunConfig::new("https://shop.test")
        .with_credentials(Credentials::new("roni_cost@example.com", "roni_cost3@example.com"));
    config.default_timeout = 800;
    config.poll_interval = 5;
    config.stabilization = StabilizationTimeouts {
        overlay_timeout: 300,
        ajax_timeout: 300,
        replacement_timeout: 300,
    };
    config
}

/// A fresh session on the storefront's home page
pub fn storefront(shop: &Shop) -> MockSession {
    let session = MockSession::new();
    session.with_doc(|doc| {
        doc.title = "Home Page".into();
        header(doc);
        registration(doc);
        navigation_menu(doc, shop);
        minicart(doc, shop);
        customer_menu(doc, shop);
        let shop = shop.clone();
        doc.on_back(move |doc| {
            if doc.count(&product::PRODUCT_GRID) == 0 && !shop.listing.get().is_empty() {
                grid(doc, shop.listing.get(), &shop);
            }
        });
    });
    session
}

fn header(doc: &mut MockDocument) {
    let _ = doc.add(MockNode::new(&account::SIGN_IN_LINK));
    let _ = doc.add(MockNode::new(&account::EMAIL));
    let _ = doc.add(MockNode::new(&account::PASSWORD));
    let submit = doc.add(MockNode::new(&account::SIGN_IN_BUTTON));
    doc.on_click(submit, |doc| {
        doc.after(REFRESH, |doc| {
            let _ = doc.add(MockNode::new(&account::LOGGED_IN_BANNER).text("Welcome, Roni Cost!"));
        });
    });

    let toggle = doc.add(MockNode::new(&account::CUSTOMER_MENU_TOGGLE));
    let sign_out = doc.add(MockNode::new(&account::SIGN_OUT_LINK).hidden());
    doc.on_click(toggle, move |doc| doc.node_mut(sign_out).displayed = true);
    doc.on_click(sign_out, |doc| {
        doc.detach_all(&account::LOGGED_IN_BANNER);
        doc.title = "You are signed out".into();
    });
    let _ = doc.add(MockNode::new(&account::PROFILE_LINK));
}

fn registration(doc: &mut MockDocument) {
    let _ = doc.add(MockNode::new(&account::CREATE_ACCOUNT_LINK));
    for field in [
        &account::FIRST_NAME,
        &account::LAST_NAME,
        &account::REGISTER_EMAIL,
        &account::REGISTER_PASSWORD,
        &account::CONFIRM_PASSWORD,
    ] {
        let _ = doc.add(MockNode::new(field));
    }
    let submit = doc.add(MockNode::new(&account::CREATE_ACCOUNT_BUTTON));
    doc.on_click(submit, |doc| {
        doc.after(REFRESH, |doc| {
            let _ = doc.add(
                MockNode::new(&account::REGISTER_SUCCESS)
                    .text("Thank you for registering with Main Website Store."),
            );
            let _ = doc.add(MockNode::new(&account::LOGGED_IN_BANNER).text("Welcome, Shop Sync!"));
        });
    });
}

fn navigation_menu(doc: &mut MockDocument, shop: &Shop) {
    let women = doc.add(MockNode::new(&navigation::WOMEN_MENU));
    let tops = doc.add(MockNode::new(&navigation::TOPS_MENU).hidden());
    let jackets = doc.add(MockNode::new(&navigation::JACKETS_LINK).hidden());
    doc.on_hover(women, move |doc| doc.node_mut(tops).displayed = true);
    doc.on_hover(tops, move |doc| doc.node_mut(jackets).displayed = true);
    let shop = shop.clone();
    doc.on_click(jackets, move |doc| jackets_listing(doc, &shop));
}

fn jackets_listing(doc: &mut MockDocument, shop: &Shop) {
    doc.title = "Jackets - Tops - Women".into();
    let _ = doc.add(MockNode::new(&product::COLOR_FILTER_TITLE));
    let _ = doc.add(MockNode::new(&product::PRICE_FILTER_TITLE));
    let blue = doc.add(MockNode::new(&catalog::color_option(BLUE_OPTION_ID)));
    let bucket = doc.add(MockNode::new(&catalog::price_option("50-60")));
    let remove = doc.add(MockNode::new(&product::REMOVE_PRICE_FILTER).hidden());

    shop.listing.set(ALL_JACKETS);
    grid(doc, ALL_JACKETS, shop);

    let s = shop.clone();
    doc.on_click(blue, move |doc| {
        refresh(doc, &s, BLUE_JACKETS, |doc| active_filter(doc, "Color", "Blue"));
    });
    let s = shop.clone();
    doc.on_click(bucket, move |doc| {
        doc.node_mut(remove).displayed = true;
        let listed = !s.unlisted_price_filter;
        refresh(doc, &s, BLUE_FIFTY_TO_SIXTY, move |doc| {
            if listed {
                active_filter(doc, "Price", "$50.00 - $59.99");
            }
        });
    });
    let s = shop.clone();
    doc.on_click(remove, move |doc| {
        doc.node_mut(remove).displayed = false;
        refresh(doc, &s, BLUE_JACKETS, |doc| {
            doc.detach_all(&PRICE_FILTER_ITEM);
        });
    });
}

/// Marks the "Now Shopping by" item of the price filter
const PRICE_FILTER_ITEM: Locator = Locator::css("price filter item", ".item.price");

fn active_filter(doc: &mut MockDocument, label: &str, value: &str) {
    let mut item = MockNode::new(&product::ACTIVE_FILTER);
    if label == "Price" {
        item = item.matching(&PRICE_FILTER_ITEM);
    }
    let item = doc.add(item);
    let _ = doc.add(MockNode::new(&product::ACTIVE_FILTER_LABEL).text(label).child_of(item));
    let _ = doc.add(MockNode::new(&product::ACTIVE_FILTER_VALUE).text(value).child_of(item));
}

/// Loading mask and an in-flight request now; after [`REFRESH`] a new grid
/// and whatever `rerender` changes around it
fn refresh(
    doc: &mut MockDocument,
    shop: &Shop,
    tiles: &'static [Tile],
    rerender: impl FnOnce(&mut MockDocument) + 'static,
) {
    if shop.frozen_grid {
        return;
    }
    let _ = doc.add(MockNode::new(&product::LOADING_MASK));
    doc.in_flight = Some(1);
    shop.listing.set(tiles);
    let shop = shop.clone();
    doc.after(REFRESH, move |doc| {
        doc.detach_all(&product::PRODUCT_GRID);
        grid(doc, tiles, &shop);
        rerender(doc);
        doc.detach_all(&product::LOADING_MASK);
        doc.in_flight = Some(0);
    });
}

fn grid(doc: &mut MockDocument, tiles: &[Tile], shop: &Shop) {
    let grid = doc.add(MockNode::new(&product::PRODUCT_GRID));
    for (position, tile) in tiles.iter().enumerate() {
        let inert = shop.inert_tiles.contains(&position);
        let item = doc.add(MockNode::new(&product::PRODUCT_ITEM).child_of(grid));
        let _ = doc.add(
            MockNode::new(&product::LISTED_PRICE)
                .text(tile.price)
                .child_of(item),
        );
        if tile.blue {
            let _ = doc.add(
                MockNode::new(&catalog::selected_color_marker(BLUE_OPTION_ID)).child_of(item),
            );
        }
        let _ = doc.add(MockNode::new(&product::SIZE_SWATCH).child_of(item));

        let add = doc.add(MockNode::new(&product::ADD_TO_CART).child_of(item));
        let price = tile.price;
        let s = shop.clone();
        doc.on_click(add, move |doc| {
            if inert {
                return;
            }
            s.cart.borrow_mut().push(price);
            success_message(doc, &s, "You added Jacket to your shopping cart.");
        });

        // a promo popup sits on top of every wishlist button
        let heart = doc.add(
            MockNode::new(&product::WISHLIST_BUTTON)
                .intercepted()
                .child_of(item),
        );
        let s = shop.clone();
        doc.on_click(heart, move |doc| {
            if inert {
                return;
            }
            s.wishlist.set(s.wishlist.get() + 1);
            doc.detach_all(&product::PRODUCT_GRID);
            doc.title = "My Wish List".into();
            success_message(doc, &s, "Jacket has been added to your Wish List.");
        });
    }
    let _ = doc.add(MockNode::new(&PROMO_POPUP).overlay());
}

fn success_message(doc: &mut MockDocument, shop: &Shop, text: &str) {
    doc.detach_all(&cart::SUCCESS_MESSAGE);
    let message = doc.add(MockNode::new(&cart::SUCCESS_MESSAGE).text(text));
    let link = doc.add(MockNode::new(&cart::CART_LINK_IN_MESSAGE).child_of(message));
    let shop = shop.clone();
    doc.on_click(link, move |doc| cart_page(doc, &shop));
}

fn minicart(doc: &mut MockDocument, shop: &Shop) {
    let toggle = doc.add(MockNode::new(&cart::MINICART_TOGGLE));
    let panel = doc.add(MockNode::new(&cart::MINICART).hidden());
    let view = doc.add(MockNode::new(&cart::VIEW_CART).hidden().child_of(panel));
    doc.on_click(toggle, move |doc| {
        doc.node_mut(panel).displayed = true;
        doc.node_mut(view).displayed = true;
    });
    let shop = shop.clone();
    doc.on_click(view, move |doc| cart_page(doc, &shop));
}

fn cart_page(doc: &mut MockDocument, shop: &Shop) {
    doc.detach_all(&product::PRODUCT_GRID);
    doc.detach_all(&cart::SUCCESS_MESSAGE);
    doc.after(REFRESH, {
        let shop = shop.clone();
        move |doc| build_cart(doc, &shop)
    });
}

fn build_cart(doc: &mut MockDocument, shop: &Shop) {
    doc.title = "Shopping Cart".into();
    let lines = shop.cart.borrow().clone();
    let empty = doc.add(MockNode::new(&cart::EMPTY_MESSAGE).text("You have no items in your shopping cart."));
    if lines.is_empty() {
        return;
    }
    doc.node_mut(empty).displayed = false;

    let total = match shop.total_override {
        Some(total) => total.to_string(),
        None => {
            let sum: Price = lines.iter().map(|p| p.parse::<Price>().unwrap_or(Price::ZERO)).sum();
            format!("${sum}")
        }
    };
    let summary = doc.add(MockNode::new(&cart::ORDER_TOTAL).text(total));

    for line in lines {
        let row = doc.add(MockNode::new(&cart::CART_ITEM));
        let _ = doc.add(MockNode::new(&cart::LINE_SUBTOTAL).text(line).child_of(row));
        let delete = doc.add(MockNode::new(&cart::DELETE_ITEM).child_of(row));
        let s = shop.clone();
        doc.on_click(delete, move |doc| {
            doc.after(REFRESH, {
                let s = s.clone();
                move |doc| {
                    doc.detach(row);
                    let mut lines = s.cart.borrow_mut();
                    if let Some(pos) = lines.iter().position(|p| *p == line) {
                        let _ = lines.remove(pos);
                    }
                    if doc.count(&cart::CART_ITEM) == 0 {
                        doc.detach(summary);
                        doc.node_mut(empty).displayed = true;
                    }
                }
            });
        });
    }
}

fn customer_menu(doc: &mut MockDocument, shop: &Shop) {
    let name = doc.add(MockNode::new(&account::CUSTOMER_NAME));
    let link = doc.add(MockNode::new(&account::WISHLIST_MENU_LINK).hidden());
    doc.on_click(name, move |doc| doc.node_mut(link).displayed = true);
    let shop = shop.clone();
    doc.on_click(link, move |doc| {
        doc.detach_all(&wishlist::COUNTER);
        let count = shop.wishlist.get();
        let _ = doc.add(MockNode::new(&wishlist::COUNTER).text(format!("{count} items")));
    });
}
