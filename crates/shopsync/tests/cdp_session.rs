//! Chromium session checks; need a local Chromium, so they only run on request
//! (`cargo test -p shopsync --features browser -- --ignored`).

#![cfg(feature = "browser")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use shopsync::{BrowserSettings, CdpSession, Locator, Session, SessionExt};

const ITEM: Locator = Locator::css("list item", "li");
const NOTE: Locator = Locator::css("note", ".note");

fn page() -> CdpSession {
    let session = CdpSession::launch(&BrowserSettings::default()).expect("chromium should launch");
    session
        .navigate("data:text/html,<ul><li>one</li><li>two</li></ul><p%20class='note'>hi</p>")
        .unwrap();
    session
}

fn registry_size(session: &CdpSession) -> u64 {
    session
        .execute_script("return window.__shopsync.nodes.size;", &[], None)
        .unwrap()
        .as_u64()
        .unwrap()
}

#[test]
#[ignore = "needs Chromium"]
fn test_missing_attribute_is_none() {
    let session = page();
    let note = session.resolve(&NOTE).unwrap();
    assert_eq!(session.attribute(&note, "data-sku").unwrap(), None);
    assert_eq!(session.attribute(&note, "class").unwrap().as_deref(), Some("note"));
}

#[test]
#[ignore = "needs Chromium"]
fn test_repeated_resolution_keeps_registry_bounded() {
    let session = page();
    let first = session.resolve_all(&ITEM).unwrap();
    for _ in 0..20 {
        assert_eq!(session.resolve_all(&ITEM).unwrap(), first);
    }
    assert_eq!(registry_size(&session), 2);

    let _ = session
        .execute_script("document.querySelector('ul').remove(); return null;", &[], None)
        .unwrap();
    assert!(session.resolve_all(&ITEM).unwrap().is_empty());
    assert_eq!(registry_size(&session), 0);
    assert!(!session.is_attached(&first[0]).unwrap());
}
