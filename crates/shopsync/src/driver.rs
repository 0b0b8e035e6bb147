//! Browser session abstraction.
//!
//! The engine never talks to a browser directly; it goes through the
//! [`Session`] trait so the Chromium backend (feature `browser`) and the
//! scripted test session are interchangeable.
//!
//! All methods take `&self`: a session is a handle to external, mutable
//! browser state, exclusively owned by the scenario currently running.

use crate::locator::{Locator, Selector};
use crate::result::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to one resolved element in the live document.
///
/// Handles are issued by [`Session::find_all`] and may go stale when the
/// page replaces the element; every operation on a stale handle fails with
/// [`SyncError::StaleReference`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Session-scoped identifier
    pub id: String,
    /// Logical name of the locator that produced the handle
    pub origin: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.origin, self.id)
    }
}

/// Scripts the engine sends through [`Session::execute_script`].
///
/// Element arguments are available as `arguments[0]`, `arguments[1]`, ...
pub mod scripts {
    /// Script-invoked click
    pub const CLICK: &str = "arguments[0].click();";
    /// Bring element to the vertical center of the viewport
    pub const SCROLL_INTO_VIEW: &str = "arguments[0].scrollIntoView({block: 'center'});";
    /// Set an input's value and fire input/change events; text in `arguments[1]`
    pub const SET_VALUE: &str = "arguments[0].value = arguments[1]; \
         arguments[0].dispatchEvent(new Event('input', {bubbles: true})); \
         arguments[0].dispatchEvent(new Event('change', {bubbles: true}));";
    /// Synthesized hover
    pub const HOVER: &str = "arguments[0].dispatchEvent(new MouseEvent('mouseover', {bubbles: true}));";
    /// Hide popups that sit on top of product tiles
    pub const HIDE_OVERLAYS: &str = "document.querySelectorAll('.overlay, .popup')\
         .forEach(function(e){ e.style.display = 'none'; }); return true;";
    /// Async-activity probe: in-flight jQuery requests (null without jQuery) and ready state
    pub const ASYNC_PROBE: &str = "return { inFlight: (window.jQuery !== undefined && \
         typeof window.jQuery.active === 'number') ? window.jQuery.active : null, \
         readyState: document.readyState };";
}

/// Result of the async-activity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncActivity {
    /// In-flight requests; `None` when the page has no probe
    pub in_flight: Option<u32>,
    /// `document.readyState`
    pub ready_state: String,
}

impl AsyncActivity {
    /// Quiescent: no known in-flight requests and the document is complete
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.in_flight.unwrap_or(0) == 0 && self.ready_state == "complete"
    }
}

/// The browser-session collaborator
pub trait Session {
    /// Navigate to an absolute URL
    fn navigate(&self, url: &str) -> SyncResult<()>;

    /// Go back in history
    fn go_back(&self) -> SyncResult<()>;

    /// Current page title
    fn title(&self) -> SyncResult<String>;

    /// Current URL
    fn current_url(&self) -> SyncResult<String>;

    /// Resolve a selector against the whole document
    fn find_all(&self, selector: &Selector, origin: &str) -> SyncResult<Vec<ElementHandle>>;

    /// Resolve a selector inside a previously resolved element
    fn find_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
        origin: &str,
    ) -> SyncResult<Vec<ElementHandle>>;

    /// Native click. May fail with `Intercepted`, `NotInteractable` or `StaleReference`.
    fn click(&self, element: &ElementHandle) -> SyncResult<()>;

    /// Native typing into the element
    fn send_keys(&self, element: &ElementHandle, text: &str) -> SyncResult<()>;

    /// Native pointer hover
    fn hover(&self, element: &ElementHandle) -> SyncResult<()>;

    /// Whether the element is rendered and visible
    fn is_displayed(&self, element: &ElementHandle) -> SyncResult<bool>;

    /// Whether the element accepts input
    fn is_enabled(&self, element: &ElementHandle) -> SyncResult<bool>;

    /// Rendered text
    fn text(&self, element: &ElementHandle) -> SyncResult<String>;

    /// Attribute value
    fn attribute(&self, element: &ElementHandle, name: &str) -> SyncResult<Option<String>>;

    /// Run a script with element arguments and optional extra string argument
    fn execute_script(
        &self,
        script: &str,
        elements: &[&ElementHandle],
        extra: Option<&str>,
    ) -> SyncResult<serde_json::Value>;

    /// Whether the handle still points into the live document
    fn is_attached(&self, element: &ElementHandle) -> SyncResult<bool> {
        match self.is_enabled(element) {
            Ok(_) => Ok(true),
            Err(SyncError::StaleReference { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read the async-activity probe
    fn async_activity(&self) -> SyncResult<AsyncActivity> {
        let value = self.execute_script(scripts::ASYNC_PROBE, &[], None)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Resolution helpers over any [`Session`]
pub trait SessionExt: Session {
    /// Every current match of a locator
    fn resolve_all(&self, locator: &Locator) -> SyncResult<Vec<ElementHandle>> {
        let handles = self.find_all(locator.selector(), locator.name())?;
        tracing::trace!(locator = %locator, matches = handles.len(), "resolved");
        Ok(handles)
    }

    /// First current match, or `ElementNotFound`
    fn resolve(&self, locator: &Locator) -> SyncResult<ElementHandle> {
        self.resolve_all(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::not_found(locator.name()))
    }

    /// First match inside `parent`, or `ElementNotFound`
    fn resolve_within(&self, parent: &ElementHandle, locator: &Locator) -> SyncResult<ElementHandle> {
        self.find_within(parent, locator.selector(), locator.name())?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::not_found(locator.name()))
    }

    /// Number of current matches
    fn count(&self, locator: &Locator) -> SyncResult<usize> {
        Ok(self.resolve_all(locator)?.len())
    }

    /// Number of current matches that are displayed; stale matches are skipped
    fn count_displayed(&self, locator: &Locator) -> SyncResult<usize> {
        let mut shown = 0;
        for handle in self.resolve_all(locator)? {
            match self.is_displayed(&handle) {
                Ok(true) => shown += 1,
                Ok(false) | Err(SyncError::StaleReference { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(shown)
    }
}

impl<S: Session + ?Sized> SessionExt for S {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_handle_display() {
        let h = ElementHandle::new("7", "product item");
        assert_eq!(h.to_string(), "product item#7");
    }

    mod async_activity_tests {
        use super::*;

        #[test]
        fn test_quiescent_without_probe() {
            let a = AsyncActivity {
                in_flight: None,
                ready_state: "complete".into(),
            };
            assert!(a.is_quiescent());
        }

        #[test]
        fn test_not_quiescent_while_loading() {
            let a = AsyncActivity {
                in_flight: Some(0),
                ready_state: "interactive".into(),
            };
            assert!(!a.is_quiescent());
        }

        #[test]
        fn test_not_quiescent_with_requests() {
            let a = AsyncActivity {
                in_flight: Some(2),
                ready_state: "complete".into(),
            };
            assert!(!a.is_quiescent());
        }

        #[test]
        fn test_deserialize_probe_payload() {
            let v = serde_json::json!({"inFlight": null, "readyState": "complete"});
            let a: AsyncActivity = serde_json::from_value(v).unwrap();
            assert_eq!(a.in_flight, None);
            assert_eq!(a.ready_state, "complete");
        }
    }
}
