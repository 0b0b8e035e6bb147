//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a logical, named reference to zero-or-more elements in
//! the live document. It is resolved lazily through a [`crate::Session`]
//! every time it is used; resolved handles are never cached across waits.

use std::borrow::Cow;
use std::fmt;

/// Selector expression understood by the browser session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Element id (e.g., "email")
    Id(Cow<'static, str>),
    /// CSS selector (e.g., ".product-item")
    Css(Cow<'static, str>),
    /// XPath expression (e.g., "//a[contains(text(),'Sign In')]")
    XPath(Cow<'static, str>),
}

impl Selector {
    /// Create a CSS selector from any string
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(Cow::Owned(selector.into()))
    }

    /// Create an XPath selector from any string
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(Cow::Owned(expr.into()))
    }

    /// Create an id selector from any string
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(Cow::Owned(id.into()))
    }

    /// Raw expression text
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::Id(s) | Self::Css(s) | Self::XPath(s) => s,
        }
    }

    /// Strategy name as used in diagnostics
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
        }
    }

    /// JavaScript expression evaluating to an array of every match under `root`.
    ///
    /// `root` must be a JS expression naming a `Node` (usually `document`).
    #[must_use]
    pub fn to_query_all(&self, root: &str) -> String {
        match self {
            Self::Id(id) => format!(
                "(function(r){{const e=(r.ownerDocument||r).getElementById({id:?});\
                 return e&&(r===document||r.contains(e))?[e]:[];}})({root})"
            ),
            Self::Css(css) => format!("Array.from({root}.querySelectorAll({css:?}))"),
            Self::XPath(xp) => format!(
                "(function(r){{const s=document.evaluate({xp:?},r,null,\
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE,null);const out=[];\
                 for(let i=0;i<s.snapshotLength;i++){{out.push(s.snapshotItem(i));}}\
                 return out;}})({root})"
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.expression())
    }
}

/// A named locator for a logical UI target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    name: Cow<'static, str>,
    selector: Selector,
}

impl Locator {
    /// Locator by element id (const, for the catalog)
    #[must_use]
    pub const fn id(name: &'static str, id: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            selector: Selector::Id(Cow::Borrowed(id)),
        }
    }

    /// Locator by CSS selector (const, for the catalog)
    #[must_use]
    pub const fn css(name: &'static str, css: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            selector: Selector::Css(Cow::Borrowed(css)),
        }
    }

    /// Locator by XPath (const, for the catalog)
    #[must_use]
    pub const fn xpath(name: &'static str, xpath: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            selector: Selector::XPath(Cow::Borrowed(xpath)),
        }
    }

    /// Locator built at runtime (e.g., parameterized by a filter value)
    #[must_use]
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            selector,
        }
    }

    /// Logical name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.selector)
    }
}
