//! Scripted session for unit and scenario tests.
//!
//! `MockSession` holds a flat list of nodes that declare which selectors
//! they answer to. It models the three things the engine must cope with:
//! elements that detach (stale handles), interactions rejected by an
//! overlay, and changes that land some time after the action that caused
//! them (scheduled mutations). It does not parse CSS or XPath.

use crate::driver::{scripts, ElementHandle, Session};
use crate::locator::{Locator, Selector};
use crate::result::{SyncError, SyncResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Index of a node in the mock document
pub type NodeId = usize;

/// Mutation applied to the document when an interaction happens
pub type Reaction = Box<dyn FnMut(&mut MockDocument)>;

type Deferred = Box<dyn FnOnce(&mut MockDocument)>;

/// One element of the mock document
#[derive(Debug, Clone)]
pub struct MockNode {
    selectors: Vec<Selector>,
    parent: Option<NodeId>,
    /// Rendered and visible
    pub displayed: bool,
    /// Accepts input
    pub enabled: bool,
    /// Still part of the document
    pub attached: bool,
    /// Rendered text
    pub text: String,
    /// Input value
    pub value: String,
    /// Attributes
    pub attributes: HashMap<String, String>,
    /// Native clicks are intercepted by another element
    pub intercepted: bool,
    /// Script clicks fail as well
    pub script_click_fails: bool,
    /// Hidden by the overlay-dismissal script
    pub overlay: bool,
    /// Upcoming reads that report a stale reference
    pub stale_reads: u32,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            selectors: Vec::new(),
            parent: None,
            displayed: true,
            enabled: true,
            attached: true,
            text: String::new(),
            value: String::new(),
            attributes: HashMap::new(),
            intercepted: false,
            script_click_fails: false,
            overlay: false,
            stale_reads: 0,
        }
    }
}

impl MockNode {
    /// Node answering to `locator`
    #[must_use]
    pub fn new(locator: &Locator) -> Self {
        Self::default().matching(locator)
    }

    /// Also answer to `locator`
    #[must_use]
    pub fn matching(mut self, locator: &Locator) -> Self {
        self.selectors.push(locator.selector().clone());
        self
    }

    /// Set rendered text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Nest under `parent`
    #[must_use]
    pub const fn child_of(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Native clicks get intercepted
    #[must_use]
    pub const fn intercepted(mut self) -> Self {
        self.intercepted = true;
        self
    }

    /// Script clicks fail too
    #[must_use]
    pub const fn script_click_fails(mut self) -> Self {
        self.script_click_fails = true;
        self
    }

    /// Dismissable overlay
    #[must_use]
    pub const fn overlay(mut self) -> Self {
        self.overlay = true;
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }
}

/// The mutable state behind a [`MockSession`]
pub struct MockDocument {
    nodes: Vec<MockNode>,
    /// Page title
    pub title: String,
    /// Current URL
    pub url: String,
    history: Vec<String>,
    /// In-flight async requests; `None` models a page without the probe
    pub in_flight: Option<u32>,
    /// `document.readyState`
    pub ready_state: String,
    deferred: Vec<(Instant, Deferred)>,
    on_click: HashMap<NodeId, Vec<Reaction>>,
    on_hover: HashMap<NodeId, Vec<Reaction>>,
    on_back: Vec<Reaction>,
    log: Vec<String>,
}

impl std::fmt::Debug for MockDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDocument")
            .field("nodes", &self.nodes.len())
            .field("title", &self.title)
            .field("url", &self.url)
            .field("in_flight", &self.in_flight)
            .field("ready_state", &self.ready_state)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockDocument {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            title: String::new(),
            url: String::from("about:blank"),
            history: Vec::new(),
            in_flight: Some(0),
            ready_state: String::from("complete"),
            deferred: Vec::new(),
            on_click: HashMap::new(),
            on_hover: HashMap::new(),
            on_back: Vec::new(),
            log: Vec::new(),
        }
    }
}

impl MockDocument {
    /// Add a node, returning its id
    pub fn add(&mut self, node: MockNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Mutable access to a node
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by [`MockDocument::add`].
    pub fn node_mut(&mut self, id: NodeId) -> &mut MockNode {
        &mut self.nodes[id]
    }

    /// Shared access to a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> &MockNode {
        &self.nodes[id]
    }

    /// Detach a node and everything nested under it
    pub fn detach(&mut self, id: NodeId) {
        let mut doomed = vec![id];
        while let Some(current) = doomed.pop() {
            self.nodes[current].attached = false;
            doomed.extend(
                self.nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.parent == Some(current) && n.attached)
                    .map(|(i, _)| i),
            );
        }
    }

    /// Detach every attached node answering to `locator`
    pub fn detach_all(&mut self, locator: &Locator) {
        let ids: Vec<NodeId> = self.matching_ids(locator.selector(), None);
        for id in ids {
            self.detach(id);
        }
    }

    /// Run `change` once `delay` has passed (checked on every session call)
    pub fn after(&mut self, delay: Duration, change: impl FnOnce(&mut MockDocument) + 'static) {
        self.deferred.push((Instant::now() + delay, Box::new(change)));
    }

    /// Run `reaction` whenever `id` is clicked (natively or by script)
    pub fn on_click(&mut self, id: NodeId, reaction: impl FnMut(&mut MockDocument) + 'static) {
        self.on_click.entry(id).or_default().push(Box::new(reaction));
    }

    /// Run `reaction` whenever `id` is hovered
    pub fn on_hover(&mut self, id: NodeId, reaction: impl FnMut(&mut MockDocument) + 'static) {
        self.on_hover.entry(id).or_default().push(Box::new(reaction));
    }

    /// Run `reaction` on history back navigation
    pub fn on_back(&mut self, reaction: impl FnMut(&mut MockDocument) + 'static) {
        self.on_back.push(Box::new(reaction));
    }

    /// Append to the interaction log
    pub fn record(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    /// Interaction log
    #[must_use]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Attached nodes answering to `locator`
    #[must_use]
    pub fn count(&self, locator: &Locator) -> usize {
        self.matching_ids(locator.selector(), None).len()
    }

    fn matching_ids(&self, selector: &Selector, within: Option<NodeId>) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached && n.matches(selector))
            .filter(|(i, _)| within.map_or(true, |root| self.is_descendant(*i, root)))
            .map(|(i, _)| i)
            .collect()
    }

    fn is_descendant(&self, id: NodeId, root: NodeId) -> bool {
        let mut current = self.nodes[id].parent;
        while let Some(p) = current {
            if p == root {
                return true;
            }
            current = self.nodes[p].parent;
        }
        false
    }

    fn flush_due(&mut self) {
        let now = Instant::now();
        let (due, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.deferred).into_iter().partition(|(at, _)| *at <= now);
        self.deferred = later;
        for (_, change) in due {
            change(self);
        }
    }

    fn run_reactions(&mut self, id: NodeId, hover: bool) {
        let table = if hover { &mut self.on_hover } else { &mut self.on_click };
        let Some(mut reactions) = table.remove(&id) else {
            return;
        };
        for reaction in &mut reactions {
            reaction(self);
        }
        let table = if hover { &mut self.on_hover } else { &mut self.on_click };
        let added = table.remove(&id).unwrap_or_default();
        reactions.extend(added);
        let _ = table.insert(id, reactions);
    }

    fn live(&mut self, handle: &ElementHandle) -> SyncResult<NodeId> {
        let id: NodeId = handle
            .id
            .parse()
            .map_err(|_| SyncError::session(format!("foreign handle {handle}")))?;
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| SyncError::session(format!("unknown handle {handle}")))?;
        if !node.attached {
            return Err(SyncError::stale(handle.to_string()));
        }
        if node.stale_reads > 0 {
            node.stale_reads -= 1;
            return Err(SyncError::stale(handle.to_string()));
        }
        Ok(id)
    }

    fn script_click(&mut self, id: NodeId, handle: &ElementHandle) -> SyncResult<()> {
        if self.nodes[id].script_click_fails {
            return Err(SyncError::session(format!(
                "script click on {handle} had no effect"
            )));
        }
        self.record(format!("script-click:{}", handle.origin));
        self.run_reactions(id, false);
        Ok(())
    }
}

/// Scripted [`Session`] backed by a [`MockDocument`]
#[derive(Debug, Default)]
pub struct MockSession {
    doc: RefCell<MockDocument>,
}

impl MockSession {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the document (setup or mid-test changes)
    pub fn with_doc<R>(&self, f: impl FnOnce(&mut MockDocument) -> R) -> R {
        f(&mut *self.doc.borrow_mut())
    }

    /// Copy of the interaction log
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.doc.borrow().log.clone()
    }

    /// Whether any log entry starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.doc.borrow().log.iter().any(|e| e.starts_with(prefix))
    }

    fn doc(&self) -> std::cell::RefMut<'_, MockDocument> {
        let mut doc = self.doc.borrow_mut();
        doc.flush_due();
        doc
    }

    fn handles(ids: Vec<NodeId>, origin: &str) -> Vec<ElementHandle> {
        ids.into_iter()
            .map(|id| ElementHandle::new(id.to_string(), origin))
            .collect()
    }
}

impl Session for MockSession {
    fn navigate(&self, url: &str) -> SyncResult<()> {
        let mut doc = self.doc();
        let previous = std::mem::replace(&mut doc.url, url.to_string());
        doc.history.push(previous);
        doc.record(format!("navigate:{url}"));
        Ok(())
    }

    fn go_back(&self) -> SyncResult<()> {
        let mut doc = self.doc();
        if let Some(previous) = doc.history.pop() {
            doc.url = previous;
        }
        doc.record("go_back");
        let mut reactions = std::mem::take(&mut doc.on_back);
        for reaction in &mut reactions {
            reaction(&mut *doc);
        }
        reactions.append(&mut doc.on_back);
        doc.on_back = reactions;
        Ok(())
    }

    fn title(&self) -> SyncResult<String> {
        Ok(self.doc().title.clone())
    }

    fn current_url(&self) -> SyncResult<String> {
        Ok(self.doc().url.clone())
    }

    fn find_all(&self, selector: &Selector, origin: &str) -> SyncResult<Vec<ElementHandle>> {
        let doc = self.doc();
        Ok(Self::handles(doc.matching_ids(selector, None), origin))
    }

    fn find_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
        origin: &str,
    ) -> SyncResult<Vec<ElementHandle>> {
        let mut doc = self.doc();
        let root = doc.live(parent)?;
        Ok(Self::handles(doc.matching_ids(selector, Some(root)), origin))
    }

    fn click(&self, element: &ElementHandle) -> SyncResult<()> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        let node = doc.node(id);
        if node.intercepted {
            return Err(SyncError::Intercepted {
                locator: element.to_string(),
                message: "another element would receive the click".into(),
            });
        }
        if !node.displayed || !node.enabled {
            return Err(SyncError::NotInteractable {
                locator: element.to_string(),
                message: "element is hidden or disabled".into(),
            });
        }
        doc.record(format!("click:{}", element.origin));
        doc.run_reactions(id, false);
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> SyncResult<()> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        if !doc.node(id).displayed || !doc.node(id).enabled {
            return Err(SyncError::NotInteractable {
                locator: element.to_string(),
                message: "element is hidden or disabled".into(),
            });
        }
        doc.node_mut(id).value.push_str(text);
        doc.record(format!("type:{}={text}", element.origin));
        Ok(())
    }

    fn hover(&self, element: &ElementHandle) -> SyncResult<()> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        doc.record(format!("hover:{}", element.origin));
        doc.run_reactions(id, true);
        Ok(())
    }

    fn is_displayed(&self, element: &ElementHandle) -> SyncResult<bool> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        Ok(doc.node(id).displayed)
    }

    fn is_enabled(&self, element: &ElementHandle) -> SyncResult<bool> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        Ok(doc.node(id).enabled)
    }

    fn text(&self, element: &ElementHandle) -> SyncResult<String> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        let node = doc.node(id);
        Ok(if node.displayed { node.text.clone() } else { String::new() })
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> SyncResult<Option<String>> {
        let mut doc = self.doc();
        let id = doc.live(element)?;
        Ok(doc.node(id).attributes.get(name).cloned())
    }

    fn execute_script(
        &self,
        script: &str,
        elements: &[&ElementHandle],
        extra: Option<&str>,
    ) -> SyncResult<serde_json::Value> {
        let mut doc = self.doc();
        match script {
            scripts::ASYNC_PROBE => Ok(serde_json::json!({
                "inFlight": doc.in_flight,
                "readyState": doc.ready_state,
            })),
            scripts::HIDE_OVERLAYS => {
                for node in doc.nodes.iter_mut().filter(|n| n.overlay) {
                    node.displayed = false;
                }
                for node in &mut doc.nodes {
                    node.intercepted = false;
                }
                doc.record("hide-overlays");
                Ok(serde_json::Value::Bool(true))
            }
            _ => {
                let target = elements
                    .first()
                    .ok_or_else(|| SyncError::session("script requires an element argument"))?;
                let id = doc.live(target)?;
                match script {
                    scripts::CLICK => doc.script_click(id, target)?,
                    scripts::SCROLL_INTO_VIEW => doc.record(format!("scroll:{}", target.origin)),
                    scripts::HOVER => {
                        doc.record(format!("script-hover:{}", target.origin));
                        doc.run_reactions(id, true);
                    }
                    scripts::SET_VALUE => {
                        let value = extra.unwrap_or_default().to_string();
                        doc.record(format!("set-value:{}={value}", target.origin));
                        doc.node_mut(id).value = value;
                    }
                    other => {
                        return Err(SyncError::session(format!("unsupported script: {other}")));
                    }
                }
                Ok(serde_json::Value::Null)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::SessionExt;

    const BUTTON: Locator = Locator::css("button", "button.go");
    const GRID: Locator = Locator::css("grid", ".grid");
    const TILE: Locator = Locator::css("tile", ".tile");

    #[test]
    fn test_find_and_click_runs_reaction() {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let id = doc.add(MockNode::new(&BUTTON));
            doc.on_click(id, |d| d.title = "clicked".into());
        });
        let handle = session.resolve(&BUTTON).unwrap();
        session.click(&handle).unwrap();
        assert_eq!(session.title().unwrap(), "clicked");
        assert!(session.was_called("click:button"));
    }

    #[test]
    fn test_detached_handle_is_stale() {
        let session = MockSession::new();
        let id = session.with_doc(|doc| doc.add(MockNode::new(&GRID)));
        let handle = session.resolve(&GRID).unwrap();
        session.with_doc(|doc| doc.detach(id));
        assert!(session.text(&handle).unwrap_err().is_stale());
        assert!(!session.is_attached(&handle).unwrap());
        assert_eq!(session.count(&GRID).unwrap(), 0);
    }

    #[test]
    fn test_detach_cascades_to_children() {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let grid = doc.add(MockNode::new(&GRID));
            let _ = doc.add(MockNode::new(&TILE).child_of(grid));
            doc.detach(grid);
        });
        assert_eq!(session.count(&TILE).unwrap(), 0);
    }

    #[test]
    fn test_find_within_scopes_to_parent() {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let a = doc.add(MockNode::new(&GRID));
            let _ = doc.add(MockNode::new(&TILE).child_of(a));
            let _ = doc.add(MockNode::new(&TILE));
        });
        let grid = session.resolve(&GRID).unwrap();
        let inside = session.find_within(&grid, TILE.selector(), "tile").unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(session.count(&TILE).unwrap(), 2);
    }

    #[test]
    fn test_deferred_change_lands_later() {
        let session = MockSession::new();
        session.with_doc(|doc| doc.after(Duration::from_millis(20), |d| d.title = "done".into()));
        assert_eq!(session.title().unwrap(), "");
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(session.title().unwrap(), "done");
    }

    #[test]
    fn test_intercepted_native_click_and_script_click() {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let _ = doc.add(MockNode::new(&BUTTON).intercepted());
        });
        let handle = session.resolve(&BUTTON).unwrap();
        assert!(session.click(&handle).unwrap_err().is_rejected_interaction());
        session
            .execute_script(scripts::CLICK, &[&handle], None)
            .unwrap();
        assert!(session.was_called("script-click:button"));
    }

    #[test]
    fn test_stale_reads_count_down() {
        let session = MockSession::new();
        session.with_doc(|doc| {
            let id = doc.add(MockNode::new(&TILE).text("hello"));
            doc.node_mut(id).stale_reads = 1;
        });
        let handle = session.resolve(&TILE).unwrap();
        assert!(session.text(&handle).unwrap_err().is_stale());
        assert_eq!(session.text(&handle).unwrap(), "hello");
    }

    #[test]
    fn test_async_probe_roundtrip() {
        let session = MockSession::new();
        session.with_doc(|doc| doc.in_flight = Some(2));
        let activity = session.async_activity().unwrap();
        assert_eq!(activity.in_flight, Some(2));
        assert!(!activity.is_quiescent());
    }
}
