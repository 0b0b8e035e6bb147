//! Chromium session over the DevTools protocol.
//!
//! [`CdpSession`] owns a tokio runtime and blocks on each protocol call, so
//! it satisfies the synchronous [`Session`] trait. Resolved elements live in
//! a page-side registry (`window.__shopsync`); a navigation drops the
//! registry, and any handle issued before it then reads as stale.
//!
//! A node keeps its id for as long as it stays attached, so resolving the
//! same element twice yields equal handles. Every resolution first drops
//! the entries of detached nodes; the registry only holds live nodes.

use crate::config::BrowserSettings;
use crate::driver::{ElementHandle, Session};
use crate::locator::Selector;
use crate::result::{SyncError, SyncResult};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const REGISTRY: &str =
    "(window.__shopsync || (window.__shopsync = {next: 0, nodes: new Map(), ids: new WeakMap()}))";

/// Reply of every element-scoped script
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    stale: bool,
    value: Option<T>,
}

impl<T> Envelope<T> {
    /// `null` reads as `None`; a stale reply is `StaleReference`
    fn into_value(self, handle: &ElementHandle) -> SyncResult<Option<T>> {
        if self.stale {
            Err(SyncError::stale(handle.to_string()))
        } else {
            Ok(self.value)
        }
    }
}

/// Script registering every node `query` yields; replies with their ids.
///
/// `guard` runs first and may reply stale.
fn register_script(query: &str, guard: &str) -> String {
    format!(
        "(function(){{const reg = {REGISTRY}; {guard} \
         for (const [id, n] of reg.nodes) {{ if (!n.isConnected) {{ reg.nodes.delete(id); }} }} \
         return {{stale: false, value: {query}.map(function(n){{ \
           let id = reg.ids.get(n); \
           if (id === undefined || reg.nodes.get(id) !== n) {{ \
             id = String(++reg.next); reg.ids.set(n, id); reg.nodes.set(id, n); }} \
           return id; }})}};}})()"
    )
}

/// Where a native pointer event would land
#[derive(Debug, Deserialize)]
struct Target {
    x: f64,
    y: f64,
    visible: bool,
    enabled: bool,
    blocker: Option<String>,
}

const TARGET_BODY: &str = "e.scrollIntoView({block: 'center'}); \
    const r = e.getBoundingClientRect(); const s = getComputedStyle(e); \
    const x = r.left + r.width / 2; const y = r.top + r.height / 2; \
    const top = document.elementFromPoint(x, y); \
    const clear = !top || top === e || e.contains(top); \
    return {x: x, y: y, \
      visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none', \
      enabled: !e.disabled, \
      blocker: clear ? null : top.tagName.toLowerCase() + \
        (typeof top.className === 'string' && top.className ? '.' + top.className.trim().split(/\\s+/).join('.') : '')};";

const DISPLAYED_BODY: &str = "const r = e.getBoundingClientRect(); const s = getComputedStyle(e); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';";

fn cdp_error(e: impl std::fmt::Display) -> SyncError {
    SyncError::session(e.to_string())
}

fn js_string(s: &str) -> SyncResult<String> {
    Ok(serde_json::to_string(s)?)
}

/// Headless or headed Chromium driven through chromiumoxide
pub struct CdpSession {
    runtime: Runtime,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for CdpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpSession").finish_non_exhaustive()
    }
}

impl CdpSession {
    /// Launch a browser and open a blank page
    pub fn launch(settings: &BrowserSettings) -> SyncResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let mut builder = BrowserConfig::builder().window_size(settings.window_width, settings.window_height);
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(SyncError::session)?;

        let (browser, mut handler) = runtime
            .block_on(Browser::launch(config))
            .map_err(cdp_error)?;
        let handler = runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        let page = runtime
            .block_on(browser.new_page("about:blank"))
            .map_err(cdp_error)?;
        info!(headless = settings.headless, "browser launched");
        Ok(Self {
            runtime,
            browser,
            page,
            handler,
        })
    }

    fn eval<T: DeserializeOwned>(&self, expression: String) -> SyncResult<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(true)
            .build()
            .map_err(SyncError::session)?;
        self.runtime.block_on(async {
            let result = self
                .page
                .evaluate_expression(params)
                .await
                .map_err(cdp_error)?;
            result.into_value().map_err(cdp_error)
        })
    }

    /// Run `body` with the registered element bound to `e`; `null` is `None`
    fn on_element_nullable<T: DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> SyncResult<Option<T>> {
        let id = js_string(&handle.id)?;
        let reply: Envelope<T> = self.eval(format!(
            "(function(){{const e = {REGISTRY}.nodes.get({id}); \
             if (!e || !e.isConnected) {{ return {{stale: true, value: null}}; }} \
             return {{stale: false, value: (function(e){{ {body} }})(e)}};}})()"
        ))?;
        reply.into_value(handle)
    }

    /// Like [`Self::on_element_nullable`], but `body` must produce a value
    fn on_element<T: DeserializeOwned>(&self, handle: &ElementHandle, body: &str) -> SyncResult<T> {
        self.on_element_nullable(handle, body)?
            .ok_or_else(|| SyncError::session(format!("no value from {handle}")))
    }

    fn register(&self, query: &str, guard: &str, origin: &str) -> SyncResult<Vec<ElementHandle>> {
        let reply: Envelope<Vec<String>> = self.eval(register_script(query, guard))?;
        if reply.stale {
            return Err(SyncError::stale(origin));
        }
        Ok(reply
            .value
            .unwrap_or_default()
            .into_iter()
            .map(|id| ElementHandle::new(id, origin))
            .collect())
    }

    fn target(&self, element: &ElementHandle) -> SyncResult<Target> {
        self.on_element(element, TARGET_BODY)
    }

    fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> SyncResult<()> {
        let pressing = !matches!(kind, DispatchMouseEventType::MouseMoved);
        let mut builder = DispatchMouseEventParams::builder().r#type(kind).x(x).y(y);
        if pressing {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(SyncError::session)?;
        let _ = self
            .runtime
            .block_on(self.page.execute(params))
            .map_err(cdp_error)?;
        Ok(())
    }

    fn interactable(&self, element: &ElementHandle) -> SyncResult<Target> {
        let target = self.target(element)?;
        if !target.visible || !target.enabled {
            return Err(SyncError::NotInteractable {
                locator: element.to_string(),
                message: format!("visible={} enabled={}", target.visible, target.enabled),
            });
        }
        Ok(target)
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.block_on(self.browser.close()) {
            warn!(error = %e, "browser did not close cleanly");
        }
        self.handler.abort();
    }
}

impl Session for CdpSession {
    fn navigate(&self, url: &str) -> SyncResult<()> {
        debug!(url, "navigate");
        let _ = self
            .runtime
            .block_on(self.page.goto(url))
            .map_err(|e| SyncError::session(format!("navigation to {url} failed: {e}")))?;
        Ok(())
    }

    fn go_back(&self) -> SyncResult<()> {
        let _: bool = self.eval("(function(){ history.back(); return true; })()".to_string())?;
        Ok(())
    }

    fn title(&self) -> SyncResult<String> {
        let title = self
            .runtime
            .block_on(self.page.get_title())
            .map_err(cdp_error)?;
        Ok(title.unwrap_or_default())
    }

    fn current_url(&self) -> SyncResult<String> {
        let url = self.runtime.block_on(self.page.url()).map_err(cdp_error)?;
        Ok(url.unwrap_or_default())
    }

    fn find_all(&self, selector: &Selector, origin: &str) -> SyncResult<Vec<ElementHandle>> {
        self.register(&selector.to_query_all("document"), "", origin)
    }

    fn find_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
        origin: &str,
    ) -> SyncResult<Vec<ElementHandle>> {
        let id = js_string(&parent.id)?;
        let guard = format!(
            "const root = reg.nodes.get({id}); \
             if (!root || !root.isConnected) {{ return {{stale: true, value: null}}; }}"
        );
        self.register(&selector.to_query_all("root"), &guard, origin)
            .map_err(|e| if e.is_stale() { SyncError::stale(parent.to_string()) } else { e })
    }

    fn click(&self, element: &ElementHandle) -> SyncResult<()> {
        let target = self.interactable(element)?;
        if let Some(blocker) = target.blocker {
            return Err(SyncError::Intercepted {
                locator: element.to_string(),
                message: format!("other element would receive the click: {blocker}"),
            });
        }
        self.mouse(DispatchMouseEventType::MousePressed, target.x, target.y)?;
        self.mouse(DispatchMouseEventType::MouseReleased, target.x, target.y)
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> SyncResult<()> {
        let _ = self.interactable(element)?;
        let _: bool = self.on_element(element, "e.focus(); return document.activeElement === e;")?;
        let _ = self
            .runtime
            .block_on(self.page.execute(InsertTextParams::new(text)))
            .map_err(cdp_error)?;
        Ok(())
    }

    fn hover(&self, element: &ElementHandle) -> SyncResult<()> {
        let target = self.target(element)?;
        self.mouse(DispatchMouseEventType::MouseMoved, target.x, target.y)
    }

    fn is_displayed(&self, element: &ElementHandle) -> SyncResult<bool> {
        self.on_element(element, DISPLAYED_BODY)
    }

    fn is_enabled(&self, element: &ElementHandle) -> SyncResult<bool> {
        self.on_element(element, "return !e.disabled;")
    }

    fn text(&self, element: &ElementHandle) -> SyncResult<String> {
        self.on_element(element, "return e.innerText || '';")
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> SyncResult<Option<String>> {
        let name = js_string(name)?;
        self.on_element_nullable(element, &format!("return e.getAttribute({name});"))
    }

    fn execute_script(
        &self,
        script: &str,
        elements: &[&ElementHandle],
        extra: Option<&str>,
    ) -> SyncResult<serde_json::Value> {
        let ids: Vec<&str> = elements.iter().map(|h| h.id.as_str()).collect();
        let ids = serde_json::to_string(&ids)?;
        let extra = serde_json::to_string(&extra)?;
        let reply: Envelope<serde_json::Value> = self.eval(format!(
            "(function(){{const reg = {REGISTRY}; const args = []; \
             for (const id of {ids}) {{ const e = reg.nodes.get(id); \
               if (!e || !e.isConnected) {{ return {{stale: true, value: null}}; }} args.push(e); }} \
             if ({extra} !== null) {{ args.push({extra}); }} \
             const out = (function(){{ {script} }}).apply(null, args); \
             return {{stale: false, value: out === undefined ? null : out}};}})()"
        ))?;
        if reply.stale {
            let names: Vec<String> = elements.iter().map(|h| h.to_string()).collect();
            return Err(SyncError::stale(names.join(", ")));
        }
        Ok(reply.value.unwrap_or(serde_json::Value::Null))
    }
}
