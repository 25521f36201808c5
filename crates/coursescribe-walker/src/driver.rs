//! Browser capability interface.
//!
//! The walker only ever talks to a [`Driver`]. [`EokaDriver`] is the real
//! implementation; tests run against an in-memory page.

use crate::config::BrowserConfig;
use crate::Result;
use async_trait::async_trait;
use eoka::{Browser, Page};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Attribute stamped on matched elements so later calls can find them again.
pub const HANDLE_ATTR: &str = "data-coursescribe-handle";

/// An element lookup, either CSS or XPath.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Css(String),
    Xpath(String),
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Query::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Query::Xpath(expr.into())
    }

    /// Scope this query to descendants of an already matched element.
    pub fn within(&self, parent: &ElementHandle) -> Query {
        match self {
            Query::Css(css) => Query::Css(format!("{} {}", parent.css(), css)),
            Query::Xpath(xpath) => {
                let relative = xpath.trim_start_matches('.');
                let relative = if relative.starts_with('/') {
                    relative.to_string()
                } else {
                    format!("//{}", relative)
                };
                Query::Xpath(format!("{}{}", parent.xpath(), relative))
            }
        }
    }

    fn as_js_args(&self) -> (&'static str, &str) {
        match self {
            Query::Css(v) => ("css", v),
            Query::Xpath(v) => ("xpath", v),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Css(v) => write!(f, "css '{}'", v),
            Query::Xpath(v) => write!(f, "xpath '{}'", v),
        }
    }
}

/// Stable reference to an element matched by a previous [`Driver::query`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// CSS selector for this element.
    pub fn css(&self) -> String {
        format!("[{}=\"{}\"]", HANDLE_ATTR, self.0)
    }

    fn xpath(&self) -> String {
        format!("//*[@{}='{}']", HANDLE_ATTR, self.0)
    }
}

/// One element matched by a query.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementMatch {
    pub handle: ElementHandle,
    /// Rendered and not hidden by layout or style.
    pub visible: bool,
    /// Rendered text, trimmed.
    #[serde(default)]
    pub text: String,
    /// Inner markup.
    #[serde(default)]
    pub markup: String,
}

/// What the walker needs from a browser.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to a URL.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// All elements matching `query`, in document order, with visibility.
    async fn query(&self, query: &Query) -> Result<Vec<ElementMatch>>;

    /// Evaluate a script expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Scroll an element to the middle of the viewport.
    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()>;

    /// Click an element through the DOM (`el.click()`, or a dispatched click
    /// event for elements such as `<svg>` that lack it), bypassing overlays
    /// that would swallow a synthesized pointer event. `Ok(false)` if it is gone.
    async fn click(&self, element: &ElementHandle) -> Result<bool>;

    /// Current URL.
    async fn current_url(&self) -> Result<String>;

    /// Document title.
    async fn title(&self) -> Result<String>;

    /// PNG screenshot of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// Enumerate matches for a CSS selector or XPath expression, stamping each with
/// a handle attribute. Returns `{ok: [...]}` or `{error: "..."}` as JSON text.
const QUERY_JS: &str = r#"
((kind, expr, attr) => {
    window.__coursescribeSeq = window.__coursescribeSeq || 0;
    let nodes = [];
    try {
        if (kind === 'xpath') {
            const snap = document.evaluate(expr, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            for (let i = 0; i < snap.snapshotLength; i++) {
                const n = snap.snapshotItem(i);
                if (n && n.nodeType === 1) nodes.push(n);
            }
        } else {
            nodes = Array.from(document.querySelectorAll(expr));
        }
    } catch (e) {
        return JSON.stringify({ error: e.message || String(e) });
    }

    function visible(el) {
        const rect = el.getBoundingClientRect();
        if (rect.width === 0 && rect.height === 0) return false;
        const style = getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        return parseFloat(style.opacity || '1') > 0;
    }

    const ok = nodes.map(el => {
        if (!el.hasAttribute(attr)) {
            window.__coursescribeSeq += 1;
            el.setAttribute(attr, String(window.__coursescribeSeq));
        }
        const text = el.innerText !== undefined ? el.innerText : (el.textContent || '');
        return {
            handle: el.getAttribute(attr),
            visible: visible(el),
            text: (text || '').trim(),
            markup: el.innerHTML || ''
        };
    });
    return JSON.stringify({ ok });
})
"#;

#[derive(Debug, Deserialize)]
struct QueryResult {
    ok: Option<Vec<ElementMatch>>,
    error: Option<String>,
}

/// [`Driver`] backed by an eoka stealth Chrome page.
pub struct EokaDriver {
    page: Page,
}

impl EokaDriver {
    /// Wrap an existing page.
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Launch a browser and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<(Browser, Self)> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1920),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(1080),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok((browser, Self { page }))
    }

    /// Get a reference to the page.
    pub fn page(&self) -> &Page {
        &self.page
    }
}

fn js_string(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

#[async_trait]
impl Driver for EokaDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<ElementMatch>> {
        let (kind, expr) = query.as_js_args();
        let js = format!(
            "{}({}, {}, {})",
            QUERY_JS,
            js_string(kind)?,
            js_string(expr)?,
            js_string(HANDLE_ATTR)?
        );
        let json: String = self.page.evaluate(&js).await?;
        let result: QueryResult = serde_json::from_str(&json)?;
        if let Some(error) = result.error {
            warn!("Query {} rejected by the page: {}", query, error);
            return Ok(Vec::new());
        }
        Ok(result.ok.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        Ok(self.page.evaluate(script).await?)
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        let js = format!(
            "document.querySelector({})?.scrollIntoView({{block:'center'}})",
            js_string(&element.css())?
        );
        self.page.execute(&js).await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<bool> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                if (typeof el.click === 'function') {{
                    el.click();
                }} else {{
                    el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true, view: window }}));
                }}
                return true;
            }})()"#,
            js_string(&element.css())?
        );
        Ok(self.page.evaluate(&js).await?)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page.title().await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }
}
