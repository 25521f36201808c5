//! In-memory course player for unit tests.

use crate::config::Selectors;
use crate::driver::{Driver, ElementHandle, ElementMatch, Query};
use crate::operator::{ManualIdentity, Operator};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Handle id the fake treats as the "next lecture" control.
pub const NEXT: &str = "next";

pub fn el(id: &str, text: &str) -> ElementMatch {
    ElementMatch {
        handle: ElementHandle::new(id),
        visible: true,
        text: text.to_string(),
        markup: String::new(),
    }
}

pub fn hidden(id: &str, text: &str) -> ElementMatch {
    ElementMatch {
        visible: false,
        ..el(id, text)
    }
}

pub fn markup(id: &str, html: &str) -> ElementMatch {
    ElementMatch {
        markup: html.to_string(),
        ..el(id, "")
    }
}

/// One page state of the fake player.
#[derive(Debug, Clone)]
pub struct FakeLecture {
    url: String,
    title: String,
    elements: HashMap<Query, Vec<ElementMatch>>,
    script: serde_json::Value,
}

impl FakeLecture {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            elements: HashMap::new(),
            script: serde_json::Value::String(String::new()),
        }
    }

    pub fn with(mut self, query: &Query, matches: Vec<ElementMatch>) -> Self {
        self.elements.entry(query.clone()).or_default().extend(matches);
        self
    }

    /// Put the default "next" control on this page.
    pub fn with_next(self) -> Self {
        let query = Selectors::default().next_control[0].query.clone();
        self.with(&query, vec![el(NEXT, "Next")])
    }

    /// Put a transcript on this page under the first default extraction strategy.
    pub fn with_transcript(self, lines: &[&str]) -> Self {
        let query = Selectors::default().transcript[0].query.clone();
        let cues = lines
            .iter()
            .enumerate()
            .map(|(i, line)| el(&format!("cue{}", i), line))
            .collect();
        self.with(&query, cues)
    }

    pub fn with_script(mut self, value: serde_json::Value) -> Self {
        self.script = value;
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    lectures: Vec<FakeLecture>,
    current: usize,
    closed: bool,
    stuck: bool,
    close_at: Option<usize>,
    broken: HashSet<String>,
    log: Vec<String>,
}

/// Scripted [`Driver`]. Clicking the [`NEXT`] handle moves to the following page.
#[derive(Debug, Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new(lectures: Vec<FakeLecture>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                lectures,
                ..Default::default()
            }),
        }
    }

    /// Clicks on "next" register but the page never changes.
    pub fn stuck(self) -> Self {
        self.state.lock().unwrap().stuck = true;
        self
    }

    /// The browser dies as soon as page `index` is reached by clicking next.
    pub fn closes_at(self, index: usize) -> Self {
        self.state.lock().unwrap().close_at = Some(index);
        self
    }

    /// Clicking this handle throws in the page, like `el.click()` on an `<svg>`.
    pub fn breaks_click(self, id: &str) -> Self {
        self.state.lock().unwrap().broken.insert(id.to_string());
        self
    }

    /// Every later call fails, like a closed browser.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }

    pub fn current(&self) -> usize {
        self.state.lock().unwrap().current
    }

    fn with_page<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(Error::Driver("browser closed".into()));
        }
        Ok(f(&mut state))
    }
}

impl FakeState {
    fn page(&self) -> &FakeLecture {
        &self.lectures[self.current]
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.with_page(|s| {
            s.log.push(format!("navigate {}", url));
            if let Some(i) = s.lectures.iter().position(|l| l.url == url) {
                s.current = i;
            }
        })
    }

    async fn query(&self, query: &Query) -> Result<Vec<ElementMatch>> {
        self.with_page(|s| {
            s.log.push(format!("query {}", query));
            s.page().elements.get(query).cloned().unwrap_or_default()
        })
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        self.with_page(|s| {
            s.log.push("evaluate".into());
            s.page().script.clone()
        })
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.with_page(|s| s.log.push(format!("scroll {}", element.id())))
    }

    async fn click(&self, element: &ElementHandle) -> Result<bool> {
        self.with_page(|s| {
            s.log.push(format!("click {}", element.id()));
            if s.broken.contains(element.id()) {
                return Err(Error::Driver("TypeError: el.click is not a function".into()));
            }
            if element.id() == NEXT && !s.stuck && s.current + 1 < s.lectures.len() {
                s.current += 1;
                if s.close_at == Some(s.current) {
                    s.closed = true;
                }
            }
            Ok(true)
        })?
    }

    async fn current_url(&self) -> Result<String> {
        self.with_page(|s| s.page().url.clone())
    }

    async fn title(&self) -> Result<String> {
        self.with_page(|s| s.page().title.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.with_page(|s| {
            s.log.push("screenshot".into());
            b"\x89PNG".to_vec()
        })
    }
}

/// Operator with canned answers. Records every prompt it receives.
#[derive(Debug, Default)]
pub struct FakeOperator {
    identity: Option<ManualIdentity>,
    panel: bool,
    navigations: Mutex<usize>,
    course_title: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeOperator {
    pub fn identity(mut self, number: &str, title: &str) -> Self {
        self.identity = Some(ManualIdentity {
            number: number.to_string(),
            title: title.to_string(),
        });
        self
    }

    pub fn opens_panel(mut self) -> Self {
        self.panel = true;
        self
    }

    /// Confirm this many manual navigations, then decline.
    pub fn navigations(self, n: usize) -> Self {
        *self.navigations.lock().unwrap() = n;
        self
    }

    pub fn with_course_title(mut self, title: &str) -> Self {
        self.course_title = Some(title.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn record(&self, prompt: String) {
        self.prompts.lock().unwrap().push(prompt);
    }
}

#[async_trait]
impl Operator for FakeOperator {
    async fn await_login(&self, url: &str) {
        self.record(format!("login {}", url));
    }

    async fn enable_transcript_panel(&self) -> bool {
        self.record("panel".into());
        self.panel
    }

    async fn identify_lecture(&self, url: &str) -> Option<ManualIdentity> {
        self.record(format!("identify {}", url));
        self.identity.clone()
    }

    async fn navigate_manually(&self) -> bool {
        self.record("navigate".into());
        let mut left = self.navigations.lock().unwrap();
        if *left == 0 {
            return false;
        }
        *left -= 1;
        true
    }

    async fn course_title(&self) -> Option<String> {
        self.record("course title".into());
        self.course_title.clone()
    }
}
