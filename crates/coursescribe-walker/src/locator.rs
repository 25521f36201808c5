//! Element locator: first visible match across an ordered strategy list.

use crate::cascade::first_success;
use crate::driver::{Driver, ElementHandle, ElementMatch, Query};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// How a matched element is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Rendered text of every visible match.
    #[default]
    VisibleText,
    /// Markup of the first match, reduced to its text fragments.
    InnerMarkup,
}

/// One rule in a lookup cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    pub query: Query,
    #[serde(default)]
    pub mode: ExtractionMode,
}

impl LocatorStrategy {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            query: Query::css(selector),
            mode: ExtractionMode::VisibleText,
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self {
            query: Query::xpath(expr),
            mode: ExtractionMode::VisibleText,
        }
    }

    /// Switch to [`ExtractionMode::InnerMarkup`].
    pub fn markup(mut self) -> Self {
        self.mode = ExtractionMode::InnerMarkup;
        self
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ExtractionMode::VisibleText => write!(f, "{}", self.query),
            ExtractionMode::InnerMarkup => write!(f, "{} (markup)", self.query),
        }
    }
}

/// A located element and the strategy that found it.
#[derive(Debug, Clone)]
pub struct Located {
    pub strategy: usize,
    pub element: ElementMatch,
}

/// Return the first visible element matched by the earliest strategy that
/// matches anything visible. `None` once every strategy is exhausted.
pub async fn locate<D: Driver + ?Sized>(
    driver: &D,
    strategies: &[LocatorStrategy],
) -> Result<Option<Located>> {
    let hit = first_success("locate", strategies, |_, strategy| async move {
        let matches = driver.query(&strategy.query).await?;
        Ok(matches.into_iter().find(|m| m.visible))
    })
    .await?;

    Ok(hit.map(|hit| Located {
        strategy: hit.index,
        element: hit.value,
    }))
}

/// Scroll an element into view, let layout settle, then click it through the DOM.
pub async fn click<D: Driver + ?Sized>(
    driver: &D,
    element: &ElementHandle,
    settle: Duration,
) -> Result<bool> {
    driver.scroll_into_view(element).await?;
    tokio::time::sleep(settle).await;
    let clicked = driver.click(element).await?;
    debug!("click on element {}: {}", element.id(), clicked);
    Ok(clicked)
}

/// Visible matches of one strategy that [`activate`] will try to click.
pub const MAX_CLICK_CANDIDATES: usize = 5;

/// Locate and click, strategy by strategy, until a click lands.
///
/// A click that fails in the page (an element without `click()`, a node that
/// went away) only costs that candidate: the next visible match, then the next
/// strategy, is tried. Failing queries escalate the same way they do in [`locate`].
pub async fn activate<D: Driver + ?Sized>(
    driver: &D,
    strategies: &[LocatorStrategy],
    settle: Duration,
) -> Result<Option<Located>> {
    let hit = first_success("activate", strategies, |_, strategy| async move {
        let matches = driver.query(&strategy.query).await?;
        let candidates = matches
            .into_iter()
            .filter(|m| m.visible)
            .take(MAX_CLICK_CANDIDATES);
        for element in candidates {
            match click(driver, &element.handle, settle).await {
                Ok(true) => return Ok(Some(element)),
                Ok(false) => debug!("{}: element {} is gone", strategy, element.handle.id()),
                Err(e) => warn!("Click via {} failed: {}", strategy, e),
            }
        }
        Ok(None)
    })
    .await?;

    Ok(hit.map(|hit| Located {
        strategy: hit.index,
        element: hit.value,
    }))
}
