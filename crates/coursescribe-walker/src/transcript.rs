//! Transcript extraction.

use crate::cascade::first_success;
use crate::config::Selectors;
use crate::driver::{Driver, Query};
use crate::locator::{ExtractionMode, LocatorStrategy};
use crate::Result;
use scraper::Html;
use tracing::{debug, info, warn};

/// Pulls caption text off the page as a sequence of lines.
pub struct TranscriptExtractor {
    strategies: Vec<LocatorStrategy>,
    fallback: Vec<Query>,
}

impl TranscriptExtractor {
    pub fn new(selectors: &Selectors) -> Self {
        Self {
            strategies: selectors.transcript.clone(),
            fallback: selectors.transcript_fallback.clone(),
        }
    }

    /// Lines of the current lecture's transcript, or an empty vec if nothing on
    /// the page looks like one.
    pub async fn extract<D: Driver + ?Sized>(&self, driver: &D) -> Result<Vec<String>> {
        let hit = first_success("transcript", &self.strategies, |_, strategy| {
            extract_with(driver, strategy)
        })
        .await?;

        if let Some(hit) = hit {
            info!(
                "Extracted {} transcript segments (strategy {})",
                hit.value.len(),
                hit.index + 1
            );
            return Ok(hit.value);
        }

        debug!("Trying last-resort transcript containers");
        for query in &self.fallback {
            for container in driver.query(query).await? {
                if !container.visible {
                    continue;
                }
                let lines = split_lines(&container.text);
                if !lines.is_empty() {
                    info!("Last-resort extraction found {} lines", lines.len());
                    return Ok(lines);
                }
            }
        }

        warn!("No transcript found on this page");
        Ok(Vec::new())
    }
}

async fn extract_with<D: Driver + ?Sized>(
    driver: &D,
    strategy: &LocatorStrategy,
) -> Result<Option<Vec<String>>> {
    let matches = driver.query(&strategy.query).await?;
    let lines = match strategy.mode {
        ExtractionMode::VisibleText => matches
            .iter()
            .filter(|m| m.visible)
            .map(|m| m.text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        ExtractionMode::InnerMarkup => match matches.first() {
            Some(first) => markup_fragments(&first.markup),
            None => Vec::new(),
        },
    };
    Ok(if lines.is_empty() { None } else { Some(lines) })
}

/// Non-empty, trimmed text nodes of an HTML fragment, in document order.
pub fn markup_fragments(markup: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(markup);
    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed, non-empty lines of rendered text.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
