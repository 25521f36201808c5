//! Strategy lists for every lookup cascade.
//!
//! The course player renames its hashed CSS classes often, so each lookup is an
//! ordered list: the most specific selector first, structural and textual
//! heuristics after it. A config file can replace any list.

use crate::driver::Query;
use crate::locator::LocatorStrategy;
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Markers of the curriculum entry that is currently playing.
    pub active_item: Vec<String>,
    /// Title element inside an active curriculum entry.
    pub item_title: String,
    /// Separately rendered number badge inside an active curriculum entry.
    pub item_number: String,
    /// Title shown in the video player overlay.
    pub player_title: Vec<String>,
    /// Course title on the player page.
    pub course_title: Vec<String>,
    /// Regex with one capture group pulling the lecture id out of the URL.
    pub lecture_id_pattern: String,
    /// Regex matching the trailing site name in the document title.
    pub site_suffix_pattern: String,
    /// Controls that open the transcript panel.
    pub transcript_toggle: Vec<LocatorStrategy>,
    /// Elements that only exist while the transcript panel is open.
    pub transcript_panel: Vec<String>,
    /// Transcript extraction strategies, most specific first.
    pub transcript: Vec<LocatorStrategy>,
    /// Containers whose rendered text is split into lines when every strategy misses.
    pub transcript_fallback: Vec<Query>,
    /// Controls that advance to the next lecture.
    pub next_control: Vec<LocatorStrategy>,
}

/// Compiled regexes from [`Selectors`].
#[derive(Debug, Clone)]
pub struct Patterns {
    pub lecture_id: Regex,
    pub site_suffix: Regex,
}

impl Selectors {
    /// Compile the regex fields.
    pub fn patterns(&self) -> Result<Patterns> {
        let compile = |field: &str, pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                Error::Config(format!("selectors.{} is not a valid regex: {}", field, e))
            })
        };
        let lecture_id = compile("lecture_id_pattern", &self.lecture_id_pattern)?;
        if lecture_id.captures_len() < 2 {
            return Err(Error::Config(
                "selectors.lecture_id_pattern needs a capture group".into(),
            ));
        }
        Ok(Patterns {
            lecture_id,
            site_suffix: compile("site_suffix_pattern", &self.site_suffix_pattern)?,
        })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            active_item: strings(&[
                ".curriculum-item-link--active--NshF4",
                "[aria-current='true']",
                ".curriculum-item-link--is-current--2mKk4",
                ".item-link--active",
            ]),
            item_title: "[data-purpose='item-title']".into(),
            item_number: ".curriculum-item-link--item-number--3PmJf".into(),
            player_title: strings(&[
                ".video-viewer--title-overlay--OoQ6p",
                ".video-viewer--title--Jk6xW",
                "[data-purpose='video-title']",
                ".ud-heading-xl.clp-lead__title",
                ".course-overview--title--2-V0B",
            ]),
            course_title: strings(&[
                "a[data-purpose='course-title-link']",
                ".course-title--course-title--3r1sL",
                ".ud-heading-xl",
                "[data-purpose='course-header-title']",
                "h1",
            ]),
            lecture_id_pattern: r"/lecture/(\d+)".into(),
            site_suffix_pattern: r"\s*\|.*$".into(),
            transcript_toggle: vec![
                LocatorStrategy::css("svg[aria-label='Transcript in sidebar region']"),
                LocatorStrategy::css("svg[aria-label*='Transcript']"),
                LocatorStrategy::css("[aria-label*='Transcript']"),
                LocatorStrategy::css("button[data-purpose='transcript-toggle']"),
                LocatorStrategy::css("button.transcript--transcript-button--3TvKV"),
                LocatorStrategy::css("button[aria-label='Transcript']"),
                LocatorStrategy::css(".captions-display--captions-cta-container--FbsFM button"),
                LocatorStrategy::css("[data-purpose='captions-toggle-button']"),
                LocatorStrategy::xpath(
                    "//*[contains(text(), 'transcript') or contains(translate(@*, 'TRANSCRIPT', 'transcript'), 'transcript')]",
                ),
            ],
            transcript_panel: strings(&[
                ".transcript--transcript-panel--1EX49",
                ".transcript--cue-container--Vuwj6",
                ".captions-display--captions-container--PqdGQ",
                "[data-purpose='transcript-cue']",
            ]),
            transcript: vec![
                LocatorStrategy::css(
                    "div.transcript--cue-container--Vuwj6 p[data-purpose='transcript-cue'] span[data-purpose='cue-text']",
                ),
                LocatorStrategy::css("div.captions-display--captions-container--PqdGQ div"),
                LocatorStrategy::css("[data-purpose='transcript-cue'] span"),
                LocatorStrategy::css(".transcript--transcript-panel--1EX49 p"),
                LocatorStrategy::css("div.captions-display--captions-container--PqdGQ").markup(),
                LocatorStrategy::css("[class*='transcript']").markup(),
            ],
            transcript_fallback: vec![Query::xpath(
                "//*[contains(@class, 'transcript') or contains(@class, 'captions')]",
            )],
            next_control: vec![
                LocatorStrategy::css("div[data-purpose='go-to-next']"),
                LocatorStrategy::css("#go-to-next-item"),
                LocatorStrategy::css(".next-and-previous--next--8Avih"),
                LocatorStrategy::css(
                    "button.ud-btn.ud-btn-medium.ud-btn-primary[aria-label*='next']",
                ),
                LocatorStrategy::xpath(
                    "//div[contains(@class, 'next') and @data-purpose='go-to-next']",
                ),
                LocatorStrategy::xpath("//svg[@aria-label='Go to Next lecture']"),
                LocatorStrategy::xpath("//button[contains(text(), 'Next')]"),
                LocatorStrategy::xpath("//div[contains(text(), 'Next')]"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile() {
        let patterns = Selectors::default().patterns().unwrap();
        let caps = patterns
            .lecture_id
            .captures("https://x.example.com/course/a/learn/lecture/4512#overview")
            .unwrap();
        assert_eq!(&caps[1], "4512");
        assert_eq!(
            patterns.site_suffix.replace("Replication | Learnsite", ""),
            "Replication"
        );
    }

    #[test]
    fn test_pattern_without_group_rejected() {
        let selectors = Selectors {
            lecture_id_pattern: r"/lecture/\d+".into(),
            ..Selectors::default()
        };
        let err = selectors.patterns().unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }
}
