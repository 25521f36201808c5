//! Lecture identity: which lecture is the player showing right now.
//!
//! Four automated strategies run through [`first_success`], most specific first.
//! When all of them miss the operator is asked, and if that yields nothing a
//! timestamp identity keeps the walk moving.

use crate::cascade::first_success;
use crate::config::selectors::Patterns;
use crate::config::Selectors;
use crate::driver::{Driver, Query};
use crate::operator::Operator;
use crate::Result;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Sequence number and title of one lecture. `full_title` is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LectureIdentity {
    pub number: Option<String>,
    pub title: String,
    pub full_title: String,
}

impl LectureIdentity {
    /// Parse a curriculum title, splitting off a `"<digits>. "` prefix.
    ///
    /// `"12. Replication"` has number `12`; `"Replication"` has none. `None` for
    /// blank input.
    pub fn from_title(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(match split_numbered(text) {
            Some((number, title)) => Self {
                number: Some(number.to_string()),
                title: title.to_string(),
                full_title: text.to_string(),
            },
            None => Self::plain(text),
        })
    }

    /// Combine a separately found number with a title as `"<number>. <title>"`.
    /// A trailing dot on the number is dropped; an empty number gives a plain title.
    pub fn numbered(number: &str, title: &str) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let number = number.trim().trim_end_matches('.').trim();
        if number.is_empty() {
            return Some(Self::plain(title));
        }
        Some(Self {
            number: Some(number.to_string()),
            title: title.to_string(),
            full_title: format!("{}. {}", number, title),
        })
    }

    fn plain(title: &str) -> Self {
        Self {
            number: None,
            title: title.to_string(),
            full_title: title.to_string(),
        }
    }
}

impl fmt::Display for LectureIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_title)
    }
}

/// `"12. Replication"` -> `("12", "Replication")`.
fn split_numbered(text: &str) -> Option<(&str, &str)> {
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let rest = text[digits..].strip_prefix('.')?;
    let title = rest.trim_start();
    if title.len() == rest.len() {
        return None;
    }
    Some((&text[..digits], title))
}

/// Where an identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    ActiveItem,
    PlayerOverlay,
    ScriptedDom,
    UrlMetadata,
    Operator,
    Timestamp,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentitySource::ActiveItem => "active curriculum item",
            IdentitySource::PlayerOverlay => "player overlay",
            IdentitySource::ScriptedDom => "scripted DOM query",
            IdentitySource::UrlMetadata => "URL and page title",
            IdentitySource::Operator => "operator",
            IdentitySource::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Automated identity strategies, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    ActiveItem,
    PlayerOverlay,
    ScriptedDom,
    UrlMetadata,
}

impl IdentityStrategy {
    pub const CASCADE: [IdentityStrategy; 4] = [
        IdentityStrategy::ActiveItem,
        IdentityStrategy::PlayerOverlay,
        IdentityStrategy::ScriptedDom,
        IdentityStrategy::UrlMetadata,
    ];

    pub fn source(self) -> IdentitySource {
        match self {
            IdentityStrategy::ActiveItem => IdentitySource::ActiveItem,
            IdentityStrategy::PlayerOverlay => IdentitySource::PlayerOverlay,
            IdentityStrategy::ScriptedDom => IdentitySource::ScriptedDom,
            IdentityStrategy::UrlMetadata => IdentitySource::UrlMetadata,
        }
    }
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source().fmt(f)
    }
}

/// A resolved identity and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub identity: LectureIdentity,
    pub source: IdentitySource,
}

/// Resolves the current lecture's identity.
pub struct IdentityResolver {
    selectors: Selectors,
    patterns: Patterns,
    script: String,
}

impl IdentityResolver {
    pub fn new(selectors: &Selectors) -> Result<Self> {
        Ok(Self {
            patterns: selectors.patterns()?,
            script: title_script(selectors)?,
            selectors: selectors.clone(),
        })
    }

    /// Run the automated strategies only.
    pub async fn resolve_automatic<D: Driver + ?Sized>(
        &self,
        driver: &D,
        url: &str,
    ) -> Result<Option<Resolution>> {
        let hit = first_success("identity", &IdentityStrategy::CASCADE, |_, strategy| {
            self.attempt(driver, *strategy, url)
        })
        .await?;

        Ok(hit.map(|hit| Resolution {
            identity: hit.value,
            source: IdentityStrategy::CASCADE[hit.index].source(),
        }))
    }

    /// Resolve the current lecture, asking the operator when every automated
    /// strategy misses. Always yields a non-empty `full_title`.
    pub async fn resolve<D: Driver + ?Sized>(
        &self,
        driver: &D,
        operator: &dyn Operator,
        url: &str,
    ) -> Result<Resolution> {
        if let Some(resolution) = self.resolve_automatic(driver, url).await? {
            info!(
                "Lecture '{}' (via {})",
                resolution.identity, resolution.source
            );
            return Ok(resolution);
        }

        warn!("Could not detect the lecture title at {}", url);
        let manual = operator
            .identify_lecture(url)
            .await
            .and_then(|m| LectureIdentity::numbered(&m.number, &m.title));
        let resolution = match manual {
            Some(identity) => Resolution {
                identity,
                source: IdentitySource::Operator,
            },
            None => Resolution {
                identity: timestamp_identity(),
                source: IdentitySource::Timestamp,
            },
        };
        info!(
            "Lecture '{}' (via {})",
            resolution.identity, resolution.source
        );
        Ok(resolution)
    }

    async fn attempt<D: Driver + ?Sized>(
        &self,
        driver: &D,
        strategy: IdentityStrategy,
        url: &str,
    ) -> Result<Option<LectureIdentity>> {
        match strategy {
            IdentityStrategy::ActiveItem => self.from_active_item(driver).await,
            IdentityStrategy::PlayerOverlay => self.from_player_overlay(driver, url).await,
            IdentityStrategy::ScriptedDom => self.from_script(driver, url).await,
            IdentityStrategy::UrlMetadata => self.from_url(driver, url).await,
        }
    }

    async fn from_active_item<D: Driver + ?Sized>(
        &self,
        driver: &D,
    ) -> Result<Option<LectureIdentity>> {
        let title_query = Query::css(&self.selectors.item_title);
        let number_query = Query::css(&self.selectors.item_number);

        for marker in &self.selectors.active_item {
            for item in driver.query(&Query::css(marker)).await? {
                let titles = driver.query(&title_query.within(&item.handle)).await?;
                let Some(title) = titles.iter().map(|t| t.text.trim()).find(|t| !t.is_empty())
                else {
                    continue;
                };
                debug!("Active item title: '{}'", title);

                if split_numbered(title).is_some() {
                    return Ok(LectureIdentity::from_title(title));
                }
                let badges = driver.query(&number_query.within(&item.handle)).await?;
                let number = badges.iter().map(|b| b.text.trim()).find(|b| !b.is_empty());
                return Ok(LectureIdentity::numbered(number.unwrap_or(""), title));
            }
        }
        Ok(None)
    }

    async fn from_player_overlay<D: Driver + ?Sized>(
        &self,
        driver: &D,
        url: &str,
    ) -> Result<Option<LectureIdentity>> {
        for selector in &self.selectors.player_title {
            let matches = driver.query(&Query::css(selector)).await?;
            if let Some(title) = matches
                .iter()
                .filter(|m| m.visible)
                .map(|m| m.text.trim())
                .find(|t| !t.is_empty())
            {
                debug!("Player title: '{}'", title);
                return Ok(self.with_url_number(title, url));
            }
        }
        Ok(None)
    }

    async fn from_script<D: Driver + ?Sized>(
        &self,
        driver: &D,
        url: &str,
    ) -> Result<Option<LectureIdentity>> {
        let value = driver.evaluate(&self.script).await?;
        let title = value.as_str().map(str::trim).unwrap_or("");
        if title.is_empty() {
            return Ok(None);
        }
        debug!("Scripted title: '{}'", title);
        Ok(self.with_url_number(title, url))
    }

    async fn from_url<D: Driver + ?Sized>(
        &self,
        driver: &D,
        url: &str,
    ) -> Result<Option<LectureIdentity>> {
        let Some(id) = self.lecture_id(url) else {
            return Ok(None);
        };
        let page_title = driver.title().await?;
        let cleaned = self.patterns.site_suffix.replace(&page_title, "");
        let cleaned = cleaned.trim();
        let title = if cleaned.is_empty() {
            format!("Lecture_{}", id)
        } else {
            cleaned.to_string()
        };
        Ok(LectureIdentity::numbered(id, &title))
    }

    /// Numbered titles parse as-is; otherwise the URL's lecture id is the number.
    fn with_url_number(&self, title: &str, url: &str) -> Option<LectureIdentity> {
        if split_numbered(title).is_some() {
            return LectureIdentity::from_title(title);
        }
        LectureIdentity::numbered(self.lecture_id(url).unwrap_or(""), title)
    }

    fn lecture_id<'u>(&self, url: &'u str) -> Option<&'u str> {
        self.patterns
            .lecture_id
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

/// Single evaluation covering the active item and the player title, for
/// players whose virtualized lists hide nodes from ordinary queries.
fn title_script(selectors: &Selectors) -> Result<String> {
    let active = serde_json::to_string(&selectors.active_item.join(", "))?;
    let item_title = serde_json::to_string(&selectors.item_title)?;
    let player = serde_json::to_string(&selectors.player_title.join(", "))?;
    Ok(format!(
        r#"(() => {{
    const pick = (sel) => {{ try {{ return document.querySelector(sel); }} catch (e) {{ return null; }} }};
    const active = {active} ? pick({active}) : null;
    if (active) {{
        const t = active.querySelector({item_title});
        const text = t ? (t.textContent || '').trim() : '';
        if (text) return text;
    }}
    const player = {player} ? pick({player}) : null;
    return player ? (player.textContent || '').trim() : '';
}})()"#
    ))
}

/// Last-resort identity built from the wall clock.
fn timestamp_identity() -> LectureIdentity {
    let n = chrono::Utc::now().timestamp_millis() % 1_000_000;
    LectureIdentity {
        number: Some(n.to_string()),
        title: format!("Lecture_{}", n),
        full_title: format!("{}. Lecture_{}", n, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ElementHandle;
    use crate::operator::Unattended;
    use crate::testing::{el, hidden, FakeDriver, FakeLecture, FakeOperator};
    use serde_json::json;

    const URL: &str = "https://learn.test/course/dbs/learn/lecture/4512";

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(&Selectors::default()).unwrap()
    }

    fn within(selector: &str, parent: &str) -> Query {
        Query::css(selector).within(&ElementHandle::new(parent))
    }

    async fn automatic(page: FakeLecture) -> Option<Resolution> {
        let driver = FakeDriver::new(vec![page]);
        let url = driver.current_url().await.unwrap();
        resolver().resolve_automatic(&driver, &url).await.unwrap()
    }

    #[test]
    fn test_numeric_prefix_split() {
        let id = LectureIdentity::from_title("12. Replication").unwrap();
        assert_eq!(id.number.as_deref(), Some("12"));
        assert_eq!(id.title, "Replication");
        assert_eq!(id.full_title, "12. Replication");

        let id = LectureIdentity::from_title("Replication").unwrap();
        assert_eq!(id.number, None);
        assert_eq!(id.title, "Replication");
        assert_eq!(id.full_title, "Replication");
    }

    #[test]
    fn test_prefix_needs_dot_and_space() {
        assert_eq!(LectureIdentity::from_title("12.Replication").unwrap().number, None);
        assert_eq!(LectureIdentity::from_title("2024 Recap").unwrap().number, None);
        assert_eq!(LectureIdentity::from_title("3.  Setup").unwrap().title, "Setup");
        assert!(LectureIdentity::from_title("   ").is_none());
    }

    #[test]
    fn test_numbered_strips_trailing_dot() {
        let id = LectureIdentity::numbered("7.", "Indexes").unwrap();
        assert_eq!(id.full_title, "7. Indexes");
        let id = LectureIdentity::numbered("", "Indexes").unwrap();
        assert_eq!(id.full_title, "Indexes");
        assert!(LectureIdentity::numbered("7", "").is_none());
    }

    #[tokio::test]
    async fn test_active_item_with_numbered_title() {
        let selectors = Selectors::default();
        let page = FakeLecture::new(URL, "Course | Learnsite")
            .with(&Query::css(&selectors.active_item[2]), vec![el("a1", "")])
            .with(
                &within(&selectors.item_title, "a1"),
                vec![el("t1", "12. Replication")],
            );
        let found = automatic(page).await.unwrap();
        assert_eq!(found.source, IdentitySource::ActiveItem);
        assert_eq!(found.identity.full_title, "12. Replication");
    }

    #[tokio::test]
    async fn test_active_item_with_number_badge() {
        let selectors = Selectors::default();
        let page = FakeLecture::new(URL, "")
            .with(&Query::css(&selectors.active_item[0]), vec![el("a1", "")])
            .with(&within(&selectors.item_title, "a1"), vec![el("t1", "Replication")])
            .with(&within(&selectors.item_number, "a1"), vec![el("n1", "12.")]);
        let found = automatic(page).await.unwrap();
        assert_eq!(found.source, IdentitySource::ActiveItem);
        assert_eq!(found.identity.number.as_deref(), Some("12"));
        assert_eq!(found.identity.full_title, "12. Replication");
    }

    #[tokio::test]
    async fn test_active_item_without_number() {
        let selectors = Selectors::default();
        let page = FakeLecture::new(URL, "")
            .with(&Query::css(&selectors.active_item[1]), vec![el("a1", "")])
            .with(&within(&selectors.item_title, "a1"), vec![el("t1", "Welcome")]);
        let found = automatic(page).await.unwrap();
        assert_eq!(found.identity.full_title, "Welcome");
        assert_eq!(found.identity.number, None);
    }

    #[tokio::test]
    async fn test_player_overlay_takes_number_from_url() {
        let selectors = Selectors::default();
        let page = FakeLecture::new(URL, "")
            .with(&Query::css(&selectors.player_title[0]), vec![hidden("p0", "Stale")])
            .with(&Query::css(&selectors.player_title[3]), vec![el("p1", "Sharding")]);
        let found = automatic(page).await.unwrap();
        assert_eq!(found.source, IdentitySource::PlayerOverlay);
        assert_eq!(found.identity.full_title, "4512. Sharding");
    }

    #[tokio::test]
    async fn test_player_overlay_numbered_title() {
        let selectors = Selectors::default();
        let page = FakeLecture::new("https://learn.test/home", "")
            .with(&Query::css(&selectors.player_title[1]), vec![el("p1", "5. Joins")]);
        let found = automatic(page).await.unwrap();
        assert_eq!(found.identity.full_title, "5. Joins");
    }

    #[tokio::test]
    async fn test_scripted_dom_query() {
        let page = FakeLecture::new("https://learn.test/home", "").with_script(json!("7. Indexes"));
        let found = automatic(page).await.unwrap();
        assert_eq!(found.source, IdentitySource::ScriptedDom);
        assert_eq!(found.identity.full_title, "7. Indexes");
    }

    #[tokio::test]
    async fn test_url_and_page_title() {
        let page = FakeLecture::new(URL, "Indexes | Learnsite");
        let found = automatic(page).await.unwrap();
        assert_eq!(found.source, IdentitySource::UrlMetadata);
        assert_eq!(found.identity.full_title, "4512. Indexes");

        let page = FakeLecture::new(URL, "");
        let found = automatic(page).await.unwrap();
        assert_eq!(found.identity.full_title, "4512. Lecture_4512");
    }

    #[tokio::test]
    async fn test_no_strategy_matches() {
        let page = FakeLecture::new("https://learn.test/home", "Learnsite");
        assert!(automatic(page).await.is_none());
    }

    #[tokio::test]
    async fn test_operator_fallback() {
        let driver = FakeDriver::new(vec![FakeLecture::new("https://learn.test/home", "")]);
        let operator = FakeOperator::default().identity("3", "Provisioning");
        let found = resolver()
            .resolve(&driver, &operator, "https://learn.test/home")
            .await
            .unwrap();
        assert_eq!(found.source, IdentitySource::Operator);
        assert_eq!(found.identity.full_title, "3. Provisioning");
        assert_eq!(operator.prompts(), vec!["identify https://learn.test/home"]);
    }

    #[tokio::test]
    async fn test_timestamp_fallback() {
        let driver = FakeDriver::new(vec![FakeLecture::new("https://learn.test/home", "")]);
        let found = resolver()
            .resolve(&driver, &Unattended, "https://learn.test/home")
            .await
            .unwrap();
        assert_eq!(found.source, IdentitySource::Timestamp);
        assert!(found.identity.title.starts_with("Lecture_"));
        assert!(!found.identity.full_title.is_empty());
    }

    #[tokio::test]
    async fn test_operator_not_asked_when_automatic_succeeds() {
        let driver = FakeDriver::new(vec![FakeLecture::new(URL, "Indexes | Learnsite")]);
        let operator = FakeOperator::default().identity("3", "Wrong");
        let found = resolver().resolve(&driver, &operator, URL).await.unwrap();
        assert_eq!(found.identity.full_title, "4512. Indexes");
        assert!(operator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_dead_browser_escalates() {
        let driver = FakeDriver::new(vec![FakeLecture::new(URL, "")]);
        driver.close();
        assert!(resolver().resolve_automatic(&driver, URL).await.is_err());
    }
}
