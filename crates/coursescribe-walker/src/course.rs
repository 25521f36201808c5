//! Course title lookup and filename cleanup.

use crate::cascade::first_success;
use crate::config::Selectors;
use crate::driver::{Driver, Query};
use crate::operator::Operator;
use crate::Result;
use std::fmt;
use tracing::{info, warn};

const MAX_FILENAME_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
enum TitleSource {
    Script,
    Visible,
    PageTitle,
}

impl fmt::Display for TitleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TitleSource::Script => "scripted query",
            TitleSource::Visible => "visible heading",
            TitleSource::PageTitle => "page title",
        })
    }
}

const TITLE_CASCADE: [TitleSource; 3] =
    [TitleSource::Script, TitleSource::Visible, TitleSource::PageTitle];

/// Find the course title, sanitized for use as a directory name.
///
/// Tries a scripted query, visible headings and the document title, then asks
/// the operator, then falls back to `course_<unix seconds>`.
pub async fn resolve_course_title<D: Driver + ?Sized>(
    driver: &D,
    selectors: &Selectors,
    operator: &dyn Operator,
) -> Result<String> {
    let patterns = selectors.patterns()?;
    let script = format!(
        "(() => {{ const el = document.querySelector({}); return el ? (el.textContent || '').trim() : ''; }})()",
        serde_json::to_string(&selectors.course_title.join(", "))?
    );

    let hit = first_success("course title", &TITLE_CASCADE, |_, source| {
        let script = &script;
        let patterns = &patterns;
        async move {
            let title = match source {
                TitleSource::Script => {
                    let value = driver.evaluate(script).await?;
                    value.as_str().unwrap_or("").trim().to_string()
                }
                TitleSource::Visible => {
                    let mut found = String::new();
                    for selector in &selectors.course_title {
                        let matches = driver.query(&Query::css(selector)).await?;
                        if let Some(m) = matches
                            .iter()
                            .find(|m| m.visible && !m.text.trim().is_empty())
                        {
                            found = m.text.trim().to_string();
                            break;
                        }
                    }
                    found
                }
                TitleSource::PageTitle => {
                    let title = driver.title().await?;
                    patterns.site_suffix.replace(&title, "").trim().to_string()
                }
            };
            Ok(Some(title).filter(|t| !t.is_empty()))
        }
    })
    .await?;

    if let Some(hit) = hit {
        info!("Course title: {} (via {})", hit.value, TITLE_CASCADE[hit.index]);
        return Ok(sanitize_filename(&hit.value));
    }

    warn!("Could not detect the course title");
    if let Some(title) = operator
        .course_title()
        .await
        .filter(|t| !t.trim().is_empty())
    {
        return Ok(sanitize_filename(title.trim()));
    }
    Ok(format!("course_{}", chrono::Utc::now().timestamp()))
}

/// Make a string safe as a file or directory name: drop `\ / * ? : " < > |`,
/// turn runs of whitespace and dashes into `_`, cap at 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_gap = false;
    for c in name.chars() {
        if matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|') {
            continue;
        }
        if c.is_whitespace() || c == '-' {
            if !in_gap {
                out.push('_');
                in_gap = true;
            }
            continue;
        }
        in_gap = false;
        out.push(c);
    }
    out.chars().take(MAX_FILENAME_CHARS).collect()
}
