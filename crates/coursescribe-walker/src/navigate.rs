//! Advancing the player to the next lecture.

use crate::config::{Diagnostics, Selectors, Timing};
use crate::diagnostics;
use crate::driver::Driver;
use crate::locator::{activate, LocatorStrategy};
use crate::operator::Operator;
use crate::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one [`NavigationController::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The URL changed.
    Confirmed { url: String },
    /// A click or manual signal was issued but the URL stayed put. Single-page
    /// players do this; identity dedup catches the cases where nothing moved.
    Assumed,
    /// No control found and no manual signal: end of course.
    Exhausted,
}

impl Advance {
    pub fn advanced(&self) -> bool {
        !matches!(self, Advance::Exhausted)
    }
}

pub struct NavigationController {
    strategies: Vec<LocatorStrategy>,
    settle: Duration,
    window_secs: u64,
    post_navigation: Duration,
    debug_screenshot: Option<String>,
}

impl NavigationController {
    pub fn new(selectors: &Selectors, timing: &Timing, diagnostics: &Diagnostics) -> Self {
        Self {
            strategies: selectors.next_control.clone(),
            settle: Duration::from_millis(timing.settle_ms),
            window_secs: timing.navigation_window_secs,
            post_navigation: Duration::from_millis(timing.post_navigation_ms),
            debug_screenshot: diagnostics
                .debug_screenshots
                .then(|| diagnostics.debug_path("next_button_debug.png")),
        }
    }

    /// Click the next-lecture control, or ask the operator to move on, then
    /// poll the URL once a second for the configured window.
    pub async fn advance<D: Driver + ?Sized>(
        &self,
        driver: &D,
        operator: &dyn Operator,
    ) -> Result<Advance> {
        let start = driver.current_url().await?;

        let clicked = activate(driver, &self.strategies, self.settle).await?;
        if let Some(found) = &clicked {
            debug!("Clicked next with {}", self.strategies[found.strategy]);
        } else {
            warn!("No next-lecture control could be clicked");
            if let Some(path) = &self.debug_screenshot {
                diagnostics::capture(driver, path).await;
            }
            if !operator.navigate_manually().await {
                info!("No next lecture");
                return Ok(Advance::Exhausted);
            }
        }

        for _ in 0..self.window_secs {
            let url = driver.current_url().await?;
            if url != start {
                info!("Navigated to {}", url);
                tokio::time::sleep(self.post_navigation).await;
                return Ok(Advance::Confirmed { url });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        warn!("Next was clicked but the URL did not change, continuing anyway");
        Ok(Advance::Assumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Unattended;
    use crate::testing::{FakeDriver, FakeLecture, FakeOperator, NEXT};
    use tokio::time::Instant;

    fn assert_waited(begin: Instant, expected: Duration) {
        let waited = begin.elapsed();
        assert!(
            waited >= expected && waited < expected + Duration::from_millis(50),
            "waited {:?}, expected {:?}",
            waited,
            expected
        );
    }

    fn controller() -> NavigationController {
        NavigationController::new(
            &Selectors::default(),
            &Timing::default(),
            &Diagnostics::default(),
        )
    }

    fn course() -> Vec<FakeLecture> {
        vec![
            FakeLecture::new("https://learn.test/lecture/1", "One").with_next(),
            FakeLecture::new("https://learn.test/lecture/2", "Two"),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_on_url_change() {
        let driver = FakeDriver::new(course());
        let begin = Instant::now();
        let advance = controller().advance(&driver, &Unattended).await.unwrap();
        assert_eq!(
            advance,
            Advance::Confirmed {
                url: "https://learn.test/lecture/2".into()
            }
        );
        assert_eq!(driver.current(), 1);
        // settle before the click, then the post-navigation pause
        assert_waited(begin, Duration::from_millis(500 + 2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_assumed_when_url_never_changes() {
        let driver = FakeDriver::new(course()).stuck();
        let begin = Instant::now();
        let advance = controller().advance(&driver, &Unattended).await.unwrap();
        assert_eq!(advance, Advance::Assumed);
        assert!(advance.advanced());
        assert_eq!(driver.count("click next"), 1);
        assert_waited(begin, Duration::from_millis(500 + 10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_without_waiting() {
        let driver = FakeDriver::new(vec![FakeLecture::new("https://learn.test/lecture/9", "Last")]);
        let begin = Instant::now();
        let advance = controller().advance(&driver, &Unattended).await.unwrap();
        assert_eq!(advance, Advance::Exhausted);
        assert!(!advance.advanced());
        assert_waited(begin, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_navigation_counts_as_click() {
        let driver = FakeDriver::new(vec![FakeLecture::new("https://learn.test/lecture/9", "Last")]);
        let operator = FakeOperator::default().navigations(1);
        let begin = Instant::now();
        let advance = controller().advance(&driver, &operator).await.unwrap();
        assert_eq!(advance, Advance::Assumed);
        assert_eq!(operator.prompts(), vec!["navigate"]);
        assert!(begin.elapsed() <= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_next_click_falls_back_to_operator() {
        let driver = FakeDriver::new(course()).breaks_click(NEXT);
        let operator = FakeOperator::default();
        let advance = controller().advance(&driver, &operator).await.unwrap();
        assert_eq!(advance, Advance::Exhausted);
        assert_eq!(driver.count("click next"), 1);
        assert_eq!(operator.prompts(), vec!["navigate"]);
        assert_eq!(driver.current(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_configurable() {
        let timing = Timing {
            navigation_window_secs: 3,
            ..Timing::default()
        };
        let nav = NavigationController::new(&Selectors::default(), &timing, &Diagnostics::default());
        let driver = FakeDriver::new(course()).stuck();
        let begin = Instant::now();
        assert_eq!(nav.advance(&driver, &Unattended).await.unwrap(), Advance::Assumed);
        assert_waited(begin, Duration::from_millis(500 + 3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_screenshot_when_control_missing() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver::new(vec![FakeLecture::new("https://learn.test/lecture/9", "Last")]);
        let nav = NavigationController::new(
            &Selectors::default(),
            &Timing::default(),
            &Diagnostics {
                debug_screenshots: true,
                debug_dir: dir.path().to_string_lossy().into_owned(),
                ..Diagnostics::default()
            },
        );
        let advance = nav.advance(&driver, &Unattended).await.unwrap();
        assert_eq!(advance, Advance::Exhausted);
        assert_eq!(driver.count("screenshot"), 1);
        assert!(dir.path().join("next_button_debug.png").exists());
    }

    #[tokio::test]
    async fn test_dead_browser_is_an_error() {
        let driver = FakeDriver::new(course());
        driver.close();
        assert!(controller().advance(&driver, &Unattended).await.is_err());
    }
}
