mod attended;

use crate::config::Config;
use crate::course::resolve_course_title;
use crate::diagnostics;
use crate::driver::{Driver, Query};
use crate::events::{EventSink, WalkEvent};
use crate::identity::IdentityResolver;
use crate::locator::activate;
use crate::navigate::NavigationController;
use crate::operator::Operator;
use crate::progress::ProgressTracker;
use crate::record::TranscriptRecord;
use crate::summary::Summarizer;
use crate::transcript::TranscriptExtractor;
use crate::Result;
use attended::Attended;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Walker lifecycle. `Walking` loops on itself until the walk ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkState {
    Idle,
    AwaitingTranscriptPanel,
    Walking,
    Done,
}

/// Why a walk that did not fail stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `max_lectures` transcripts collected.
    LimitReached,
    /// No next lecture.
    CourseEnd,
    /// Too many advances in a row landed on lectures already handled.
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalkOutcome {
    Completed(Termination),
    /// The browser stopped answering. Records collected before that are kept.
    Failed {
        error: String,
        snapshot: Option<PathBuf>,
    },
}

/// Everything a walk produced, including partial results of a failed walk.
#[derive(Debug)]
pub struct WalkReport {
    pub course_title: String,
    pub records: Vec<TranscriptRecord>,
    pub outcome: WalkOutcome,
    /// Lectures handled so far. Hand this to [`CourseWalker::with_progress`]
    /// to resume without repeating work.
    pub progress: ProgressTracker,
}

impl WalkReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, WalkOutcome::Completed(_))
    }
}

/// Drives one course walk over a borrowed browser.
pub struct CourseWalker<'a, D: Driver + ?Sized> {
    driver: &'a D,
    operator: Attended<'a>,
    config: &'a Config,
    events: EventSink,
    summarizer: Option<&'a dyn Summarizer>,
    resolver: IdentityResolver,
    extractor: TranscriptExtractor,
    navigator: NavigationController,
    progress: ProgressTracker,
    course_title: Option<String>,
    state: WalkState,
}

impl<'a, D: Driver + ?Sized> CourseWalker<'a, D> {
    pub fn new(
        driver: &'a D,
        operator: &'a dyn Operator,
        config: &'a Config,
        events: EventSink,
    ) -> Result<Self> {
        Ok(Self {
            driver,
            operator: Attended::new(operator, events.clone()),
            config,
            resolver: IdentityResolver::new(&config.selectors)?,
            extractor: TranscriptExtractor::new(&config.selectors),
            navigator: NavigationController::new(
                &config.selectors,
                &config.timing,
                &config.diagnostics,
            ),
            events,
            summarizer: None,
            progress: ProgressTracker::new(),
            course_title: None,
            state: WalkState::Idle,
        })
    }

    /// Summarize every non-empty transcript. Failures only cost the summary.
    pub fn with_summarizer(mut self, summarizer: &'a dyn Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Start from lectures already handled by an earlier walk.
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Open the course URL, wait for the operator to log in and land on the
    /// first lecture, then wait out any bot check still in the way.
    pub async fn open(&self) -> Result<()> {
        let url = &self.config.course_url;
        info!("Navigating to: {}", url);
        self.events.status(format!("Opening {}", url));
        self.driver.navigate(url).await?;

        self.operator.await_login(url).await;
        tokio::time::sleep(Duration::from_millis(self.config.timing.post_login_ms)).await;

        for _ in 0..self.config.timing.challenge_window_secs {
            let current = self.driver.current_url().await?;
            if !is_challenge(&current) {
                return Ok(());
            }
            debug!("Security check still showing at {}", current);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        if is_challenge(&self.driver.current_url().await?) {
            warn!(
                "Security check did not clear within {}s, continuing anyway",
                self.config.timing.challenge_window_secs
            );
        }
        Ok(())
    }

    /// Walk lectures until the course ends, the limit is reached or the
    /// browser fails. Never returns an error: failures end up in the report
    /// next to whatever was collected before them.
    pub async fn walk(mut self) -> WalkReport {
        let mut records = Vec::new();
        let outcome = match self.run(&mut records).await {
            Ok(termination) => {
                info!(
                    "Walk finished ({:?}) with {} transcripts",
                    termination,
                    records.len()
                );
                WalkOutcome::Completed(termination)
            }
            Err(e) => {
                error!("Walk failed: {}", e);
                let snapshot = match &self.config.diagnostics.screenshot {
                    Some(template) => diagnostics::capture(self.driver, template).await,
                    None => None,
                };
                WalkOutcome::Failed {
                    error: e.to_string(),
                    snapshot,
                }
            }
        };

        let course_title = self
            .course_title
            .take()
            .unwrap_or_else(|| format!("course_{}", chrono::Utc::now().timestamp()));

        match &outcome {
            WalkOutcome::Completed(_) => self.events.emit(WalkEvent::Success {
                course_title: course_title.clone(),
                records: records.len(),
            }),
            WalkOutcome::Failed { error, snapshot } => self.events.emit(WalkEvent::Error {
                message: error.clone(),
                snapshot: snapshot.clone(),
            }),
        }
        self.set_state(WalkState::Done);
        self.events.emit(WalkEvent::Done);

        WalkReport {
            course_title,
            records,
            outcome,
            progress: self.progress,
        }
    }

    async fn run(&mut self, records: &mut Vec<TranscriptRecord>) -> Result<Termination> {
        self.set_state(WalkState::AwaitingTranscriptPanel);
        self.enable_transcript_panel().await?;
        self.set_state(WalkState::Walking);

        let course_title =
            resolve_course_title(self.driver, &self.config.selectors, &self.operator).await?;
        self.events.status(format!("Course: {}", course_title));
        self.course_title = Some(course_title);

        let max = Some(self.config.max_lectures).filter(|&n| n > 0);
        let mut previous: Option<String> = None;
        let mut stalled = 0;

        loop {
            let url = self.driver.current_url().await?;
            let identity = self
                .resolver
                .resolve(self.driver, &self.operator, &url)
                .await?
                .identity;

            // the player stays put when the same lecture comes back after an advance
            if previous.as_deref() == Some(identity.full_title.as_str()) {
                stalled += 1;
            } else {
                stalled = 0;
            }
            previous = Some(identity.full_title.clone());

            if self.progress.is_processed(&identity, &url) {
                info!("Already processed '{}', moving on", identity);
                self.events.emit(WalkEvent::LectureSkipped {
                    title: identity.full_title.clone(),
                });
                if stalled >= self.config.timing.max_stalled_advances {
                    warn!(
                        "Still on '{}' after {} advances, stopping",
                        identity, stalled
                    );
                    return Ok(Termination::Stalled);
                }
                if !self.advance().await? {
                    return Ok(Termination::CourseEnd);
                }
                continue;
            }

            info!("[{}] Processing: {}", records.len() + 1, identity);

            let lines = self.extractor.extract(self.driver).await?;
            if lines.is_empty() {
                warn!("No transcript for '{}'", identity);
                self.events.emit(WalkEvent::TranscriptMissing {
                    title: identity.full_title.clone(),
                });
            } else {
                let mut record = TranscriptRecord::new(identity.clone(), lines);
                let summarized = self.summarize(&mut record).await;
                self.events.emit(WalkEvent::LectureCompleted {
                    title: identity.full_title.clone(),
                    lines: record.lines().len(),
                    summarized,
                });
                records.push(record);
            }
            self.progress.mark_processed(&identity, &url);
            self.events.emit(WalkEvent::Progress {
                current: records.len(),
                max,
                title: identity.full_title.clone(),
            });

            if max.is_some_and(|max| records.len() >= max) {
                return Ok(Termination::LimitReached);
            }
            if !self.advance().await? {
                return Ok(Termination::CourseEnd);
            }
        }
    }

    async fn advance(&self) -> Result<bool> {
        let advance = self.navigator.advance(self.driver, &self.operator).await?;
        if !advance.advanced() {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(self.config.timing.between_lectures_ms)).await;
        Ok(true)
    }

    async fn enable_transcript_panel(&self) -> Result<()> {
        if self.panel_visible().await? {
            info!("Transcript panel already open");
            return Ok(());
        }

        let toggles = &self.config.selectors.transcript_toggle;
        let settle = Duration::from_millis(self.config.timing.settle_ms);
        if let Some(found) = activate(self.driver, toggles, settle).await? {
            debug!("Clicked the transcript toggle with {}", toggles[found.strategy]);
            tokio::time::sleep(Duration::from_millis(self.config.timing.toggle_settle_ms)).await;
            if self.panel_visible().await? {
                info!("Transcript panel opened");
            } else {
                info!("Clicked the transcript toggle, panel not confirmed");
            }
            return Ok(());
        }

        warn!("No transcript toggle could be clicked");
        let diag = &self.config.diagnostics;
        if diag.debug_screenshots {
            diagnostics::capture(self.driver, &diag.debug_path("transcript_button_debug.png"))
                .await;
        }
        if self.operator.enable_transcript_panel().await {
            info!("Operator opened the transcript panel");
        } else {
            warn!("Continuing without a confirmed transcript panel");
        }
        Ok(())
    }

    async fn panel_visible(&self) -> Result<bool> {
        for selector in &self.config.selectors.transcript_panel {
            let matches = self.driver.query(&Query::css(selector)).await?;
            if matches.iter().any(|m| m.visible) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn summarize(&self, record: &mut TranscriptRecord) -> bool {
        let Some(summarizer) = self.summarizer else {
            return false;
        };
        let title = record.identity().full_title.clone();
        info!("Summarizing '{}'", title);
        match summarizer.summarize(&record.text(), &title).await {
            Ok(summary) if !summary.trim().is_empty() => {
                record.attach_summary(summary);
                true
            }
            Ok(_) => {
                warn!("Empty summary for '{}'", title);
                false
            }
            Err(e) => {
                warn!("Summary failed for '{}': {}", title, e);
                false
            }
        }
    }

    fn set_state(&mut self, state: WalkState) {
        debug!("Walker state: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.events.emit(WalkEvent::State { state });
    }
}

fn is_challenge(url: &str) -> bool {
    url.contains("challenge") || url.contains("cloudflare")
}
