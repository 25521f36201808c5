//! Human fallback points.
//!
//! The walker only asks for help after every automated strategy is exhausted.
//! Each call blocks until the operator answers or declines.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// What the walker is waiting on a human for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prompt {
    /// Log in, clear any bot check, and open the first lecture.
    Login { url: String },
    /// Open the transcript panel by hand.
    TranscriptPanel,
    /// Type the current lecture's number and title.
    LectureIdentity { url: String },
    /// Move the player to the next lecture by hand, or stop.
    Navigation,
    /// Type the course title.
    CourseTitle,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Login { url } => write!(
                f,
                "log in at {} (complete any security check first), then open the first lecture",
                url
            ),
            Prompt::TranscriptPanel => f.write_str("open the transcript panel in the browser"),
            Prompt::LectureIdentity { url } => {
                write!(f, "enter the number and title of the lecture at {}", url)
            }
            Prompt::Navigation => {
                f.write_str("move to the next lecture in the browser, or stop the walk")
            }
            Prompt::CourseTitle => f.write_str("enter the course title"),
        }
    }
}

/// Number and title typed by the operator. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualIdentity {
    pub number: String,
    pub title: String,
}

#[async_trait]
pub trait Operator: Send + Sync {
    /// Wait until the operator has logged in and opened the first lecture.
    async fn await_login(&self, url: &str);

    /// `true` once the operator has opened the transcript panel.
    async fn enable_transcript_panel(&self) -> bool;

    /// Lecture number and title, or `None` if the operator skips.
    async fn identify_lecture(&self, url: &str) -> Option<ManualIdentity>;

    /// `true` if the operator moved to the next lecture, `false` to end the walk.
    async fn navigate_manually(&self) -> bool;

    /// Course title, or `None` if the operator skips.
    async fn course_title(&self) -> Option<String>;
}

/// Operator that never answers: logins are assumed done and every fallback is declined.
///
/// Used for headless runs where nobody watches the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

#[async_trait]
impl Operator for Unattended {
    async fn await_login(&self, _url: &str) {}

    async fn enable_transcript_panel(&self) -> bool {
        false
    }

    async fn identify_lecture(&self, _url: &str) -> Option<ManualIdentity> {
        None
    }

    async fn navigate_manually(&self) -> bool {
        false
    }

    async fn course_title(&self) -> Option<String> {
        None
    }
}
