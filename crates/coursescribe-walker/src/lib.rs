//! # coursescribe-walker
//!
//! Walks every lecture of a video course in a live browser session and pulls the
//! on-screen transcript of each one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coursescribe_walker::{Config, CourseWalker, EokaDriver, EventSink, Unattended};
//!
//! # #[tokio::main]
//! # async fn main() -> coursescribe_walker::Result<()> {
//! let config = Config::load("course.yaml")?;
//! let (browser, driver) = EokaDriver::launch(&config.browser).await?;
//! let operator = Unattended;
//!
//! let walker = CourseWalker::new(&driver, &operator, &config, EventSink::disabled())?;
//! walker.open().await?;
//! let report = walker.walk().await;
//! println!("{} transcripts", report.records.len());
//!
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```

mod cascade;
mod config;
mod course;
mod diagnostics;
mod driver;
mod events;
mod identity;
mod locator;
mod navigate;
mod operator;
mod progress;
mod record;
mod summary;
mod transcript;
mod walker;

#[cfg(test)]
mod testing;

pub use cascade::{first_success, Hit};
pub use config::{
    BrowserConfig, Config, Diagnostics, Params, Selectors, SummaryConfig, Timing, Viewport,
};
pub use course::{resolve_course_title, sanitize_filename};
pub use driver::{Driver, ElementHandle, ElementMatch, EokaDriver, Query};
pub use events::{EventSink, WalkEvent};
pub use identity::{IdentityResolver, IdentitySource, IdentityStrategy, LectureIdentity, Resolution};
pub use locator::{activate, click, locate, ExtractionMode, Located, LocatorStrategy};
pub use navigate::{Advance, NavigationController};
pub use operator::{ManualIdentity, Operator, Prompt, Unattended};
pub use progress::ProgressTracker;
pub use record::TranscriptRecord;
pub use summary::{SummaryError, Summarizer};
pub use transcript::{markup_fragments, split_lines, TranscriptExtractor};
pub use walker::{CourseWalker, Termination, WalkOutcome, WalkReport, WalkState};

/// Result type for coursescribe-walker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading config or driving the browser.
///
/// Lookup misses are not errors: the locator returns `None` and the extractor an
/// empty transcript. Anything that reaches this type is either a bad config or a
/// browser that stopped answering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("script result error: {0}")]
    Script(#[from] serde_json::Error),

    #[error("driver error: {0}")]
    Driver(String),
}
