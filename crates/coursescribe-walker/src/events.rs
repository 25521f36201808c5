//! One-way event stream from a running walk to whoever displays it.

use crate::operator::Prompt;
use crate::walker::WalkState;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalkEvent {
    Status {
        message: String,
    },
    State {
        state: WalkState,
    },
    /// The walk is paused until the operator acts.
    AwaitingOperator {
        prompt: Prompt,
    },
    /// Lecture `title` was handled and `current` transcripts are collected so far.
    /// `max` is `None` when unlimited.
    Progress {
        current: usize,
        max: Option<usize>,
        title: String,
    },
    LectureSkipped {
        title: String,
    },
    TranscriptMissing {
        title: String,
    },
    LectureCompleted {
        title: String,
        lines: usize,
        summarized: bool,
    },
    Success {
        course_title: String,
        records: usize,
    },
    Error {
        message: String,
        snapshot: Option<PathBuf>,
    },
    /// Always the last event of a walk.
    Done,
}

/// Sending half of the event stream. Sending never blocks, and a receiver that
/// went away is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<WalkEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WalkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sink that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: WalkEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(WalkEvent::Status {
            message: message.into(),
        });
    }
}
