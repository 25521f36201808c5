use crate::identity::LectureIdentity;
use serde::Serialize;

/// Transcript of one lecture. Only the summary can be added after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRecord {
    identity: LectureIdentity,
    lines: Vec<String>,
    summary: Option<String>,
}

impl TranscriptRecord {
    pub fn new(identity: LectureIdentity, lines: Vec<String>) -> Self {
        Self {
            identity,
            lines,
            summary: None,
        }
    }

    pub fn identity(&self) -> &LectureIdentity {
        &self.identity
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Transcript lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn attach_summary(&mut self, summary: String) {
        self.summary = Some(summary);
    }
}
