//! Writes a finished walk to disk.

use anyhow::{Context, Result};
use coursescribe_walker::{sanitize_filename, WalkReport};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What [`OutputSink::write`] put on disk.
#[derive(Debug, Default)]
pub struct Written {
    pub dir: PathBuf,
    pub transcripts: usize,
    pub summaries: usize,
}

/// Lays out transcripts as `<root>/<course>/<title>.txt` and summaries as
/// `<root>/<course>/summaries/<title>_summary.md`.
pub struct OutputSink {
    root: PathBuf,
}

impl OutputSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn course_dir(&self, course_title: &str) -> PathBuf {
        self.root.join(sanitize_filename(course_title))
    }

    /// Write every record of the report, partial walks included.
    pub fn write(&self, report: &WalkReport) -> Result<Written> {
        let dir = self.course_dir(&report.course_title);
        let mut written = Written {
            dir: dir.clone(),
            ..Default::default()
        };
        if report.records.is_empty() {
            return Ok(written);
        }

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;

        for record in &report.records {
            let name = sanitize_filename(&record.identity().full_title);
            let path = dir.join(format!("{}.txt", name));
            write_file(&path, &record.text())?;
            written.transcripts += 1;

            if let Some(summary) = record.summary() {
                let summaries = dir.join("summaries");
                std::fs::create_dir_all(&summaries)
                    .with_context(|| format!("creating {}", summaries.display()))?;
                write_file(&summaries.join(format!("{}_summary.md", name)), summary)?;
                written.summaries += 1;
            }
        }

        info!(
            "Saved {} transcripts ({} summaries) to {}",
            written.transcripts,
            written.summaries,
            dir.display()
        );
        Ok(written)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    debug!("Writing {}", path.display());
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
