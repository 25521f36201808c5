//! Operator prompts answered on the terminal.

use async_trait::async_trait;
use coursescribe_walker::{ManualIdentity, Operator, Prompt};
use std::io::{self, BufRead, Write};

/// Asks the person at the terminal whenever the walker runs out of automated options.
///
/// Stdin is read on the blocking pool so the browser keeps being driven while
/// the prompt waits. End of input declines every question.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    async fn ask(&self, question: String) -> Option<String> {
        tokio::task::spawn_blocking(move || {
            print!("{}", question);
            io::stdout().flush().ok()?;
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line.trim().to_string()),
            }
        })
        .await
        .ok()
        .flatten()
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    async fn await_login(&self, url: &str) {
        let prompt = Prompt::Login {
            url: url.to_string(),
        };
        println!();
        println!("==> Please {}.", prompt);
        self.ask("    Press Enter when the lecture is playing... ".into())
            .await;
    }

    async fn enable_transcript_panel(&self) -> bool {
        println!();
        println!("==> Could not open the transcript panel automatically.");
        let answer = self
            .ask(format!(
                "    Please {}, then press Enter (or type 'skip'): ",
                Prompt::TranscriptPanel
            ))
            .await;
        accepts(answer.as_deref(), "skip")
    }

    async fn identify_lecture(&self, url: &str) -> Option<ManualIdentity> {
        println!();
        println!("==> Could not tell which lecture is playing at {}", url);
        let number = self
            .ask("    Lecture number (e.g. 12, empty if none): ".into())
            .await?;
        let title = self.ask("    Lecture title (empty to skip): ".into()).await?;
        manual_identity(number, title)
    }

    async fn navigate_manually(&self) -> bool {
        println!();
        println!("==> Could not find the next-lecture control.");
        println!("    1. I moved to the next lecture");
        println!("    2. Stop here");
        let answer = self.ask("    Choice [1/2]: ".into()).await;
        matches!(answer.as_deref(), Some("1"))
    }

    async fn course_title(&self) -> Option<String> {
        println!();
        println!("==> Could not read the course title.");
        self.ask(format!("    Please {} (empty to skip): ", Prompt::CourseTitle))
            .await
            .filter(|t| !t.is_empty())
    }
}

/// Enter (or any answer but `decline`) accepts; end of input declines.
fn accepts(answer: Option<&str>, decline: &str) -> bool {
    match answer {
        Some(a) => !a.eq_ignore_ascii_case(decline),
        None => false,
    }
}

fn manual_identity(number: String, title: String) -> Option<ManualIdentity> {
    if title.is_empty() {
        return None;
    }
    Some(ManualIdentity { number, title })
}
