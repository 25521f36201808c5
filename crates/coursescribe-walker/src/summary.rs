use async_trait::async_trait;

/// Error from a summarization backend. Never fatal to a walk.
pub type SummaryError = Box<dyn std::error::Error + Send + Sync>;

/// Turns one lecture's transcript into a summary document.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str, title: &str) -> Result<String, SummaryError>;
}
