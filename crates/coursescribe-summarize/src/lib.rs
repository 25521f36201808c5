//! # coursescribe-summarize
//!
//! Lecture summaries from an OpenAI-compatible chat completions endpoint.
//!
//! ```rust,no_run
//! use coursescribe_summarize::OpenAiSummarizer;
//! use coursescribe_walker::SummaryConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> coursescribe_summarize::Result<()> {
//! let config = SummaryConfig {
//!     api_key: Some("sk-...".into()),
//!     ..Default::default()
//! };
//! let summarizer = OpenAiSummarizer::new(&config)?;
//! summarizer.validate_key().await?;
//! let markdown = summarizer.summarize_lecture("...transcript...", "12. Replication").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use coursescribe_walker::{Summarizer, SummaryConfig, SummaryError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Result type for summarizer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API returned no summary")]
    EmptyResponse,
}

const SYSTEM_PROMPT: &str = "You are an educational content specialist. You turn lecture \
transcripts into well-structured study notes: you identify the core concepts, define key \
terms precisely, explain processes step by step, and use examples and analogies that make \
the material easy to review later. Your notes are accurate, scannable and written in clean \
Markdown that renders well in Notion.";

/// User prompt for one lecture. The transcript is appended after it.
pub fn summary_prompt(title: &str) -> String {
    format!(
        "Summarize this lecture transcript as Markdown notes that import cleanly into Notion. \
The lecture title is: {title}.

Formatting:
1. Start with an H1 header containing exactly the lecture title: {title}
2. Use H2 headers for the main sections and H3 for subsections.
3. Put important concepts in **bold** and technical terms, commands or syntax in `code`.
4. Use bullet and numbered lists where they help, `>` for toggles and quotations, and \
`---` between major sections.
5. Use a few emojis (📌 🔑 ⚠️ 💡) as visual markers, sparingly.

Structure:
- A two or three sentence overview
- Key concepts with clear explanations
- Important definitions
- Step-by-step processes where the lecture has them
- A \"Key Takeaways\" section at the end

Transcript:
"
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// [`Summarizer`] backed by a chat completions endpoint.
pub struct OpenAiSummarizer {
    config: SummaryConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiSummarizer {
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(Error::MissingApiKey)?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }

    /// Send a tiny request to check the key before a long walk depends on it.
    pub async fn validate_key(&self) -> Result<()> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::new("user", "Hello")],
            temperature: None,
            max_tokens: 5,
        };
        self.send(&request).await?;
        info!("API key accepted by {}", self.config.endpoint);
        Ok(())
    }

    /// Markdown summary of one lecture.
    pub async fn summarize_lecture(&self, transcript: &str, title: &str) -> Result<String> {
        let request = self.summary_request(transcript, title);
        let body = self.send(&request).await?;
        parse_response(&body)
    }

    fn summary_request(&self, transcript: &str, title: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", format!("{}{}", summary_prompt(title), transcript)),
            ],
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<String> {
        debug!("POST {} (model {})", self.config.endpoint, request.model);
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn parse_response(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(Error::EmptyResponse)
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, transcript: &str, title: &str) -> std::result::Result<String, SummaryError> {
        Ok(self.summarize_lecture(transcript, title).await?)
    }
}
