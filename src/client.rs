//! Matching service client
//!
//! Sends a batch to an OpenAI-compatible chat-completions endpoint and
//! returns the model's reply as plain text. Transient statuses are retried
//! according to the configured [`RetryPolicy`].

use crate::batcher::Batch;
use crate::config::ServiceConfig;
use crate::error::{Result, VibegrepError};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Instruction sent as the system message
pub const INSTRUCTION: &str = "You are a semantic grep. Given files and a query, output ONLY the original lines that match.\n\
- Match by meaning, not literal text\n\
- Copy lines exactly as they appear, preserving whitespace\n\
- Output nothing else: no explanations, no line numbers, no markdown\n\
- If nothing matches, output nothing";

/// Anything that can judge which lines of a batch match a query
#[async_trait]
pub trait MatchingService: Send + Sync {
    /// Return the matching lines, one per line, or an empty string
    async fn find_matches(&self, query: &str, batch: &Batch) -> Result<String>;
}

/// Build the user message: the query followed by each labelled chunk
pub fn build_user_message(query: &str, batch: &Batch) -> String {
    let files: Vec<String> = batch
        .chunks
        .iter()
        .map(|c| format!("=== FILE: {} ===\n{}", c.label, c.text))
        .collect();
    format!("Search query: {}\n\n{}", query, files.join("\n"))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completions client
pub struct ChatClient {
    http: Client,
    service: ServiceConfig,
    retry: RetryPolicy,
}

impl ChatClient {
    /// Create a client for the given endpoint
    pub fn new(service: ServiceConfig, retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder().timeout(service.timeout).build()?;
        Ok(Self {
            http,
            service,
            retry,
        })
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<String> {
        let url = self.service.completions_url();
        let mut attempt = 0;

        loop {
            debug!("POST {} (attempt {})", url, attempt + 1);
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.service.api_key)
                .json(body)
                .send()
                .await?;

            let status = response.status().as_u16();

            if self.retry.is_transient(status) {
                if self.retry.should_retry(attempt, status) {
                    let delay = self.retry.delay_for(attempt);
                    warn!("Service returned {}, retrying in {:?}", status, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(VibegrepError::RetriesExhausted {
                    attempts: attempt + 1,
                    status,
                });
            }

            if !response.status().is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(VibegrepError::Status { status, body });
            }

            let text = response.text().await?;
            return parse_reply(&text);
        }
    }
}

#[async_trait]
impl MatchingService for ChatClient {
    async fn find_matches(&self, query: &str, batch: &Batch) -> Result<String> {
        let user = build_user_message(query, batch);
        let body = ChatRequest {
            model: &self.service.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: INSTRUCTION,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.service.temperature,
            max_completion_tokens: self.service.max_completion_tokens,
        };

        self.send(&body).await
    }
}

/// Pull the reply text out of a chat-completion body
fn parse_reply(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| VibegrepError::MalformedResponse(e.to_string()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| VibegrepError::MalformedResponse("No choices in response".to_string()))?;

    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}
