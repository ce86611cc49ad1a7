use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};

/// Produces a summary card as an HTML fragment from raw article text. One
/// outbound call per invocation, no retries, no state between calls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, article_text: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for an OpenAI-compatible chat-completion endpoint. The request
/// relies on the transport's default timeout; there is no explicit deadline
/// override on the summarization stage.
pub struct ChatCompletionSummarizer {
    client: Client,
    config: LlmConfig,
}

impl ChatCompletionSummarizer {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    async fn summarize(&self, article_text: &str, prompt: &str) -> Result<String> {
        if article_text.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AppError::UpstreamUnavailable)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: article_text,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            article_chars = article_text.len(),
            model = %self.config.model,
            "sending summarization request"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::UpstreamError {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: format!("Summarization request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            // The upstream error envelope is provider-dependent; fall back to
            // the HTTP status text when it cannot be parsed.
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(AppError::UpstreamError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| AppError::UpstreamError {
            status: status.as_u16(),
            message: format!("Malformed summarization response: {}", e),
        })?;

        let summary = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::UpstreamError {
                status: status.as_u16(),
                message: "Summarization response contained no content".to_string(),
            })?;

        tracing::debug!(summary_chars = summary.len(), "summarization response received");

        Ok(summary)
    }
}
