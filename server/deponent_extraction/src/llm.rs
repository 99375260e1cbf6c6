//! Chat-completions client abstraction.
//!
//! [`ChatClient`] is the seam between the LLM-backed adapters and the HTTP
//! provider; [`OpenAiChatClient`] speaks the OpenAI-compatible
//! `/chat/completions` protocol (OpenAI, Fireworks, Ollama, vLLM, ...).
//!
//! Also hosts the helpers that pull a JSON block out of noisy model output.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use deponent_config::LlmConfig;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send one conversation and return the assistant's text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageContent,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessageContent {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChatClient {
    api_key: Option<String>,
    api_base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: Option<String>,
        api_base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = if api_base_url.is_empty() {
            OPENAI_API_BASE.to_string()
        } else {
            api_base_url.trim_end_matches('/').to_string()
        };
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            api_key,
            api_base_url: base_url,
            model,
            temperature: 0.0,
            max_tokens: 1024,
            client,
        })
    }

    /// Build a client from `[llm]` settings. The key is read from `api_key_env`;
    /// a missing key is allowed for local servers that do not check it.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut client = Self::new(
            config.api_key(),
            config.endpoint.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        client.temperature = config.temperature;
        client.max_tokens = config.max_tokens;
        Ok(client)
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = OpenAiChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.api_base_url);
        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Chat completion request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion API error ({}): {}", status, body);
        }

        let chat_response: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse chat completion response: {}", e))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("No completion choices returned"))
    }
}

/// Extract the first `[...]` block from potentially noisy LLM output.
///
/// Handles prose or markdown fences before and after the JSON.
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_block(text, '[', ']')
}

/// Extract the first `{...}` block from potentially noisy LLM output.
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_block(text, '{', '}')
}

fn extract_block(text: &str, open: char, close: char) -> Option<&str> {
    let trimmed = text.trim();
    let start = trimmed.find(open)?;
    let end = trimmed.rfind(close)?;
    (start < end).then(|| &trimmed[start..=end])
}
