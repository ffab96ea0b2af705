use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::traits::{ChatModel, ChatPrompt};
use crate::types::{ChatRequest, ChatResponse, WireMessage};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// Chat-completions client against an OpenRouter-compatible endpoint.
pub struct ChatClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: OPENROUTER_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point at a different completions-compatible endpoint.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(WireMessage::system(&prompt.system));
        }
        messages.push(WireMessage::user(&prompt.user));

        let request = ChatRequest {
            model: prompt.model.clone(),
            messages,
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        debug!(model = %prompt.model, "Chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Chat API error ({}): {}", status, error_text));
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No content in model response"))
    }
}
