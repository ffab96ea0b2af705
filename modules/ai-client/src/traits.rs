use anyhow::Result;
use async_trait::async_trait;

/// One system+user exchange to send to a named model.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub model: String,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl ChatPrompt {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: String::new(),
            user: String::new(),
            max_tokens: 2048,
            temperature: None,
        }
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.system = content.into();
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.user = content.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Seam over the chat-completions endpoint. The single production impl is
/// `ChatClient`; tests substitute scripted models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one prompt and return the raw assistant text. The text is free
    /// form; callers are responsible for defensive parsing.
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;
}
