//! Remote text-generation agents.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use trendbot_shared::{AgentConfig, Result, TrendbotError};

/// A remote service that turns a natural-language instruction into free text.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Provider name recorded with each analysis, e.g. "DeepSeek".
    fn provider(&self) -> &str;

    /// Run one generation. No retries; the caller decides what a failure means.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Chat completions wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatAgent
// ---------------------------------------------------------------------------

/// Agent backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatAgent {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    provider: String,
    instructions: String,
}

impl ChatAgent {
    /// `instructions` is sent as the system message on every request.
    pub fn new(config: &AgentConfig, instructions: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendbotError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            provider: config.provider.clone(),
            instructions: instructions.into(),
        })
    }
}

impl fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatAgent")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn provider(&self) -> &str {
        &self.provider
    }

    #[instrument(skip_all, fields(provider = %self.provider, model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TrendbotError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrendbotError::Network(format!(
                "{url}: HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TrendbotError::parse(format!("invalid completion response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TrendbotError::parse("completion response had no content"))?;

        debug!(chars = text.chars().count(), "completion received");
        Ok(text)
    }
}
