//! OpenAI-compatible client for chat completions and embeddings.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use selfedit_core::{Embedder, GenerationService, ResponseService};

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
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

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Validation prompts go out as they are, in a single user turn.
fn validation_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(prompt)]
}

fn first_choice(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| LlmError::EmptyResponse("chat/completions".to_string()))
}

fn first_embedding(body: &str) -> Result<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_str(body)?;
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| LlmError::EmptyResponse("embeddings".to_string()))
}

/// HTTP client for an OpenAI-compatible API.
pub struct OpenAiClient {
    config: LlmConfig,
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("selfedit-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            http_client,
        })
    }

    /// Create a client whose key comes from `config.api_key_env`.
    pub fn from_env(config: LlmConfig) -> Result<Self> {
        let key = config.api_key_from_env()?;
        Self::new(config, key)
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "llm request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    /// One chat completion with `model`.
    pub async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: self.config.max_tokens,
        };
        let body = self.post("chat/completions", &request).await?;
        first_choice(&body)
    }

    pub async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };
        let body = self.post("embeddings", &request).await?;
        first_embedding(&body)
    }

    /// Model that answers validation prompts for the adapter at `artifact`.
    pub fn response_model(&self, artifact: &Path) -> String {
        if self.config.adapter_models {
            if let Some(name) = artifact.file_name() {
                return name.to_string_lossy().into_owned();
            }
        }
        self.config.chat_model.clone()
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> selfedit_core::Result<Vec<f32>> {
        Ok(self.embedding(text).await?)
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> selfedit_core::Result<String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        Ok(self.chat(&self.config.chat_model, messages).await?)
    }
}

#[async_trait]
impl ResponseService for OpenAiClient {
    async fn respond(&self, artifact: &Path, prompt: &str) -> selfedit_core::Result<String> {
        let model = self.response_model(artifact);
        debug!(artifact = %artifact.display(), model = %model, "validation request");
        Ok(self.chat(&model, validation_messages(prompt)).await?)
    }
}
