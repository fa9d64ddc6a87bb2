//! Client configuration, read from the `[llm]` table of the workspace
//! config file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// Endpoint and model selection for [`crate::OpenAiClient`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without the endpoint path.
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Send validation prompts to a model named after the adapter
    /// directory (servers that expose LoRA adapters as models).
    pub adapter_models: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 800,
            timeout_secs: 120,
            adapter_models: false,
        }
    }
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    llm: LlmConfig,
}

impl LlmConfig {
    /// Read the `[llm]` table from `path`; a missing file or table yields
    /// the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(file.llm)
    }

    /// The API key from [`Self::api_key_env`].
    pub fn api_key_from_env(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(self.api_key_env.clone()))
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
