//! Configuration for the self-edit workspace.
//!
//! Loaded from a TOML file with five optional sections. Every field has a
//! default, so an empty or missing file yields a runnable configuration:
//!
//! ```toml
//! [store]
//! candidates_dir = "./candidates"
//! artifacts_dir = "./artifacts"
//! embeddings_dir = "./store"
//!
//! [trainer]
//! command = ["python3", "scripts/lora_train.py"]
//! timeout_secs = 3600
//!
//! [evaluator]
//! pass_threshold = 0.6
//! review_threshold = 0.5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelfEditError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelfEditConfig {
    pub store: StoreConfig,
    pub generator: GeneratorConfig,
    pub trainer: TrainerConfig,
    pub evaluator: EvaluatorConfig,
    pub retrieval: RetrievalConfig,
}

impl SelfEditConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| SelfEditError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SelfEditError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<()> {
        if self.trainer.command.is_empty() {
            return Err(SelfEditError::Config(
                "trainer.command must name a program".to_string(),
            ));
        }
        for (name, value) in [
            ("evaluator.pass_threshold", self.evaluator.pass_threshold),
            ("evaluator.review_threshold", self.evaluator.review_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SelfEditError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.retrieval.chunk_max_len == 0 {
            return Err(SelfEditError::Config(
                "retrieval.chunk_max_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Working directories and the optional database backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub candidates_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub embeddings_dir: PathBuf,
    /// When set, candidates live in SurrealDB at this URL instead of
    /// `candidates_dir` (e.g. `surrealkv://.selfedit/db`).
    pub surreal_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            candidates_dir: PathBuf::from("./candidates"),
            artifacts_dir: PathBuf::from("./artifacts"),
            embeddings_dir: PathBuf::from("./store"),
            surreal_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Candidates produced per task when the caller does not say.
    pub candidates_per_task: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            candidates_per_task: 3,
        }
    }
}

/// External training process invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Program and leading arguments; `--train`, `--output`, `--epochs`
    /// and `--batch` are appended.
    pub command: Vec<String>,
    pub epochs: u32,
    pub batch_size: u32,
    /// Wall-clock limit for one training run (0 = unbounded).
    pub timeout_secs: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string(), "scripts/lora_train.py".to_string()],
            epochs: 1,
            batch_size: 4,
            timeout_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// JSONL file of `{prompt, completion}` lines.
    pub validation_path: PathBuf,
    pub pass_threshold: f64,
    pub review_threshold: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            validation_path: PathBuf::from("./validation/seal_validation.jsonl"),
            pass_threshold: 0.60,
            review_threshold: 0.50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_context: usize,
    pub chunk_max_len: usize,
    /// Prefix of ingested document ids (`<prefix><n>_chunk<i>`).
    pub id_prefix: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context: 5,
            chunk_max_len: 600,
            id_prefix: "img".to_string(),
        }
    }
}
