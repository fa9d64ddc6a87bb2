//! Traits for the external services the lifecycle drives.
//!
//! None of these are implemented here beyond prompt construction: the
//! embedding and chat models live in `selfedit-llm`, text extraction is
//! left to the caller, and training runs as a child process (see
//! [`crate::trainer`]).

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Chat-style completion used by the generator and the query path.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Answers a validation prompt with the adapted model found at `artifact`.
#[async_trait]
pub trait ResponseService: Send + Sync {
    async fn respond(&self, artifact: &Path, prompt: &str) -> Result<String>;
}

/// Extracts text from a source document such as an image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Builds the instructions sent to the generation and response services.
pub trait PromptBuilder: Send + Sync {
    /// System prompt of a planning request.
    fn planner_system(&self) -> String;

    /// User prompt asking for a plan, examples and metadata for `task`.
    fn planner_user(&self, task: &str) -> String;

    /// System prompt of a retrieval-grounded answer.
    fn query_system(&self) -> String;

    /// User prompt combining `query` with rendered context snippets.
    fn query_user(&self, query: &str, context: &str) -> String;

    /// Wraps one validation prompt before it is sent for scoring.
    fn validation_prompt(&self, prompt: &str) -> String;
}

/// Prompts used by the command-line tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrompts;

impl PromptBuilder for DefaultPrompts {
    fn planner_system(&self) -> String {
        "You are an agentic planner for self-edits.".to_string()
    }

    fn planner_user(&self, task: &str) -> String {
        format!(
            "Task: {task}\n\n\
             1) Propose a concise plan (3-6 steps) to improve model answers for the task, \
             focused on generating self-edit SFT examples.\n\
             2) Provide 3 SFT examples (input -> output) that can be used to fine-tune a model. \
             Each example should cite the origin chunk ids from the retrieval index as source_chunks.\n\
             3) Provide metadata: approximate token length and a confidence score (0-1).\n\n\
             Return JSON with keys: plan, examples, metadata."
        )
    }

    fn query_system(&self) -> String {
        "You are a retrieval-grounded assistant. Use the provided context snippets to answer \
         concisely. If you generate an adaptation directive (self-edit), return it in a JSON \
         object with key \"self_edit\" alongside \"answer\"."
            .to_string()
    }

    fn query_user(&self, query: &str, context: &str) -> String {
        format!(
            "User question: {query}\n\nContext snippets:\n{context}\n\n\
             Answer the question and optionally produce a suggested self-edit JSON."
        )
    }

    fn validation_prompt(&self, prompt: &str) -> String {
        format!(
            "Validation question:\n{prompt}\n\nContext: Use SEAL paper knowledge.\nReturn concise answer."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_prompt_names_task_and_keys() {
        let prompt = DefaultPrompts.planner_user("Improve SEAL explanation quality");
        assert!(prompt.starts_with("Task: Improve SEAL explanation quality\n\n"));
        assert!(prompt.ends_with("Return JSON with keys: plan, examples, metadata."));
    }

    #[test]
    fn validation_prompt_wraps_question() {
        assert_eq!(
            DefaultPrompts.validation_prompt("What is SEAL?"),
            "Validation question:\nWhat is SEAL?\n\nContext: Use SEAL paper knowledge.\nReturn concise answer."
        );
    }
}
