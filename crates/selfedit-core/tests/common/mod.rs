//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use selfedit_core::{
    Embedder, GenerationService, ProcessExit, ResponseService, Result, SelfEditError,
    TextExtractor, TrainingJob, TrainingProcess,
};

/// Returns queued responses in order; `Err` entries simulate transport failures.
pub struct ScriptedGeneration {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedGeneration {
    pub fn new(responses: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(response: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(response.to_string())).collect())
    }
}

#[async_trait]
impl GenerationService for ScriptedGeneration {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(SelfEditError::Collaborator(msg)),
            None => Err(SelfEditError::Collaborator("script exhausted".into())),
        }
    }
}

/// Answers a validation prompt by the first rule whose needle it contains.
pub struct ScriptedResponder {
    rules: Vec<(String, String)>,
    pub calls: AtomicUsize,
    pub artifacts: Mutex<Vec<PathBuf>>,
}

impl ScriptedResponder {
    pub fn new(rules: &[(&str, &str)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(n, a)| (n.to_string(), a.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
            artifacts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ResponseService for ScriptedResponder {
    async fn respond(&self, artifact: &Path, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.artifacts.lock().unwrap().push(artifact.to_path_buf());
        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_default())
    }
}

/// Bag-of-keywords embedder: one dimension per keyword, 1.0 if present.
pub struct KeywordEmbedder {
    pub keywords: Vec<&'static str>,
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect())
    }
}

pub struct FixedText(pub &'static str);

#[async_trait]
impl TextExtractor for FixedText {
    async fn extract_text(&self, _path: &Path) -> Result<String> {
        Ok(self.0.to_string())
    }
}

pub enum FakeBehavior {
    Succeed,
    Exit(i32),
    SpawnError,
    Hang,
}

/// Training process that never spawns anything.
pub struct FakeProcess {
    behavior: FakeBehavior,
    pub jobs: Mutex<Vec<TrainingJob>>,
}

impl FakeProcess {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            jobs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TrainingProcess for FakeProcess {
    async fn run(&self, job: &TrainingJob) -> Result<ProcessExit> {
        self.jobs.lock().unwrap().push(job.clone());
        match self.behavior {
            FakeBehavior::Succeed => Ok(ProcessExit::success()),
            FakeBehavior::Exit(code) => Ok(ProcessExit::failure(Some(code), "boom")),
            FakeBehavior::SpawnError => Err(SelfEditError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such trainer",
            ))),
            FakeBehavior::Hang => std::future::pending().await,
        }
    }
}

pub const GOOD_RESPONSE: &str = r#"Plan below.
{"plan": "1. gather chunks 2. write Q/A",
 "examples": [
   {"input": "What is SEAL?", "output": "Self-adapting language models", "source_chunks": ["img1_chunk0"]},
   {"input": "How are self-edits trained?", "output": "With supervised fine-tuning"}
 ],
 "metadata": {"confidence": 0.8}}"#;
