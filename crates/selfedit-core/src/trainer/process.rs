//! The external training process.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use selfedit_state::CandidateId;

use crate::config::TrainerConfig;
use crate::error::{Result, SelfEditError};

/// Captured output kept on a failed exit.
const OUTPUT_TAIL_CHARS: usize = 2000;

/// One training invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub candidate_id: CandidateId,
    pub train_file: PathBuf,
    pub output_dir: PathBuf,
    pub epochs: u32,
    pub batch_size: u32,
}

/// How a training process ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessExit {
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Last part of stderr.
    #[serde(default)]
    pub stderr_tail: String,
}

impl ProcessExit {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
            stderr_tail: String::new(),
        }
    }

    pub fn failure(code: Option<i32>, stderr_tail: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            stderr_tail: stderr_tail.into(),
        }
    }

    /// Human-readable failure reason.
    pub fn describe(&self) -> String {
        let code = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        if self.stderr_tail.trim().is_empty() {
            code
        } else {
            format!("{code}: {}", self.stderr_tail.trim())
        }
    }
}

/// Runs a training job to completion.
///
/// Implementations must stop the underlying work when the returned future
/// is dropped; the trainer relies on that for deadlines and cancellation.
#[async_trait]
pub trait TrainingProcess: Send + Sync {
    /// `Err` means the process could not be started at all.
    async fn run(&self, job: &TrainingJob) -> Result<ProcessExit>;
}

/// Trainer launched as a child process:
/// `<program> <args...> --train F --output D --epochs E --batch B`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTrainingProcess {
    program: String,
    args: Vec<String>,
}

impl CommandTrainingProcess {
    pub fn new(command: Vec<String>) -> Result<Self> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .ok_or_else(|| SelfEditError::Config("empty trainer command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn from_config(config: &TrainerConfig) -> Result<Self> {
        Self::new(config.command.clone())
    }

    /// Full argument vector for `job`, program first.
    pub fn command_line(&self, job: &TrainingJob) -> Vec<String> {
        let mut line = Vec::with_capacity(self.args.len() + 9);
        line.push(self.program.clone());
        line.extend(self.args.iter().cloned());
        line.extend([
            "--train".to_string(),
            job.train_file.display().to_string(),
            "--output".to_string(),
            job.output_dir.display().to_string(),
            "--epochs".to_string(),
            job.epochs.to_string(),
            "--batch".to_string(),
            job.batch_size.to_string(),
        ]);
        line
    }
}

#[async_trait]
impl TrainingProcess for CommandTrainingProcess {
    async fn run(&self, job: &TrainingJob) -> Result<ProcessExit> {
        let line = self.command_line(job);
        debug!(command = %line.join(" "), "spawning trainer");

        let output = Command::new(&line[0])
            .args(&line[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(ProcessExit::success());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(ProcessExit::failure(
            output.status.code(),
            tail(&stderr, OUTPUT_TAIL_CHARS),
        ))
    }
}

fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    match text.char_indices().nth(count - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
