//! Sandboxed training of a generated candidate.
//!
//! The trainer materializes the candidate's examples as a JSONL file,
//! runs the [`TrainingProcess`] under a deadline and a cancellation
//! signal, and records the outcome on the candidate before returning:
//! success moves it to `evaluating`, every failure moves it to `rejected`.

pub mod data;
pub mod process;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use selfedit_state::storage_traits::validate_key;
use selfedit_state::{Candidate, CandidateId, CandidateStatus, CandidateStore, ContentDigest};

use crate::config::TrainerConfig;
use crate::error::{Result, SelfEditError};
use crate::metrics::METRICS;
use crate::obs;

pub use process::{CommandTrainingProcess, ProcessExit, TrainingJob, TrainingProcess};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Create a linked cancel handle and signal.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(Arc::new(tx)), CancelSignal(rx))
}

/// Requests cancellation of every training run holding the paired signal.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Observed by a training run; resolves once cancellation is requested.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        CancelSignal(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait until cancelled. Pends forever if the handle is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SandboxTrainer
// ---------------------------------------------------------------------------

/// Where a successful training run left its data and adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArtifact {
    pub candidate_id: CandidateId,
    pub train_file: PathBuf,
    pub output_dir: PathBuf,
    /// SHA-256 of the training file.
    pub data_digest: ContentDigest,
    pub examples: usize,
    pub duration_ms: u64,
}

enum Failure {
    Failed(String),
    TimedOut,
    Cancelled,
}

/// Drives the external training process for one candidate at a time.
pub struct SandboxTrainer {
    store: Arc<dyn CandidateStore>,
    process: Arc<dyn TrainingProcess>,
    artifacts_dir: PathBuf,
    epochs: u32,
    batch_size: u32,
    timeout: Option<Duration>,
}

impl SandboxTrainer {
    /// Trainer with the default epochs, batch size and deadline.
    pub fn new(
        store: Arc<dyn CandidateStore>,
        process: Arc<dyn TrainingProcess>,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::from_config(store, process, artifacts_dir, &TrainerConfig::default())
    }

    pub fn from_config(
        store: Arc<dyn CandidateStore>,
        process: Arc<dyn TrainingProcess>,
        artifacts_dir: impl Into<PathBuf>,
        config: &TrainerConfig,
    ) -> Self {
        Self {
            store,
            process,
            artifacts_dir: artifacts_dir.into(),
            epochs: config.epochs,
            batch_size: config.batch_size,
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        }
    }

    /// Override the deadline (`None` = unbounded).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn train_file_path(&self, id: &CandidateId) -> PathBuf {
        self.artifacts_dir.join(format!("{id}_train.jsonl"))
    }

    pub fn output_dir(&self, id: &CandidateId) -> PathBuf {
        self.artifacts_dir.join(format!("{id}_lora"))
    }

    /// Train a candidate without external cancellation.
    pub async fn run_sandbox_train(&self, id: &CandidateId) -> Result<TrainingArtifact> {
        self.run_sandbox_train_with_cancel(id, CancelSignal::never())
            .await
    }

    /// Train a `generated` candidate.
    ///
    /// Errors before the process starts (unknown candidate, wrong status,
    /// unwritable training data) leave the candidate untouched. Once the
    /// process has been started, its failure, deadline or cancellation is
    /// persisted as `rejected` before the matching error is returned.
    pub async fn run_sandbox_train_with_cancel(
        &self,
        id: &CandidateId,
        mut cancel: CancelSignal,
    ) -> Result<TrainingArtifact> {
        let mut candidate = self.store.get_candidate(id).await?;
        if !candidate.status.can_advance_to(CandidateStatus::Evaluating) {
            return Err(SelfEditError::InvalidTransition {
                candidate_id: id.clone(),
                from: candidate.status,
                to: CandidateStatus::Evaluating,
            });
        }
        validate_key(id.as_str())?;
        let _span = obs::CandidateSpan::enter(id.as_str());

        tokio::fs::create_dir_all(&self.artifacts_dir).await?;
        let pairs = candidate.training_pairs();
        let train_file = self.train_file_path(id);
        let data_digest = data::write_training_data(&train_file, &pairs).await?;
        let output_dir = self.output_dir(id);
        tokio::fs::create_dir_all(&output_dir).await?;

        let job = TrainingJob {
            candidate_id: id.clone(),
            train_file: train_file.clone(),
            output_dir: output_dir.clone(),
            epochs: self.epochs,
            batch_size: self.batch_size,
        };
        obs::emit_training_started(id.as_str(), &train_file.display().to_string(), pairs.len());

        let start = Instant::now();
        let outcome = tokio::select! {
            res = self.process.run(&job) => match res {
                Ok(exit) if exit.success => Ok(()),
                Ok(exit) => Err(Failure::Failed(exit.describe())),
                Err(e) => Err(Failure::Failed(format!("could not start trainer: {e}"))),
            },
            _ = deadline(self.timeout) => Err(Failure::TimedOut),
            _ = cancel.cancelled() => Err(Failure::Cancelled),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                candidate.status = CandidateStatus::Evaluating;
                self.store.put_candidate(&candidate).await?;
                METRICS.inc_training(true);
                obs::emit_training_finished(id.as_str(), "succeeded", duration_ms);
                info!(candidate_id = %id, "candidate ready for evaluation");

                Ok(TrainingArtifact {
                    candidate_id: id.clone(),
                    train_file,
                    output_dir,
                    data_digest,
                    examples: pairs.len(),
                    duration_ms,
                })
            }
            Err(failure) => {
                let (label, err) = match failure {
                    Failure::Failed(reason) => (
                        "failed",
                        SelfEditError::TrainingFailed {
                            candidate_id: id.clone(),
                            reason,
                        },
                    ),
                    Failure::TimedOut => (
                        "timed_out",
                        SelfEditError::TrainingTimedOut {
                            candidate_id: id.clone(),
                            timeout_secs: self.timeout.map(|t| t.as_secs()).unwrap_or(0),
                        },
                    ),
                    Failure::Cancelled => (
                        "cancelled",
                        SelfEditError::TrainingCancelled {
                            candidate_id: id.clone(),
                        },
                    ),
                };
                METRICS.inc_training(false);
                obs::emit_training_finished(id.as_str(), label, duration_ms);
                self.reject(&mut candidate).await?;
                Err(err)
            }
        }
    }

    async fn reject(&self, candidate: &mut Candidate) -> Result<()> {
        candidate.status = CandidateStatus::Rejected;
        if let Err(e) = self.store.put_candidate(candidate).await {
            obs::emit_persist_error(candidate.id.as_str(), &e);
            return Err(e.into());
        }
        METRICS.inc_decision(CandidateStatus::Rejected);
        Ok(())
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
