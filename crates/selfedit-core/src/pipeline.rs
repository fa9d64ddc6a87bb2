//! End-to-end pipeline: generate → train → evaluate → decide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use selfedit_state::{Candidate, CandidateId, CandidateStatus};

use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::generator::CandidateGenerator;
use crate::lifecycle::LifecycleManager;
use crate::metrics::METRICS;
use crate::trainer::{CancelSignal, SandboxTrainer};

/// Where one candidate ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOutcome {
    pub candidate_id: CandidateId,
    pub status: CandidateStatus,
    pub avg: Option<f64>,
    /// Set when the candidate did not reach a decision normally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CandidateOutcome>,
}

impl PipelineReport {
    pub fn count(&self, status: CandidateStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// Runs every generated candidate through training, evaluation and gating.
pub struct SelfEditPipeline {
    generator: CandidateGenerator,
    trainer: SandboxTrainer,
    evaluator: Evaluator,
    lifecycle: LifecycleManager,
}

impl SelfEditPipeline {
    pub fn new(
        generator: CandidateGenerator,
        trainer: SandboxTrainer,
        evaluator: Evaluator,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            generator,
            trainer,
            evaluator,
            lifecycle,
        }
    }

    pub async fn run(&self, task: &str, n: usize) -> Result<PipelineReport> {
        self.run_with_cancel(task, n, CancelSignal::never()).await
    }

    /// Generate `n` candidates and process each one.
    ///
    /// A generation error aborts the run. A failure of one candidate is
    /// recorded in its outcome and does not stop the others. Once `cancel`
    /// fires, the running training is stopped and remaining candidates stay
    /// `generated`.
    pub async fn run_with_cancel(
        &self,
        task: &str,
        n: usize,
        cancel: CancelSignal,
    ) -> Result<PipelineReport> {
        let started_at = Utc::now();
        let candidates = self.generator.generate_candidates(task, n).await?;

        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if cancel.is_cancelled() {
                outcomes.push(CandidateOutcome {
                    candidate_id: candidate.id,
                    status: candidate.status,
                    avg: None,
                    error: Some("pipeline cancelled".to_string()),
                });
                continue;
            }

            let outcome = match self.process_candidate(&candidate.id, cancel.clone()).await {
                Ok(done) => CandidateOutcome {
                    candidate_id: done.id,
                    status: done.status,
                    avg: done.eval.map(|e| e.avg),
                    error: None,
                },
                Err(err) => {
                    warn!(candidate_id = %candidate.id, error = %err, "candidate did not complete");
                    let status = match self.lifecycle.get_candidate(&candidate.id).await {
                        Ok(current) => current.status,
                        Err(_) => candidate.status,
                    };
                    CandidateOutcome {
                        candidate_id: candidate.id,
                        status,
                        avg: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        METRICS.flush();
        Ok(PipelineReport {
            task: task.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        })
    }

    /// Train, evaluate and decide one `generated` candidate.
    pub async fn process_candidate(
        &self,
        id: &CandidateId,
        cancel: CancelSignal,
    ) -> Result<Candidate> {
        let artifact = self.trainer.run_sandbox_train_with_cancel(id, cancel).await?;
        let eval = self.evaluator.evaluate(&artifact.output_dir, id).await?;
        self.lifecycle.attach_evaluation(id, eval).await
    }
}
