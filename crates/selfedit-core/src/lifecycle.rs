//! Candidate state machine and evaluation gating.
//!
//! ```text
//! generated ──► evaluating ──► accepted | human_review | rejected
//!     └──────► rejected
//! ```
//!
//! Training owns the first hop (see [`crate::trainer`]); this module owns
//! the decision hop and the audit artifact written with it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use selfedit_state::{Candidate, CandidateId, CandidateStatus, CandidateStore, EvaluationResult};

use crate::error::{Result, SelfEditError};
use crate::evaluator::Decision;
use crate::metrics::METRICS;
use crate::obs;

/// One line of a candidate listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub status: CandidateStatus,
    pub confidence: f64,
    pub task: String,
    pub created_at: DateTime<Utc>,
    pub examples: usize,
    pub avg: Option<f64>,
}

impl From<&Candidate> for CandidateSummary {
    fn from(c: &Candidate) -> Self {
        Self {
            id: c.id.clone(),
            status: c.status,
            confidence: c.metadata.confidence(),
            task: c.task.clone(),
            created_at: c.created_at,
            examples: c.sft_examples.len(),
            avg: c.eval.as_ref().map(|e| e.avg),
        }
    }
}

impl std::fmt::Display for CandidateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:<12} {:.2} {}",
            self.id, self.status, self.confidence, self.task
        )
    }
}

/// Owns the candidate state transitions driven by evaluation.
pub struct LifecycleManager {
    store: Arc<dyn CandidateStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CandidateStore> {
        &self.store
    }

    pub async fn get_candidate(&self, id: &CandidateId) -> Result<Candidate> {
        Ok(self.store.get_candidate(id).await?)
    }

    /// Every persisted candidate, unfiltered and unsorted.
    pub async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.store.list_candidates().await?)
    }

    /// Summaries of every candidate, oldest first.
    pub async fn summaries(&self) -> Result<Vec<CandidateSummary>> {
        let mut summaries: Vec<CandidateSummary> = self
            .list_candidates()
            .await?
            .iter()
            .map(CandidateSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Record `eval` on the candidate and move it to its terminal status.
    ///
    /// Status priority: `passThreshold` → accepted, `requireHuman` →
    /// human_review, otherwise rejected. The candidate is written first,
    /// then the standalone evaluation artifact.
    ///
    /// The candidate must be `evaluating`. Re-applying the identical result
    /// to a candidate already in the derived status rewrites the same
    /// records and succeeds; any other case is `InvalidTransition`.
    pub async fn attach_evaluation(
        &self,
        id: &CandidateId,
        eval: EvaluationResult,
    ) -> Result<Candidate> {
        if eval.candidate_id != *id {
            return Err(SelfEditError::EvaluationMismatch {
                expected: id.clone(),
                actual: eval.candidate_id,
            });
        }

        let mut candidate = self.store.get_candidate(id).await?;
        let target = Decision::from_flags(eval.pass_threshold, eval.require_human).status();

        let first_decision = match candidate.status {
            current @ CandidateStatus::Evaluating if current.can_advance_to(target) => true,
            current
                if current.is_terminal()
                    && current == target
                    && candidate.eval.as_ref() == Some(&eval) =>
            {
                false
            }
            current => {
                return Err(SelfEditError::InvalidTransition {
                    candidate_id: id.clone(),
                    from: current,
                    to: target,
                })
            }
        };

        let avg = eval.avg;
        candidate.status = target;
        candidate.eval = Some(eval);
        self.store.put_candidate(&candidate).await?;
        if let Some(eval) = &candidate.eval {
            self.store.put_evaluation(eval).await?;
        }

        if first_decision {
            METRICS.inc_decision(target);
            obs::emit_candidate_decided(id.as_str(), target.as_str(), avg);
        }
        Ok(candidate)
    }
}
