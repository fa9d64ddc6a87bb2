//! Evaluation of a trained candidate against the validation set.

pub mod scoring;
pub mod validation;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use selfedit_state::{CandidateId, EvaluationResult, ExampleScore, ValidationExample};

use crate::collaborators::{PromptBuilder, ResponseService};
use crate::config::EvaluatorConfig;
use crate::error::{Result, SelfEditError};
use crate::metrics::METRICS;
use crate::obs;

pub use scoring::{jaccard, Decision, DecisionThresholds};
pub use validation::load_validation_set;

/// Scores an adapted model's answers against reference completions.
pub struct Evaluator {
    responder: Arc<dyn ResponseService>,
    prompts: Arc<dyn PromptBuilder>,
    validation_path: PathBuf,
    thresholds: DecisionThresholds,
}

impl Evaluator {
    pub fn new(
        responder: Arc<dyn ResponseService>,
        prompts: Arc<dyn PromptBuilder>,
        validation_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            responder,
            prompts,
            validation_path: validation_path.into(),
            thresholds: DecisionThresholds::default(),
        }
    }

    pub fn from_config(
        responder: Arc<dyn ResponseService>,
        prompts: Arc<dyn PromptBuilder>,
        config: &EvaluatorConfig,
    ) -> Self {
        Self::new(responder, prompts, config.validation_path.clone()).with_thresholds(
            DecisionThresholds {
                pass: config.pass_threshold,
                review: config.review_threshold,
            },
        )
    }

    pub fn with_thresholds(mut self, thresholds: DecisionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_validation_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.validation_path = path.into();
        self
    }

    pub fn validation_path(&self) -> &Path {
        &self.validation_path
    }

    pub fn thresholds(&self) -> DecisionThresholds {
        self.thresholds
    }

    /// Evaluate the artifact at `artifact` using the configured validation file.
    ///
    /// Returns `EmptyValidationSet` without calling the responder when the
    /// file is missing or holds no examples.
    pub async fn evaluate(
        &self,
        artifact: &Path,
        candidate_id: &CandidateId,
    ) -> Result<EvaluationResult> {
        let examples = load_validation_set(&self.validation_path).await?;
        if examples.is_empty() {
            return Err(SelfEditError::EmptyValidationSet {
                path: self.validation_path.display().to_string(),
            });
        }
        self.evaluate_examples(artifact, candidate_id, &examples)
            .await
    }

    /// Evaluate against an in-memory validation set.
    pub async fn evaluate_examples(
        &self,
        artifact: &Path,
        candidate_id: &CandidateId,
        examples: &[ValidationExample],
    ) -> Result<EvaluationResult> {
        if examples.is_empty() {
            return Err(SelfEditError::EmptyValidationSet {
                path: "<in-memory>".to_string(),
            });
        }
        let _span = obs::CandidateSpan::enter(candidate_id.as_str());

        let mut results = Vec::with_capacity(examples.len());
        for example in examples {
            let prompt = self.prompts.validation_prompt(&example.prompt);
            let got = self.responder.respond(artifact, &prompt).await?;
            let score = jaccard(&got, &example.completion);
            debug!(prompt = %example.prompt, score = score, "scored validation example");
            results.push(ExampleScore {
                prompt: example.prompt.clone(),
                expected: example.completion.clone(),
                got,
                score,
            });
        }

        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        let avg = scoring::mean(&scores);
        let (pass_threshold, require_human) = self.thresholds.decide(avg).flags();

        METRICS.inc_evaluations();
        obs::emit_evaluation_completed(candidate_id.as_str(), results.len(), avg);

        Ok(EvaluationResult {
            candidate_id: candidate_id.clone(),
            avg,
            pass_threshold,
            require_human,
            results,
        })
    }
}
