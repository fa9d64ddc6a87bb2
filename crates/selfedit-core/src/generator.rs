//! Candidate generation.
//!
//! Each candidate is one independent request to the generation service.
//! The response is decoded against a strict schema; anything that does not
//! fit becomes a fallback candidate carrying the raw text as its plan.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use selfedit_state::{Candidate, CandidateMetadata, CandidateStore, SftExample};

use crate::collaborators::{GenerationService, PromptBuilder};
use crate::error::{Result, SelfEditError};
use crate::metrics::METRICS;
use crate::obs;

/// Return the span from the first `{` to the last `}` of `raw`, if any.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[derive(Debug, Deserialize)]
struct GenerationPayload {
    plan: String,
    examples: Vec<SftExample>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// A generation response that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGeneration {
    pub plan: String,
    pub examples: Vec<SftExample>,
    pub metadata: CandidateMetadata,
}

/// Decode a raw generation response.
///
/// Accepts exactly `{plan, examples: [{input, output, source_chunks?}], metadata?}`.
/// `plan`, `input` and `output` must be non-empty; a present `metadata`
/// must carry a numeric `confidence` in `[0, 1]`.
pub fn parse_generation(raw: &str) -> Result<ParsedGeneration> {
    let span = extract_json_span(raw)
        .ok_or_else(|| SelfEditError::ParseFailure("no JSON object in response".to_string()))?;
    let payload: GenerationPayload =
        serde_json::from_str(span).map_err(|e| SelfEditError::ParseFailure(e.to_string()))?;

    if payload.plan.trim().is_empty() {
        return Err(SelfEditError::ParseFailure("plan is empty".to_string()));
    }
    if let Some(pos) = payload
        .examples
        .iter()
        .position(|ex| ex.input.trim().is_empty() || ex.output.trim().is_empty())
    {
        return Err(SelfEditError::ParseFailure(format!(
            "example {pos} has an empty input or output"
        )));
    }

    let metadata = match payload.metadata {
        None => CandidateMetadata::with_default_confidence(),
        Some(map) => CandidateMetadata::from_map(map).ok_or_else(|| {
            SelfEditError::ParseFailure(
                "metadata.confidence must be a number within [0, 1]".to_string(),
            )
        })?,
    };

    Ok(ParsedGeneration {
        plan: payload.plan,
        examples: payload.examples,
        metadata,
    })
}

/// Produces and persists candidate self-edits for a task.
pub struct CandidateGenerator {
    service: Arc<dyn GenerationService>,
    prompts: Arc<dyn PromptBuilder>,
    store: Arc<dyn CandidateStore>,
}

impl CandidateGenerator {
    pub fn new(
        service: Arc<dyn GenerationService>,
        prompts: Arc<dyn PromptBuilder>,
        store: Arc<dyn CandidateStore>,
    ) -> Self {
        Self {
            service,
            prompts,
            store,
        }
    }

    /// Generate `n` candidates for `task`, one request at a time.
    ///
    /// Each candidate is persisted in `generated` status before the next
    /// request is issued. Unparsable responses become fallback candidates.
    /// A service or storage error stops the batch; candidates persisted
    /// before it remain.
    pub async fn generate_candidates(&self, task: &str, n: usize) -> Result<Vec<Candidate>> {
        let system = self.prompts.planner_system();
        let user = self.prompts.planner_user(task);
        let mut created = Vec::with_capacity(n);

        for attempt in 0..n {
            debug!(task = %task, attempt = attempt, "requesting candidate");
            let raw = self.service.complete(&system, &user).await?;

            let candidate = match parse_generation(&raw) {
                Ok(parsed) => Candidate::new(task, parsed.plan, parsed.examples, parsed.metadata),
                Err(err) => {
                    let candidate =
                        Candidate::new(task, raw.as_str(), Vec::new(), CandidateMetadata::default());
                    obs::emit_generation_fallback(candidate.id.as_str(), &err);
                    METRICS.inc_fallbacks();
                    candidate
                }
            };

            self.store.put_candidate(&candidate).await?;
            METRICS.inc_generated();
            obs::emit_candidate_generated(
                candidate.id.as_str(),
                candidate.sft_examples.len(),
                candidate.metadata.confidence(),
            );
            created.push(candidate);
        }

        Ok(created)
    }
}
