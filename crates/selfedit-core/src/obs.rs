//! Structured observability hooks for candidate lifecycle events.
//!
//! This module provides:
//! - Candidate-scoped tracing spans via the `CandidateSpan` RAII guard
//! - Emission functions for generation, training, evaluation, decision,
//!   retrieval and ingest events
//!
//! Events are emitted at `info!` level unless noted; filter with `RUST_LOG`.

use tracing::{info, warn};

/// RAII guard that enters a candidate-scoped tracing span.
///
/// ```ignore
/// let _span = CandidateSpan::enter("cand-1234");
/// // tracing calls below carry candidate_id = "cand-1234"
/// ```
pub struct CandidateSpan {
    _span: tracing::span::EnteredSpan,
}

impl CandidateSpan {
    pub fn enter(candidate_id: &str) -> Self {
        let span = tracing::info_span!("selfedit.candidate", candidate_id = %candidate_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_candidate_generated(candidate_id: &str, examples: usize, confidence: f64) {
    info!(
        event = "candidate.generated",
        candidate_id = %candidate_id,
        examples = examples,
        confidence = confidence,
    );
}

/// Generation output did not match the schema; a fallback candidate was stored.
pub fn emit_generation_fallback(candidate_id: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "candidate.generation_fallback", candidate_id = %candidate_id, reason = %reason);
}

pub fn emit_training_started(candidate_id: &str, train_file: &str, examples: usize) {
    info!(
        event = "training.started",
        candidate_id = %candidate_id,
        train_file = %train_file,
        examples = examples,
    );
}

/// `outcome` is one of `succeeded`, `failed`, `timed_out`, `cancelled`.
pub fn emit_training_finished(candidate_id: &str, outcome: &str, duration_ms: u64) {
    info!(
        event = "training.finished",
        candidate_id = %candidate_id,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

pub fn emit_evaluation_completed(candidate_id: &str, examples: usize, avg: f64) {
    info!(
        event = "evaluation.completed",
        candidate_id = %candidate_id,
        examples = examples,
        avg = avg,
    );
}

pub fn emit_candidate_decided(candidate_id: &str, status: &str, avg: f64) {
    info!(
        event = "candidate.decided",
        candidate_id = %candidate_id,
        status = %status,
        avg = avg,
    );
}

pub fn emit_retrieval_queried(k: usize, hits: usize, top_score: Option<f64>) {
    info!(
        event = "retrieval.queried",
        k = k,
        hits = hits,
        top_score = top_score,
    );
}

pub fn emit_chunk_upserted(id: &str, source: &str, seq: usize) {
    info!(event = "ingest.chunk_upserted", id = %id, source = %source, seq = seq);
}

/// A candidate failure that could not itself be recorded (warning level).
pub fn emit_persist_error(candidate_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "candidate.persist_error", candidate_id = %candidate_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_and_events_do_not_panic_without_subscriber() {
        let _span = CandidateSpan::enter("cand-test");
        emit_candidate_generated("cand-test", 3, 0.8);
        emit_generation_fallback("cand-test", &"missing plan");
        emit_training_finished("cand-test", "succeeded", 12);
        emit_retrieval_queried(5, 0, None);
    }
}
