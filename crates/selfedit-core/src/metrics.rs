//! Global atomic counters for the self-edit lifecycle.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a pipeline run).

use std::sync::atomic::{AtomicU64, Ordering};

use selfedit_state::CandidateStatus;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    candidates_generated: AtomicU64,
    generation_fallbacks: AtomicU64,
    trainings_succeeded: AtomicU64,
    trainings_failed: AtomicU64,
    evaluations: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    human_review: AtomicU64,
    retrieval_queries: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            candidates_generated: AtomicU64::new(0),
            generation_fallbacks: AtomicU64::new(0),
            trainings_succeeded: AtomicU64::new(0),
            trainings_failed: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            human_review: AtomicU64::new(0),
            retrieval_queries: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_generated(&self) {
        Self::bump(&self.candidates_generated, "candidates_generated");
    }

    pub fn inc_fallbacks(&self) {
        Self::bump(&self.generation_fallbacks, "generation_fallbacks");
    }

    pub fn inc_training(&self, succeeded: bool) {
        if succeeded {
            Self::bump(&self.trainings_succeeded, "trainings_succeeded");
        } else {
            Self::bump(&self.trainings_failed, "trainings_failed");
        }
    }

    pub fn inc_evaluations(&self) {
        Self::bump(&self.evaluations, "evaluations");
    }

    /// Count a terminal decision. Non-terminal statuses are ignored.
    pub fn inc_decision(&self, status: CandidateStatus) {
        match status {
            CandidateStatus::Accepted => Self::bump(&self.accepted, "accepted"),
            CandidateStatus::Rejected => Self::bump(&self.rejected, "rejected"),
            CandidateStatus::HumanReview => Self::bump(&self.human_review, "human_review"),
            CandidateStatus::Generated | CandidateStatus::Evaluating => {}
        }
    }

    pub fn inc_retrieval_queries(&self) {
        Self::bump(&self.retrieval_queries, "retrieval_queries");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            candidates_generated = self.candidates_generated(),
            generation_fallbacks = self.generation_fallbacks(),
            trainings_succeeded = self.trainings_succeeded(),
            trainings_failed = self.trainings_failed(),
            evaluations = self.evaluations(),
            accepted = self.accepted(),
            rejected = self.rejected(),
            human_review = self.human_review(),
            retrieval_queries = self.retrieval_queries(),
        );
    }

    pub fn candidates_generated(&self) -> u64 {
        self.candidates_generated.load(Ordering::Relaxed)
    }

    pub fn generation_fallbacks(&self) -> u64 {
        self.generation_fallbacks.load(Ordering::Relaxed)
    }

    pub fn trainings_succeeded(&self) -> u64 {
        self.trainings_succeeded.load(Ordering::Relaxed)
    }

    pub fn trainings_failed(&self) -> u64 {
        self.trainings_failed.load(Ordering::Relaxed)
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn human_review(&self) -> u64 {
        self.human_review.load(Ordering::Relaxed)
    }

    pub fn retrieval_queries(&self) -> u64 {
        self.retrieval_queries.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_counters_increment() {
        let m = Metrics::new();
        m.inc_generated();
        m.inc_generated();
        m.inc_training(true);
        m.inc_training(false);
        m.inc_decision(CandidateStatus::HumanReview);
        m.inc_decision(CandidateStatus::Evaluating);

        assert_eq!(m.candidates_generated(), 2);
        assert_eq!(m.trainings_succeeded(), 1);
        assert_eq!(m.trainings_failed(), 1);
        assert_eq!(m.human_review(), 1);
        assert_eq!(m.accepted(), 0);
        m.flush();
    }
}
