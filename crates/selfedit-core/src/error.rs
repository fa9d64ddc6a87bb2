//! Error taxonomy for the self-edit lifecycle.

use selfedit_state::{CandidateId, CandidateStatus, RecordKind, StorageError};

/// Self-edit lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SelfEditError {
    #[error("candidate not found: {0}")]
    CandidateNotFound(CandidateId),

    /// Generation output could not be decoded. Recovered by the generator.
    #[error("unparsable generation output: {0}")]
    ParseFailure(String),

    #[error("training failed for {candidate_id}: {reason}")]
    TrainingFailed {
        candidate_id: CandidateId,
        reason: String,
    },

    #[error("training for {candidate_id} timed out after {timeout_secs}s")]
    TrainingTimedOut {
        candidate_id: CandidateId,
        timeout_secs: u64,
    },

    #[error("training for {candidate_id} was cancelled")]
    TrainingCancelled { candidate_id: CandidateId },

    #[error("validation set is empty: {path}")]
    EmptyValidationSet { path: String },

    #[error("invalid transition for {candidate_id}: {from} -> {to}")]
    InvalidTransition {
        candidate_id: CandidateId,
        from: CandidateStatus,
        to: CandidateStatus,
    },

    #[error("evaluation for {actual} cannot be attached to {expected}")]
    EvaluationMismatch {
        expected: CandidateId,
        actual: CandidateId,
    },

    #[error("storage error: {0}")]
    Persistence(StorageError),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl SelfEditError {
    pub fn collaborator(err: impl std::fmt::Display) -> Self {
        SelfEditError::Collaborator(err.to_string())
    }
}

impl From<StorageError> for SelfEditError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound {
                kind: RecordKind::Candidate,
                id,
            } => SelfEditError::CandidateNotFound(CandidateId(id)),
            other => SelfEditError::Persistence(other),
        }
    }
}

/// Result type for self-edit operations.
pub type Result<T> = std::result::Result<T, SelfEditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_candidate_maps_to_candidate_not_found() {
        let err: SelfEditError = StorageError::not_found(RecordKind::Candidate, "cand-1").into();
        assert!(matches!(err, SelfEditError::CandidateNotFound(ref id) if id.as_str() == "cand-1"));
    }

    #[test]
    fn other_storage_errors_stay_persistence() {
        let err: SelfEditError = StorageError::not_found(RecordKind::Evaluation, "cand-1").into();
        assert!(matches!(err, SelfEditError::Persistence(_)));

        let err: SelfEditError = StorageError::DimensionMismatch {
            expected: 2,
            actual: 3,
        }
        .into();
        assert!(matches!(err, SelfEditError::Persistence(_)));
    }

    #[test]
    fn transition_error_display() {
        let err = SelfEditError::InvalidTransition {
            candidate_id: CandidateId::from("cand-9"),
            from: CandidateStatus::Accepted,
            to: CandidateStatus::Evaluating,
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for cand-9: accepted -> evaluating"
        );
    }
}
