//! Error types for selfedit-state

use thiserror::Error;

/// The kind of record a storage error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Candidate,
    Evaluation,
    Embedding,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Candidate => write!(f, "candidate"),
            RecordKind::Evaluation => write!(f, "evaluation"),
            RecordKind::Embedding => write!(f, "embedding"),
        }
    }
}

/// Errors produced by the storage traits and their backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// Embedding dimensionality differs from what the store already holds
    #[error("embedding dimension mismatch: store holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Record key or payload cannot be stored
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// Backend connection could not be established
    #[error("connection failed: {0}")]
    Connection(String),

    /// Backend query or write failed
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this error means the record is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Backend(format!("blocking task failed: {err}"))
    }
}
