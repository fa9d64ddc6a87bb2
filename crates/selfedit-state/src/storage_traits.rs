//! Storage trait definitions for the self-edit pipeline
//!
//! These traits define the keyed storage abstractions:
//! - `CandidateStore`: candidate records and evaluation artifacts (get/put/list)
//! - `EmbeddingStore`: embedded chunks with nearest-neighbour queries
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.
//!
//! Writes overwrite whole records. Two writers doing read-modify-write on
//! the same candidate id can lose an update; backends add no locking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;
use crate::records::{
    Candidate, CandidateId, EmbeddingRecord, EvaluationResult, RetrievalHit,
};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CandidateStore
// ---------------------------------------------------------------------------

/// Keyed persistence for candidates and their evaluation artifacts.
///
/// Guarantees:
/// - `put_candidate` stores or fully overwrites the record under its id.
/// - `get_candidate` returns `StorageError::NotFound` for unknown ids.
/// - `list_candidates` returns every stored candidate, unfiltered and in
///   no particular order.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Load a candidate by id.
    async fn get_candidate(&self, id: &CandidateId) -> StorageResult<Candidate>;

    /// Store or overwrite a candidate.
    async fn put_candidate(&self, candidate: &Candidate) -> StorageResult<()>;

    /// Enumerate all candidates.
    async fn list_candidates(&self) -> StorageResult<Vec<Candidate>>;

    /// Store the standalone evaluation artifact, keyed by its candidate id.
    async fn put_evaluation(&self, eval: &EvaluationResult) -> StorageResult<()>;

    /// Load the evaluation artifact of a candidate.
    async fn get_evaluation(&self, id: &CandidateId) -> StorageResult<EvaluationResult>;
}

// ---------------------------------------------------------------------------
// EmbeddingStore
// ---------------------------------------------------------------------------

/// Embedded text chunks with brute-force nearest-neighbour search.
///
/// Guarantees:
/// - `upsert` is idempotent by id; an overwrite keeps the record's position.
/// - All records share one dimensionality; `upsert` and `query_top_k`
///   reject mismatches with `StorageError::DimensionMismatch`.
/// - `query_top_k` scores by raw dot product (callers pre-normalise for
///   cosine), returns at most `k` hits in non-increasing score order with
///   ties in store order, and returns an empty vec for an empty store.
/// - Every query rescans the full contents, so writes are visible to the
///   next query.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Store or overwrite a record by id.
    async fn upsert(&self, record: EmbeddingRecord) -> StorageResult<()>;

    /// Return up to `k` records ranked by dot product with `query`.
    async fn query_top_k(&self, query: &[f32], k: usize) -> StorageResult<Vec<RetrievalHit>>;

    /// Number of stored records.
    async fn count(&self) -> StorageResult<usize>;

    /// Keep the raw source text of an ingested document next to its chunks.
    ///
    /// Backends without a place for raw text ignore it.
    async fn put_raw_text(&self, _name: &str, _text: &str) -> StorageResult<()> {
        Ok(())
    }
}

/// Reject keys that cannot be used as a file name or record key.
pub fn validate_key(id: &str) -> StorageResult<()> {
    let reason = if id.is_empty() {
        Some("empty id")
    } else if id.contains('/') || id.contains('\\') {
        Some("id contains a path separator")
    } else if id == "." || id == ".." {
        Some("id is a relative path component")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StorageError::InvalidRecord {
            id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_sha256_hex() {
        let d = ContentDigest::from_bytes(b"hello world");
        assert_eq!(
            d.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(d.short(), "b94d27b9934d");
    }

    #[test]
    fn validate_key_rejects_paths() {
        assert!(validate_key("cand-123").is_ok());
        assert!(validate_key("img1_chunk0").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("..").is_err());
    }
}
