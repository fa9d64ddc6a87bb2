//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryCandidateStore` and `MemoryEmbeddingStore` that satisfy
//! the trait contracts without touching disk or a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{RecordKind, StorageError};
use crate::ranking::{check_dimension, rank_top_k, store_dimension};
use crate::records::{Candidate, CandidateId, EmbeddingRecord, EvaluationResult, RetrievalHit};
use crate::storage_traits::{CandidateStore, EmbeddingStore, StorageResult};

// ---------------------------------------------------------------------------
// MemoryCandidateStore
// ---------------------------------------------------------------------------

/// In-memory candidate store backed by `HashMap<id, record>`.
#[derive(Debug, Default)]
pub struct MemoryCandidateStore {
    candidates: Mutex<HashMap<String, Candidate>>,
    evaluations: Mutex<HashMap<String, EvaluationResult>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn get_candidate(&self, id: &CandidateId) -> StorageResult<Candidate> {
        let candidates = self.candidates.lock().await;
        candidates
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StorageError::not_found(RecordKind::Candidate, id.as_str()))
    }

    async fn put_candidate(&self, candidate: &Candidate) -> StorageResult<()> {
        let mut candidates = self.candidates.lock().await;
        candidates.insert(candidate.id.0.clone(), candidate.clone());
        Ok(())
    }

    async fn list_candidates(&self) -> StorageResult<Vec<Candidate>> {
        let candidates = self.candidates.lock().await;
        Ok(candidates.values().cloned().collect())
    }

    async fn put_evaluation(&self, eval: &EvaluationResult) -> StorageResult<()> {
        let mut evaluations = self.evaluations.lock().await;
        evaluations.insert(eval.candidate_id.0.clone(), eval.clone());
        Ok(())
    }

    async fn get_evaluation(&self, id: &CandidateId) -> StorageResult<EvaluationResult> {
        let evaluations = self.evaluations.lock().await;
        evaluations
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StorageError::not_found(RecordKind::Evaluation, id.as_str()))
    }
}

// ---------------------------------------------------------------------------
// MemoryEmbeddingStore
// ---------------------------------------------------------------------------

/// In-memory embedding store; store order is insertion order.
#[derive(Debug, Default)]
pub struct MemoryEmbeddingStore {
    records: Mutex<Vec<EmbeddingRecord>>,
}

impl MemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn upsert(&self, record: EmbeddingRecord) -> StorageResult<()> {
        let mut records = self.records.lock().await;
        check_dimension(
            store_dimension(records.iter(), Some(&record.id)),
            record.dimension(),
        )?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn query_top_k(&self, query: &[f32], k: usize) -> StorageResult<Vec<RetrievalHit>> {
        let snapshot = self.records.lock().await.clone();
        rank_top_k(snapshot, query, k)
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.records.lock().await.len())
    }
}
