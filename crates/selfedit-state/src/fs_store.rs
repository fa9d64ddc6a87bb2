//! Filesystem-backed stores: one pretty-printed JSON file per record.
//!
//! Layout:
//! - candidates: `<candidates_dir>/<id>.json`
//! - evaluation artifacts: `<artifacts_dir>/<id>_eval.json`
//! - embeddings: `<store_dir>/<id>.json` (raw ingest text as `<name>.txt`)
//!
//! Writes go through a temp file in the target directory followed by a
//! rename, so a crash never leaves a half-written record behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{RecordKind, StorageError};
use crate::ranking::{check_dimension, rank_top_k, store_dimension};
use crate::records::{Candidate, CandidateId, EmbeddingRecord, EvaluationResult, RetrievalHit};
use crate::storage_traits::{validate_key, CandidateStore, EmbeddingStore, StorageResult};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let dir = path.parent().ok_or_else(|| StorageError::InvalidRecord {
        id: path.display().to_string(),
        reason: "path has no parent directory".to_string(),
    })?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn write_json<T: Serialize>(path: PathBuf, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes)).await?
}

async fn read_json<T: DeserializeOwned>(
    path: &Path,
    kind: RecordKind,
    id: &str,
) -> StorageResult<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StorageError::not_found(kind, id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Read every `*.json` file of `dir` in file-name order. A missing directory is empty.
async fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> StorageResult<Vec<T>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(&path).await?;
        records.push(serde_json::from_slice(&bytes)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// FsCandidateStore
// ---------------------------------------------------------------------------

/// Candidate store keeping one JSON document per candidate.
#[derive(Debug, Clone)]
pub struct FsCandidateStore {
    candidates_dir: PathBuf,
    artifacts_dir: PathBuf,
}

impl FsCandidateStore {
    /// Create the store, creating both directories if needed.
    pub fn new(
        candidates_dir: impl AsRef<Path>,
        artifacts_dir: impl AsRef<Path>,
    ) -> StorageResult<Self> {
        let candidates_dir = candidates_dir.as_ref().to_path_buf();
        let artifacts_dir = artifacts_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&candidates_dir)?;
        std::fs::create_dir_all(&artifacts_dir)?;
        Ok(Self {
            candidates_dir,
            artifacts_dir,
        })
    }

    fn candidate_path(&self, id: &CandidateId) -> StorageResult<PathBuf> {
        validate_key(id.as_str())?;
        Ok(self.candidates_dir.join(format!("{id}.json")))
    }

    /// Location of the standalone evaluation artifact of `id`.
    pub fn evaluation_path(&self, id: &CandidateId) -> StorageResult<PathBuf> {
        validate_key(id.as_str())?;
        Ok(self.artifacts_dir.join(format!("{id}_eval.json")))
    }
}

#[async_trait]
impl CandidateStore for FsCandidateStore {
    async fn get_candidate(&self, id: &CandidateId) -> StorageResult<Candidate> {
        let path = self.candidate_path(id)?;
        read_json(&path, RecordKind::Candidate, id.as_str()).await
    }

    async fn put_candidate(&self, candidate: &Candidate) -> StorageResult<()> {
        let path = self.candidate_path(&candidate.id)?;
        debug!(candidate_id = %candidate.id, status = %candidate.status, "writing candidate");
        write_json(path, candidate).await
    }

    async fn list_candidates(&self) -> StorageResult<Vec<Candidate>> {
        read_json_dir(&self.candidates_dir).await
    }

    async fn put_evaluation(&self, eval: &EvaluationResult) -> StorageResult<()> {
        let path = self.evaluation_path(&eval.candidate_id)?;
        write_json(path, eval).await
    }

    async fn get_evaluation(&self, id: &CandidateId) -> StorageResult<EvaluationResult> {
        let path = self.evaluation_path(id)?;
        read_json(&path, RecordKind::Evaluation, id.as_str()).await
    }
}

// ---------------------------------------------------------------------------
// FsEmbeddingStore
// ---------------------------------------------------------------------------

/// Embedding store keeping one JSON document per chunk.
///
/// Store order (for tie-breaking) is file-name order. Every query reloads
/// the whole directory.
#[derive(Debug, Clone)]
pub struct FsEmbeddingStore {
    dir: PathBuf,
}

impl FsEmbeddingStore {
    pub fn new(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    async fn load_all(&self) -> StorageResult<Vec<EmbeddingRecord>> {
        read_json_dir(&self.dir).await
    }
}

#[async_trait]
impl EmbeddingStore for FsEmbeddingStore {
    async fn upsert(&self, record: EmbeddingRecord) -> StorageResult<()> {
        validate_key(&record.id)?;
        let existing = self.load_all().await?;
        check_dimension(
            store_dimension(&existing, Some(&record.id)),
            record.dimension(),
        )?;

        let path = self.dir.join(format!("{}.json", record.id));
        debug!(id = %record.id, dim = record.dimension(), "upserting embedding");
        write_json(path, &record).await
    }

    async fn query_top_k(&self, query: &[f32], k: usize) -> StorageResult<Vec<RetrievalHit>> {
        let records = self.load_all().await?;
        rank_top_k(records, query, k)
    }

    async fn count(&self) -> StorageResult<usize> {
        Ok(self.load_all().await?.len())
    }

    async fn put_raw_text(&self, name: &str, text: &str) -> StorageResult<()> {
        validate_key(name)?;
        let path = self.dir.join(format!("{name}.txt"));
        let bytes = text.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes)).await?
    }
}
