//! SurrealDB-backed `CandidateStore`.
//!
//! Each row keeps the candidate id and status as indexed columns next to
//! the full JSON document, so the record shape stays identical to the
//! filesystem backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{RecordKind, StorageError};
use crate::migrations;
use crate::records::{Candidate, CandidateId, EvaluationResult};
use crate::storage_traits::{CandidateStore, StorageResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CandidateRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<surrealdb::sql::Thing>,
    candidate_id: String,
    status: String,
    payload: String,
}

impl CandidateRow {
    fn from_candidate(candidate: &Candidate) -> StorageResult<Self> {
        Ok(Self {
            id: None,
            candidate_id: candidate.id.0.clone(),
            status: candidate.status.as_str().to_string(),
            payload: serde_json::to_string(candidate)?,
        })
    }

    fn into_candidate(self) -> StorageResult<Candidate> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EvaluationRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<surrealdb::sql::Thing>,
    candidate_id: String,
    payload: String,
}

/// SurrealDB-backed implementation of [`CandidateStore`].
pub struct SurrealCandidateStore {
    db: Surreal<Any>,
}

impl SurrealCandidateStore {
    /// In-memory instance (`mem://`), mainly for tests.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`, `ws://host`),
    /// select `selfedit/main` and run `init_schema`.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Connection(format!("failed to connect to {url}: {e}")))?;

        db.use_ns("selfedit")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealCandidateStore connected ({})", url);
        Ok(Self { db })
    }

    async fn fetch_candidate_row(&self, cid: &str) -> StorageResult<Option<CandidateRow>> {
        let cid_owned = cid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM candidates WHERE candidate_id = $cid")
            .bind(("cid", cid_owned))
            .await?;
        let rows: Vec<CandidateRow> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_evaluation_row(&self, cid: &str) -> StorageResult<Option<EvaluationRow>> {
        let cid_owned = cid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM evaluations WHERE candidate_id = $cid")
            .bind(("cid", cid_owned))
            .await?;
        let rows: Vec<EvaluationRow> = res.take(0)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl CandidateStore for SurrealCandidateStore {
    async fn get_candidate(&self, id: &CandidateId) -> StorageResult<Candidate> {
        self.fetch_candidate_row(id.as_str())
            .await?
            .ok_or_else(|| StorageError::not_found(RecordKind::Candidate, id.as_str()))?
            .into_candidate()
    }

    async fn put_candidate(&self, candidate: &Candidate) -> StorageResult<()> {
        let row = CandidateRow::from_candidate(candidate)?;
        debug!(candidate_id = %candidate.id, status = %candidate.status, "writing candidate");

        if self.fetch_candidate_row(&row.candidate_id).await?.is_some() {
            let cid_owned = row.candidate_id.clone();
            self.db
                .query("UPDATE candidates CONTENT $row WHERE candidate_id = $cid")
                .bind(("row", row))
                .bind(("cid", cid_owned))
                .await?;
        } else {
            let _created: Option<CandidateRow> =
                self.db.create("candidates").content(row).await?;
        }
        Ok(())
    }

    async fn list_candidates(&self) -> StorageResult<Vec<Candidate>> {
        let mut res = self.db.query("SELECT * FROM candidates").await?;
        let rows: Vec<CandidateRow> = res.take(0)?;
        rows.into_iter().map(CandidateRow::into_candidate).collect()
    }

    async fn put_evaluation(&self, eval: &EvaluationResult) -> StorageResult<()> {
        let row = EvaluationRow {
            id: None,
            candidate_id: eval.candidate_id.0.clone(),
            payload: serde_json::to_string(eval)?,
        };

        if self.fetch_evaluation_row(&row.candidate_id).await?.is_some() {
            let cid_owned = row.candidate_id.clone();
            self.db
                .query("UPDATE evaluations CONTENT $row WHERE candidate_id = $cid")
                .bind(("row", row))
                .bind(("cid", cid_owned))
                .await?;
        } else {
            let _created: Option<EvaluationRow> =
                self.db.create("evaluations").content(row).await?;
        }
        Ok(())
    }

    async fn get_evaluation(&self, id: &CandidateId) -> StorageResult<EvaluationResult> {
        let row = self
            .fetch_evaluation_row(id.as_str())
            .await?
            .ok_or_else(|| StorageError::not_found(RecordKind::Evaluation, id.as_str()))?;
        Ok(serde_json::from_str(&row.payload)?)
    }
}
