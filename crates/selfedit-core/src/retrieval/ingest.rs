//! Ingest path: extract → chunk → embed → upsert.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use selfedit_state::{EmbeddingMeta, EmbeddingRecord, EmbeddingStore};

use crate::collaborators::{Embedder, TextExtractor};
use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::obs;

use super::chunking::chunk_text;

/// What one document contributed to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    pub doc_index: usize,
    pub chunk_ids: Vec<String>,
}

/// Feeds documents into an [`EmbeddingStore`].
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn EmbeddingStore>,
    chunk_max_len: usize,
    id_prefix: String,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn EmbeddingStore>) -> Self {
        Self::from_config(embedder, store, &RetrievalConfig::default())
    }

    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn EmbeddingStore>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            chunk_max_len: config.chunk_max_len,
            id_prefix: config.id_prefix.clone(),
        }
    }

    /// `<prefix><doc>_chunk<seq>`, e.g. `img1_chunk0`.
    pub fn chunk_id(&self, doc_index: usize, seq: usize) -> String {
        format!("{}{doc_index}_chunk{seq}", self.id_prefix)
    }

    fn raw_text_name(&self, doc_index: usize) -> String {
        format!("{}{doc_index}_raw", self.id_prefix)
    }

    /// Chunk, embed and upsert `text`, then keep the raw text next to it.
    ///
    /// Re-ingesting the same `doc_index` overwrites chunks with the same
    /// sequence numbers.
    pub async fn ingest_text(
        &self,
        source: &str,
        doc_index: usize,
        text: &str,
        tags: &[String],
    ) -> Result<IngestReport> {
        let chunks = chunk_text(text, self.chunk_max_len);
        let mut chunk_ids = Vec::with_capacity(chunks.len());

        for (seq, chunk) in chunks.into_iter().enumerate() {
            let embedding = self.embedder.embed(&chunk).await?;
            let id = self.chunk_id(doc_index, seq);
            let mut meta = EmbeddingMeta::new(source, tags.to_vec(), seq);
            meta.extra
                .insert("doc_index".to_string(), Value::from(doc_index));

            self.store
                .upsert(EmbeddingRecord {
                    id: id.clone(),
                    embedding,
                    text: chunk,
                    meta,
                })
                .await?;
            obs::emit_chunk_upserted(&id, source, seq);
            chunk_ids.push(id);
        }

        self.store
            .put_raw_text(&self.raw_text_name(doc_index), text)
            .await?;

        Ok(IngestReport {
            source: source.to_string(),
            doc_index,
            chunk_ids,
        })
    }

    /// Extract the text of the document at `path` and ingest it.
    pub async fn ingest_image(
        &self,
        extractor: &dyn TextExtractor,
        path: &Path,
        doc_index: usize,
        tags: &[String],
    ) -> Result<IngestReport> {
        let text = extractor.extract_text(path).await?;
        self.ingest_text(&path.display().to_string(), doc_index, &text, tags)
            .await
    }
}
