//! Query path: embed → top-K → context → generation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use selfedit_state::{EmbeddingMeta, EmbeddingStore, RetrievalHit};

use crate::collaborators::{Embedder, GenerationService, PromptBuilder};
use crate::error::Result;
use crate::generator::extract_json_span;
use crate::metrics::METRICS;
use crate::obs;

/// A retrieved chunk as shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub text: String,
    pub meta: EmbeddingMeta,
    pub score: f64,
}

impl From<RetrievalHit> for ContextSnippet {
    fn from(hit: RetrievalHit) -> Self {
        Self {
            text: hit.record.text,
            meta: hit.record.meta,
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    /// JSON object found in the answer, if it parsed.
    pub self_edit: Option<Value>,
    pub contexts: Vec<ContextSnippet>,
}

/// Render snippets as `[i] (score=0.123) <source> tags=a, b` followed by
/// the chunk text, separated by `---` lines.
pub fn render_context(snippets: &[ContextSnippet]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "[{i}] (score={:.3}) {} tags={}\n{}\n",
                s.score,
                s.meta.source,
                s.meta.tags.join(", "),
                s.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// The JSON object embedded in a free-text answer, if any.
pub fn extract_self_edit(answer: &str) -> Option<Value> {
    let span = extract_json_span(answer)?;
    serde_json::from_str::<Value>(span)
        .ok()
        .filter(Value::is_object)
}

/// Answers questions grounded in the embedding index.
pub struct QueryAgent {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn EmbeddingStore>,
    generator: Arc<dyn GenerationService>,
    prompts: Arc<dyn PromptBuilder>,
}

impl QueryAgent {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn EmbeddingStore>,
        generator: Arc<dyn GenerationService>,
        prompts: Arc<dyn PromptBuilder>,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            prompts,
        }
    }

    /// Embed `query` and return the `k` best-scoring chunks.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.query_top_k(&embedding, k).await?;
        METRICS.inc_retrieval_queries();
        obs::emit_retrieval_queried(k, hits.len(), hits.first().map(|h| h.score));
        Ok(hits)
    }

    /// Answer `query` using up to `max_context` retrieved snippets.
    pub async fn answer(&self, query: &str, max_context: usize) -> Result<QueryAnswer> {
        let contexts: Vec<ContextSnippet> = self
            .retrieve(query, max_context)
            .await?
            .into_iter()
            .map(ContextSnippet::from)
            .collect();

        let system = self.prompts.query_system();
        let user = self.prompts.query_user(query, &render_context(&contexts));
        let answer = self.generator.complete(&system, &user).await?;
        let self_edit = extract_self_edit(&answer);

        Ok(QueryAnswer {
            answer,
            self_edit,
            contexts,
        })
    }
}
