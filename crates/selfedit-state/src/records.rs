//! Record shapes persisted by the self-edit stores.
//!
//! - `Candidate`: one self-edit proposal tracked through its lifecycle
//! - `EvaluationResult`: the audit artifact of one evaluation run
//! - `EmbeddingRecord`: one embedded text chunk of the retrieval index
//!
//! Field names are part of the on-disk format. Candidate records use
//! snake_case keys, evaluation artifacts use camelCase keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// Globally unique candidate identifier (`cand-<uuid v4>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    /// Generate a fresh candidate id.
    pub fn new() -> Self {
        CandidateId(format!("cand-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for CandidateId {
    fn from(s: String) -> Self {
        CandidateId(s)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        CandidateId(s.to_string())
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a candidate.
///
/// Transitions: `generated → evaluating | rejected`, then
/// `evaluating → accepted | human_review | rejected`. The last three are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Generated,
    Evaluating,
    Accepted,
    Rejected,
    HumanReview,
}

impl CandidateStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CandidateStatus::Accepted | CandidateStatus::Rejected | CandidateStatus::HumanReview
        )
    }

    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_advance_to(&self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;
        matches!(
            (self, next),
            (Generated, Evaluating)
                | (Generated, Rejected)
                | (Evaluating, Accepted)
                | (Evaluating, HumanReview)
                | (Evaluating, Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Generated => "generated",
            CandidateStatus::Evaluating => "evaluating",
            CandidateStatus::Accepted => "accepted",
            CandidateStatus::Rejected => "rejected",
            CandidateStatus::HumanReview => "human_review",
        }
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A supervised fine-tuning pair with provenance links into the embedding store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SftExample {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub source_chunks: Vec<String>,
}

/// Open key/value metadata attached to a candidate.
///
/// Always carries a numeric `confidence` when built through
/// [`CandidateMetadata::with_default_confidence`] or
/// [`CandidateMetadata::from_map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateMetadata(Map<String, Value>);

impl CandidateMetadata {
    /// Confidence assigned when the generator could not supply one.
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;

    /// Metadata holding only `{"confidence": 0.5}`.
    pub fn with_default_confidence() -> Self {
        let mut map = Map::new();
        map.insert(
            "confidence".to_string(),
            Value::from(Self::DEFAULT_CONFIDENCE),
        );
        CandidateMetadata(map)
    }

    /// Accept a map only if it carries a numeric `confidence` in `[0, 1]`.
    pub fn from_map(map: Map<String, Value>) -> Option<Self> {
        let confidence = map.get("confidence")?.as_f64()?;
        if !(0.0..=1.0).contains(&confidence) {
            return None;
        }
        Some(CandidateMetadata(map))
    }

    /// The candidate's confidence, falling back to the default for legacy records.
    pub fn confidence(&self) -> f64 {
        self.0
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(Self::DEFAULT_CONFIDENCE)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl Default for CandidateMetadata {
    fn default() -> Self {
        Self::with_default_confidence()
    }
}

/// A persisted self-edit proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub created_at: DateTime<Utc>,
    pub task: String,
    pub plan: String,
    pub sft_examples: Vec<SftExample>,
    pub metadata: CandidateMetadata,
    pub status: CandidateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<EvaluationResult>,
}

impl Candidate {
    /// Create a fresh candidate in `generated` status.
    pub fn new(
        task: impl Into<String>,
        plan: impl Into<String>,
        sft_examples: Vec<SftExample>,
        metadata: CandidateMetadata,
    ) -> Self {
        Self {
            id: CandidateId::new(),
            created_at: Utc::now(),
            task: task.into(),
            plan: plan.into(),
            sft_examples,
            metadata,
            status: CandidateStatus::Generated,
            eval: None,
        }
    }

    /// The candidate's examples as prompt/completion training pairs.
    pub fn training_pairs(&self) -> Vec<TrainingPair> {
        self.sft_examples
            .iter()
            .map(|ex| TrainingPair {
                prompt: ex.input.clone(),
                completion: ex.output.clone(),
            })
            .collect()
    }
}

/// One line of the training file handed to the training process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub prompt: String,
    pub completion: String,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Reference prompt/completion pair from the validation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationExample {
    pub prompt: String,
    pub completion: String,
}

/// Per-example score kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleScore {
    pub prompt: String,
    pub expected: String,
    pub got: String,
    pub score: f64,
}

/// Outcome of evaluating one trained candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub candidate_id: CandidateId,
    pub avg: f64,
    pub pass_threshold: bool,
    pub require_human: bool,
    pub results: Vec<ExampleScore>,
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Provenance of an embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMeta {
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub seq: usize,
    /// Any further keys supplied at ingest time.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmbeddingMeta {
    pub fn new(source: impl Into<String>, tags: Vec<String>, seq: usize) -> Self {
        Self {
            source: source.into(),
            tags,
            seq,
            extra: Map::new(),
        }
    }
}

/// One embedded text chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub meta: EmbeddingMeta,
}

impl EmbeddingRecord {
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// A record returned from a nearest-neighbour query with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub record: EmbeddingRecord,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidate_id_has_prefix_and_is_unique() {
        let a = CandidateId::new();
        let b = CandidateId::new();
        assert!(a.as_str().starts_with("cand-"));
        assert_ne!(a, b);
    }

    #[test]
    fn status_transitions_only_move_forward() {
        use CandidateStatus::*;
        assert!(Generated.can_advance_to(Evaluating));
        assert!(Generated.can_advance_to(Rejected));
        assert!(!Generated.can_advance_to(Accepted));
        assert!(Evaluating.can_advance_to(HumanReview));
        assert!(!Evaluating.can_advance_to(Generated));
        for terminal in [Accepted, Rejected, HumanReview] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_advance_to(Evaluating));
            assert!(!terminal.can_advance_to(Generated));
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let raw = serde_json::to_value(CandidateStatus::HumanReview).unwrap();
        assert_eq!(raw, json!("human_review"));
    }

    #[test]
    fn metadata_requires_numeric_confidence_in_range() {
        let ok = json!({"confidence": 0.8, "approx_tokens": 120});
        let md = CandidateMetadata::from_map(ok.as_object().unwrap().clone()).unwrap();
        assert_eq!(md.confidence(), 0.8);
        assert_eq!(md.get("approx_tokens"), Some(&json!(120)));

        let missing = json!({"approx_tokens": 120});
        assert!(CandidateMetadata::from_map(missing.as_object().unwrap().clone()).is_none());

        let textual = json!({"confidence": "high"});
        assert!(CandidateMetadata::from_map(textual.as_object().unwrap().clone()).is_none());

        let out_of_range = json!({"confidence": 1.5});
        assert!(CandidateMetadata::from_map(out_of_range.as_object().unwrap().clone()).is_none());
    }

    #[test]
    fn candidate_record_uses_snake_case_and_omits_missing_eval() {
        let cand = Candidate::new(
            "task",
            "plan",
            vec![SftExample {
                input: "q".into(),
                output: "a".into(),
                source_chunks: vec!["img1_chunk0".into()],
            }],
            CandidateMetadata::with_default_confidence(),
        );
        let raw = serde_json::to_value(&cand).unwrap();
        let obj = raw.as_object().unwrap();
        assert!(obj.contains_key("created_at"));
        assert!(obj.contains_key("sft_examples"));
        assert!(!obj.contains_key("eval"));
        assert_eq!(raw["status"], json!("generated"));
        assert_eq!(raw["metadata"]["confidence"], json!(0.5));
    }

    #[test]
    fn evaluation_result_uses_camel_case() {
        let eval = EvaluationResult {
            candidate_id: CandidateId::from("cand-1"),
            avg: 0.6,
            pass_threshold: true,
            require_human: false,
            results: vec![],
        };
        let raw = serde_json::to_value(&eval).unwrap();
        assert_eq!(raw["candidateId"], json!("cand-1"));
        assert_eq!(raw["passThreshold"], json!(true));
        assert_eq!(raw["requireHuman"], json!(false));
    }

    #[test]
    fn embedding_meta_keeps_extra_keys() {
        let raw = json!({
            "id": "img1_chunk0",
            "embedding": [0.1, 0.2],
            "text": "hello",
            "meta": {"source": "a.png", "imageId": 1, "seq": 0, "tags": ["SEAL"]}
        });
        let rec: EmbeddingRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(rec.dimension(), 2);
        assert_eq!(rec.meta.tags, vec!["SEAL"]);
        assert_eq!(rec.meta.extra.get("imageId"), Some(&json!(1)));
    }

    #[test]
    fn training_pairs_map_input_output() {
        let cand = Candidate::new(
            "t",
            "p",
            vec![SftExample {
                input: "in".into(),
                output: "out".into(),
                source_chunks: vec![],
            }],
            CandidateMetadata::default(),
        );
        assert_eq!(
            cand.training_pairs(),
            vec![TrainingPair {
                prompt: "in".into(),
                completion: "out".into()
            }]
        );
    }
}
