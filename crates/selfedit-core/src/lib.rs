//! selfedit-core: the self-edit candidate lifecycle
//!
//! Candidates are proposed by a generation service, trained by an external
//! process under a deadline, scored against a validation set and gated into
//! accepted, rejected or human-review outcomes. The retrieval index that
//! grounds generation and query answering lives here too.
//!
//! ## Key Components
//!
//! - `CandidateGenerator`: strict-schema generation with fallback candidates
//! - `SandboxTrainer`: training data + child process with timeout and cancellation
//! - `Evaluator`: Jaccard scoring and the pass / review / reject decision
//! - `LifecycleManager`: status transitions and evaluation artifacts
//! - `Ingestor` / `QueryAgent`: chunk ingest and grounded answering
//! - `SelfEditPipeline`: all of the above for one task

pub mod collaborators;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod lifecycle;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod reporting;
pub mod retrieval;
pub mod telemetry;
pub mod trainer;

pub use collaborators::{
    DefaultPrompts, Embedder, GenerationService, PromptBuilder, ResponseService, TextExtractor,
};
pub use config::{
    EvaluatorConfig, GeneratorConfig, RetrievalConfig, SelfEditConfig, StoreConfig, TrainerConfig,
};
pub use error::{Result, SelfEditError};
pub use evaluator::{jaccard, Decision, DecisionThresholds, Evaluator};
pub use generator::{extract_json_span, parse_generation, CandidateGenerator, ParsedGeneration};
pub use lifecycle::{CandidateSummary, LifecycleManager};
pub use metrics::METRICS;
pub use obs::{
    emit_candidate_decided, emit_candidate_generated, emit_chunk_upserted,
    emit_evaluation_completed, emit_generation_fallback, emit_retrieval_queried,
    emit_training_finished, emit_training_started, CandidateSpan,
};
pub use pipeline::{CandidateOutcome, PipelineReport, SelfEditPipeline};
pub use reporting::{render_pipeline_summary_md, write_pipeline_report};
pub use retrieval::{chunk_text, ContextSnippet, IngestReport, Ingestor, QueryAgent, QueryAnswer};
pub use telemetry::init_tracing;
pub use trainer::{
    cancellation, CancelHandle, CancelSignal, CommandTrainingProcess, ProcessExit,
    SandboxTrainer, TrainingArtifact, TrainingJob, TrainingProcess,
};

pub use selfedit_state::{
    Candidate, CandidateId, CandidateMetadata, CandidateStatus, EvaluationResult, ExampleScore,
    SftExample, ValidationExample,
};
