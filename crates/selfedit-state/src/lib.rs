//! selfedit-state: persistence for the self-edit lifecycle
//!
//! This crate owns the data model (candidates, evaluation results,
//! embedding records) and the keyed storage abstractions over it.
//!
//! ## Key Components
//!
//! - `CandidateStore`: candidates and evaluation artifacts, with filesystem
//!   (`FsCandidateStore`), SurrealDB (`SurrealCandidateStore`) and in-memory
//!   backends
//! - `EmbeddingStore`: embedded chunks with dot-product top-K retrieval,
//!   with filesystem (`FsEmbeddingStore`) and in-memory backends
//! - `ContentDigest`: SHA-256 digests for audit records

mod error;
pub mod fakes;
pub mod fs_store;
pub mod migrations;
pub mod ranking;
pub mod records;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{RecordKind, StorageError};
pub use fakes::{MemoryCandidateStore, MemoryEmbeddingStore};
pub use fs_store::{FsCandidateStore, FsEmbeddingStore};
pub use records::{
    Candidate, CandidateId, CandidateMetadata, CandidateStatus, EmbeddingMeta, EmbeddingRecord,
    EvaluationResult, ExampleScore, RetrievalHit, SftExample, TrainingPair, ValidationExample,
};
pub use storage_traits::{CandidateStore, ContentDigest, EmbeddingStore, StorageResult};
pub use surreal_store::SurrealCandidateStore;
