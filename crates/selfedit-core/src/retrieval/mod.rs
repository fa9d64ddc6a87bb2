//! Retrieval index: ingesting documents and answering grounded queries.

pub mod chunking;
pub mod ingest;
pub mod query;

pub use chunking::chunk_text;
pub use ingest::{IngestReport, Ingestor};
pub use query::{extract_self_edit, render_context, ContextSnippet, QueryAgent, QueryAnswer};
