//! Hybrid retrieval pipeline
//!
//! Merges a primary hosted-RAG source with a vector-store source into one
//! reranked, deduplicated response, and mirrors the primary source into
//! the store for later queries.

pub mod adapters;
pub mod contracts;
mod merge;
pub mod pipeline;

pub use adapters::OpenAiEmbeddingAdapter;
pub use contracts::{
    EmbeddingBatch, EmbeddingBatchResult, EmbeddingInput, EmbeddingProvider, EmbeddingVector,
    QueryOptions, RetrievalError, RetrieveOptions, Retriever, UpsertResult, VectorRecord,
    VectorStore,
};
pub use merge::{ORIGIN_PRIMARY, ORIGIN_SECONDARY};
pub use pipeline::{HybridConfig, HybridRetrievalPipeline, IngestReport};
