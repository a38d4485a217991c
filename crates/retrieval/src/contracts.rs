//! External collaborator contracts for the hybrid retrieval pipeline
//!
//! The pipeline only ever talks to its retriever, embedding provider and
//! vector store through these one-method seams, so tests can script them
//! without network access.

use async_trait::async_trait;
use ragcast_core::errors::ValidationError;
use ragcast_core::response::UnifiedResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Free-form options passed through to the retriever
pub type RetrieveOptions = Map<String, Value>;

/// Retrieval pipeline error
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("retriever error: {0}")]
    Retriever(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("embedding response contained no vector for the query")]
    MissingQueryVector,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Primary RAG source
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Fetch a normalized response for the question; errors when it
    /// cannot produce one.
    async fn retrieve(
        &self,
        question: &str,
        options: &RetrieveOptions,
    ) -> Result<UnifiedResponse, RetrievalError>;
}

/// One embedding input record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingInput {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// A batch of embedding inputs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingBatch {
    pub inputs: Vec<EmbeddingInput>,
}

/// One returned vector
///
/// Order need not strictly mirror the inputs but is assumed positionally
/// aligned by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Result of one batched embed call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingBatchResult {
    pub vectors: Vec<EmbeddingVector>,
}

/// Embedding source
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, batch: EmbeddingBatch) -> Result<EmbeddingBatchResult, RetrievalError>;
}

/// One record written to the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// Upsert outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertResult {
    pub upserted: u64,
    pub updated: u64,
}

/// Vector store query options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Number of nearest records to return
    pub top_k: usize,
    /// Provider-specific filter, passed through verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

/// Vector store
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
        options: &Map<String, Value>,
    ) -> Result<UpsertResult, RetrievalError>;

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        options: &QueryOptions,
    ) -> Result<UnifiedResponse, RetrievalError>;
}
