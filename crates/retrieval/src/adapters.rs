//! Embedding adapter over the OpenAI-compatible client

use crate::contracts::{
    EmbeddingBatch, EmbeddingBatchResult, EmbeddingProvider, EmbeddingVector, RetrievalError,
};
use async_trait::async_trait;
use ragcast_embedding::EmbeddingClient;

/// Embedding provider backed by `ragcast_embedding::EmbeddingClient`
///
/// The whole batch goes out as one request; ids are carried through from
/// the inputs positionally.
pub struct OpenAiEmbeddingAdapter {
    client: EmbeddingClient,
}

impl OpenAiEmbeddingAdapter {
    /// Wrap a configured client
    pub fn new(client: EmbeddingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingAdapter {
    async fn embed(&self, batch: EmbeddingBatch) -> Result<EmbeddingBatchResult, RetrievalError> {
        let texts: Vec<String> = batch.inputs.iter().map(|input| input.text.clone()).collect();

        let values = self
            .client
            .embed_batch(&texts)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let vectors = values
            .into_iter()
            .zip(batch.inputs)
            .map(|(values, input)| EmbeddingVector {
                id: input.id,
                values,
                metadata: None,
            })
            .collect();

        Ok(EmbeddingBatchResult { vectors })
    }
}
