//! Hybrid retrieval pipeline
//!
//! Two independent operations over a configured embedding provider and
//! vector store: mirroring the primary RAG source into the store
//! (`ingest_from_ragie`), and answering a question from both sources at
//! once (`hybrid_retrieve`).
//!
//! Every call is strictly sequential; timeouts belong to the injected
//! collaborators.

use crate::contracts::{
    EmbeddingBatch, EmbeddingInput, EmbeddingProvider, QueryOptions, RetrievalError,
    RetrieveOptions, Retriever, UpsertResult, VectorRecord, VectorStore,
};
use crate::merge::{self, MergeWeights};
use ragcast_core::response::UnifiedResponse;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::Arc;

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Vector store namespace
    pub namespace: String,
    /// Weight applied to primary-source scores
    pub primary_weight: f64,
    /// Weight applied to vector-store scores
    pub secondary_weight: f64,
    /// Penalty applied to a secondary entry colliding with a primary one
    pub duplicate_penalty: f64,
    /// Maximum number of merged chunks returned
    pub hybrid_limit: usize,
    /// Nearest-neighbour count for the vector store query
    pub vector_top_k: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            primary_weight: 1.0,
            secondary_weight: 0.85,
            duplicate_penalty: 0.9,
            hybrid_limit: 8,
            vector_top_k: 8,
        }
    }
}

/// Ingestion outcome
#[derive(Debug)]
pub struct IngestReport {
    /// The primary response the records were built from
    pub context: UnifiedResponse,
    /// Number of records written
    pub ingested_chunks: usize,
    /// Vector store outcome
    pub upsert: UpsertResult,
}

/// Hybrid retrieval pipeline
pub struct HybridRetrievalPipeline {
    retriever: Arc<dyn Retriever>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: HybridConfig,
}

impl HybridRetrievalPipeline {
    /// Create a pipeline over the three collaborators
    pub fn new(
        retriever: Arc<dyn Retriever>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: HybridConfig,
    ) -> Self {
        Self {
            retriever,
            embedder,
            store,
            config,
        }
    }

    /// Fetch the primary source and mirror its chunks into the vector store
    ///
    /// An empty primary response short-circuits with zero counts without
    /// calling the embedding provider.
    pub async fn ingest_from_ragie(
        &self,
        question: &str,
        options: &RetrieveOptions,
    ) -> Result<IngestReport, RetrievalError> {
        let context = self.retriever.retrieve(question, options).await?;
        if context.is_empty() {
            return Ok(IngestReport {
                context,
                ingested_chunks: 0,
                upsert: UpsertResult::default(),
            });
        }

        let inputs: Vec<EmbeddingInput> = context
            .chunks()
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let id = chunk
                    .document_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("ragie-{index}"));

                // absent values are omitted rather than serialized as null
                let mut metadata = Map::new();
                metadata.insert("origin".to_string(), json!(merge::ORIGIN_PRIMARY));
                if let Some(score) = chunk.score() {
                    metadata.insert("ragie_score".to_string(), json!(score));
                }
                if let Some(document_id) = chunk.document_id() {
                    metadata.insert("ragie_document_id".to_string(), json!(document_id));
                }
                metadata.insert("ragie_model".to_string(), json!(context.model()));
                metadata.insert("ragie_provider".to_string(), json!(context.provider()));
                metadata.insert("snippet_index".to_string(), json!(index));

                EmbeddingInput {
                    id,
                    text: chunk.text().to_string(),
                    metadata,
                }
            })
            .collect();

        let embedded = self
            .embedder
            .embed(EmbeddingBatch {
                inputs: inputs.clone(),
            })
            .await?;

        // positional zip; a vector without a matching input is skipped
        let mut records = Vec::with_capacity(inputs.len());
        for (index, vector) in embedded.vectors.into_iter().enumerate() {
            let Some(input) = inputs.get(index) else {
                tracing::warn!("embedding result {index} has no matching input, skipped");
                continue;
            };

            let mut metadata = input.metadata.clone();
            if let Some(extra) = vector.metadata {
                // provider-returned keys win on conflict
                metadata.extend(extra);
            }
            metadata
                .entry("text".to_string())
                .or_insert_with(|| json!(input.text));
            metadata
                .entry("origin".to_string())
                .or_insert_with(|| json!(merge::ORIGIN_PRIMARY));

            records.push(VectorRecord {
                id: input.id.clone(),
                values: vector.values,
                metadata,
            });
        }

        let ingested_chunks = records.len();
        let upsert = self
            .store
            .upsert(&self.config.namespace, records, &Map::new())
            .await?;

        tracing::debug!(
            "ingested {ingested_chunks} chunks into namespace {}",
            self.config.namespace
        );

        Ok(IngestReport {
            context,
            ingested_chunks,
            upsert,
        })
    }

    /// Answer a question from both sources and merge the results
    pub async fn hybrid_retrieve(
        &self,
        question: &str,
        options: &RetrieveOptions,
    ) -> Result<UnifiedResponse, RetrievalError> {
        let primary = self.retriever.retrieve(question, options).await?;

        let embedded = self
            .embedder
            .embed(EmbeddingBatch {
                inputs: vec![EmbeddingInput {
                    id: "question".to_string(),
                    text: question.to_string(),
                    metadata: Map::new(),
                }],
            })
            .await?;
        let query_vector = embedded
            .vectors
            .into_iter()
            .next()
            .ok_or(RetrievalError::MissingQueryVector)?;

        let secondary = self
            .store
            .query(
                &self.config.namespace,
                &query_vector.values,
                &QueryOptions {
                    top_k: self.config.vector_top_k,
                    filter: None,
                },
            )
            .await?;

        Ok(self.combine(&primary, &secondary))
    }

    /// Merge two responses into one reranked, deduplicated response
    pub fn combine(
        &self,
        primary: &UnifiedResponse,
        secondary: &UnifiedResponse,
    ) -> UnifiedResponse {
        merge::combine(
            primary,
            secondary,
            &MergeWeights {
                primary: self.config.primary_weight,
                secondary: self.config.secondary_weight,
                duplicate_penalty: self.config.duplicate_penalty,
                limit: self.config.hybrid_limit,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{EmbeddingBatchResult, EmbeddingVector};
    use async_trait::async_trait;
    use ragcast_core::response::Chunk;
    use serde_json::Value;
    use std::sync::Mutex;

    struct StubRetriever {
        response: UnifiedResponse,
        calls: Mutex<usize>,
    }

    impl StubRetriever {
        fn new(response: UnifiedResponse) -> Self {
            Self {
                response,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn retrieve(
            &self,
            _question: &str,
            _options: &RetrieveOptions,
        ) -> Result<UnifiedResponse, RetrievalError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.response.clone())
        }
    }

    /// Returns one constant-dimension vector per input and records batches
    struct RecordingEmbedder {
        batches: Mutex<Vec<EmbeddingBatch>>,
        extra_metadata: Option<Map<String, Value>>,
        surplus_vectors: usize,
    }

    impl RecordingEmbedder {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                extra_metadata: None,
                surplus_vectors: 0,
            }
        }

        fn batches(&self) -> Vec<EmbeddingBatch> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingEmbedder {
        async fn embed(
            &self,
            batch: EmbeddingBatch,
        ) -> Result<EmbeddingBatchResult, RetrievalError> {
            self.batches.lock().unwrap().push(batch.clone());
            let count = batch.inputs.len() + self.surplus_vectors;
            let vectors = (0..count)
                .map(|i| EmbeddingVector {
                    id: batch
                        .inputs
                        .get(i)
                        .map(|input| input.id.clone())
                        .unwrap_or_else(|| format!("surplus-{i}")),
                    values: vec![i as f32, 1.0],
                    metadata: self.extra_metadata.clone(),
                })
                .collect();
            Ok(EmbeddingBatchResult { vectors })
        }
    }

    struct RecordingStore {
        upserts: Mutex<Vec<(String, Vec<VectorRecord>)>>,
        queries: Mutex<Vec<(String, Vec<f32>, usize)>>,
        query_response: UnifiedResponse,
    }

    impl RecordingStore {
        fn new(query_response: UnifiedResponse) -> Self {
            Self {
                upserts: Mutex::new(Vec::new()),
                queries: Mutex::new(Vec::new()),
                query_response,
            }
        }
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn upsert(
            &self,
            namespace: &str,
            records: Vec<VectorRecord>,
            _options: &Map<String, Value>,
        ) -> Result<UpsertResult, RetrievalError> {
            let count = records.len() as u64;
            self.upserts
                .lock()
                .unwrap()
                .push((namespace.to_string(), records));
            Ok(UpsertResult {
                upserted: count,
                updated: 0,
            })
        }

        async fn query(
            &self,
            namespace: &str,
            vector: &[f32],
            options: &QueryOptions,
        ) -> Result<UnifiedResponse, RetrievalError> {
            self.queries.lock().unwrap().push((
                namespace.to_string(),
                vector.to_vec(),
                options.top_k,
            ));
            Ok(self.query_response.clone())
        }
    }

    fn chunk(text: &str, score: Option<f64>, document_id: Option<&str>) -> Chunk {
        let mut c = Chunk::new(text).unwrap();
        if let Some(s) = score {
            c = c.with_score(s);
        }
        if let Some(id) = document_id {
            c = c.with_document_id(id);
        }
        c
    }

    fn pipeline_with(
        primary: UnifiedResponse,
        embedder: RecordingEmbedder,
        store_response: UnifiedResponse,
        config: HybridConfig,
    ) -> (
        HybridRetrievalPipeline,
        Arc<StubRetriever>,
        Arc<RecordingEmbedder>,
        Arc<RecordingStore>,
    ) {
        let retriever = Arc::new(StubRetriever::new(primary));
        let embedder = Arc::new(embedder);
        let store = Arc::new(RecordingStore::new(store_response));
        let pipeline = HybridRetrievalPipeline::new(
            retriever.clone(),
            embedder.clone(),
            store.clone(),
            config,
        );
        (pipeline, retriever, embedder, store)
    }

    fn empty_response() -> UnifiedResponse {
        UnifiedResponse::new("pinecone", "serverless", vec![])
    }

    #[tokio::test]
    async fn test_ingest_empty_primary_skips_embedding() {
        let (pipeline, _, embedder, store) = pipeline_with(
            UnifiedResponse::new("ragie", "default", vec![]),
            RecordingEmbedder::new(),
            empty_response(),
            HybridConfig::default(),
        );

        let report = pipeline
            .ingest_from_ragie("q", &RetrieveOptions::new())
            .await
            .unwrap();

        assert_eq!(report.ingested_chunks, 0);
        assert_eq!(report.upsert, UpsertResult::default());
        assert!(embedder.batches().is_empty());
        assert!(store.upserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_builds_records_with_source_metadata() {
        let primary = UnifiedResponse::new(
            "ragie",
            "default",
            vec![
                chunk("first snippet", Some(0.9), Some("doc-1")),
                chunk("second snippet", None, None),
            ],
        );
        let (pipeline, _, embedder, store) = pipeline_with(
            primary,
            RecordingEmbedder::new(),
            empty_response(),
            HybridConfig {
                namespace: "kb".to_string(),
                ..HybridConfig::default()
            },
        );

        let report = pipeline
            .ingest_from_ragie("q", &RetrieveOptions::new())
            .await
            .unwrap();

        assert_eq!(report.ingested_chunks, 2);
        assert_eq!(report.upsert.upserted, 2);

        let batches = embedder.batches();
        assert_eq!(batches.len(), 1);
        let first = &batches[0].inputs[0];
        assert_eq!(first.id, "doc-1");
        assert_eq!(first.metadata["origin"], "ragie");
        assert_eq!(first.metadata["ragie_score"], 0.9);
        assert_eq!(first.metadata["ragie_document_id"], "doc-1");
        assert_eq!(first.metadata["ragie_provider"], "ragie");
        assert_eq!(first.metadata["snippet_index"], 0);

        let second = &batches[0].inputs[1];
        assert_eq!(second.id, "ragie-1");
        assert!(!second.metadata.contains_key("ragie_score"));

        let upserts = store.upserts.lock().unwrap();
        let (namespace, records) = &upserts[0];
        assert_eq!(namespace, "kb");
        assert_eq!(records[0].metadata["text"], "first snippet");
    }

    #[tokio::test]
    async fn test_ingest_provider_metadata_wins_conflicts() {
        let mut extra = Map::new();
        extra.insert("ragie_model".to_string(), json!("overridden"));
        extra.insert("dim".to_string(), json!(2));
        let embedder = RecordingEmbedder {
            extra_metadata: Some(extra),
            ..RecordingEmbedder::new()
        };

        let primary =
            UnifiedResponse::new("ragie", "default", vec![chunk("body", Some(0.5), None)]);
        let (pipeline, _, _, store) = pipeline_with(
            primary,
            embedder,
            empty_response(),
            HybridConfig::default(),
        );

        pipeline
            .ingest_from_ragie("q", &RetrieveOptions::new())
            .await
            .unwrap();

        let upserts = store.upserts.lock().unwrap();
        let record = &upserts[0].1[0];
        assert_eq!(record.metadata["ragie_model"], "overridden");
        assert_eq!(record.metadata["dim"], 2);
        assert_eq!(record.metadata["origin"], "ragie");
    }

    #[tokio::test]
    async fn test_ingest_skips_surplus_vectors() {
        let embedder = RecordingEmbedder {
            surplus_vectors: 2,
            ..RecordingEmbedder::new()
        };
        let primary =
            UnifiedResponse::new("ragie", "default", vec![chunk("only", Some(0.5), None)]);
        let (pipeline, _, _, _) = pipeline_with(
            primary,
            embedder,
            empty_response(),
            HybridConfig::default(),
        );

        let report = pipeline
            .ingest_from_ragie("q", &RetrieveOptions::new())
            .await
            .unwrap();

        assert_eq!(report.ingested_chunks, 1);
    }

    #[tokio::test]
    async fn test_hybrid_retrieve_embeds_question_and_queries_store() {
        let primary =
            UnifiedResponse::new("ragie", "default", vec![chunk("p", Some(0.8), None)]);
        let secondary =
            UnifiedResponse::new("pinecone", "serverless", vec![chunk("s", Some(0.7), None)]);
        let (pipeline, _, embedder, store) = pipeline_with(
            primary,
            RecordingEmbedder::new(),
            secondary,
            HybridConfig {
                namespace: "kb".to_string(),
                vector_top_k: 5,
                ..HybridConfig::default()
            },
        );

        let merged = pipeline
            .hybrid_retrieve("what is ragcast", &RetrieveOptions::new())
            .await
            .unwrap();

        let batches = embedder.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].inputs.len(), 1);
        assert_eq!(batches[0].inputs[0].text, "what is ragcast");

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries[0].0, "kb");
        assert_eq!(queries[0].2, 5);

        assert_eq!(merged.provider(), "hybrid");
        assert_eq!(merged.model(), "ragie+pinecone");
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_combine_spec_collision_scenario() {
        let (pipeline, _, _, _) = pipeline_with(
            empty_response(),
            RecordingEmbedder::new(),
            empty_response(),
            HybridConfig::default(),
        );

        let primary = UnifiedResponse::new(
            "ragie",
            "default",
            vec![chunk("primary text", Some(0.50), Some("doc-2"))],
        );
        let secondary = UnifiedResponse::new(
            "pinecone",
            "serverless",
            vec![chunk("secondary text", Some(0.93), Some("doc-2"))],
        );

        let merged = pipeline.combine(&primary, &secondary);

        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged.chunks()[0].metadata().unwrap()["origin"],
            "vector_store"
        );
    }
}
