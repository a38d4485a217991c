//! Rank-merge and deduplication
//!
//! Combines a primary RAG response with a vector-store response into one
//! reranked, deduplicated response. Scores are weighted per source, a
//! secondary entry colliding with a primary one is penalized, and the
//! higher final score wins the merge slot (ties go to the entry processed
//! later, i.e. the secondary one).

use ragcast_core::response::{Chunk, UnifiedResponse};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Origin tag for primary-source chunks
pub const ORIGIN_PRIMARY: &str = "ragie";
/// Origin tag for vector-store chunks
pub const ORIGIN_SECONDARY: &str = "vector_store";

/// Merge parameters resolved from the pipeline config
#[derive(Debug, Clone, Copy)]
pub(crate) struct MergeWeights {
    pub primary: f64,
    pub secondary: f64,
    pub duplicate_penalty: f64,
    pub limit: usize,
}

/// Transient merge record; exists only inside `combine`
#[derive(Debug, Clone)]
struct MergeCandidate {
    text: String,
    score: f64,
    document_id: Option<String>,
    document_name: Option<String>,
    metadata: Map<String, Value>,
}

impl MergeCandidate {
    fn decorate(chunk: &Chunk, weight: f64, index: usize, origin: &str) -> Self {
        let mut metadata = chunk.metadata().cloned().unwrap_or_default();
        metadata.insert("origin".to_string(), Value::String(origin.to_string()));
        Self {
            text: chunk.text().to_string(),
            score: weighted_score(chunk, weight, index),
            document_id: chunk.document_id().map(str::to_string),
            document_name: chunk.document_name().map(str::to_string),
            metadata,
        }
    }

    fn key(&self) -> String {
        dedup_key(self.document_id.as_deref(), &self.text)
    }

    fn into_chunk(self) -> Option<Chunk> {
        // text comes from an already-validated chunk, so this cannot fail
        let mut chunk = Chunk::new(self.text).ok()?.with_score(self.score);
        if let Some(id) = self.document_id {
            chunk = chunk.with_document_id(&id);
        }
        if let Some(name) = self.document_name {
            chunk = chunk.with_document_name(&name);
        }
        Some(chunk.with_metadata(self.metadata))
    }
}

/// The chunk's own score when present, else a positional fallback
/// `max(0.01, 1 - 0.05 * index)`, times the source weight
pub(crate) fn weighted_score(chunk: &Chunk, weight: f64, index: usize) -> f64 {
    let base = chunk
        .score()
        .unwrap_or_else(|| (1.0 - 0.05 * index as f64).max(0.01));
    base * weight
}

/// Dedup key: `document_id` when present, else a hash of the text
pub(crate) fn dedup_key(document_id: Option<&str>, text: &str) -> String {
    match document_id {
        Some(id) if !id.is_empty() => format!("doc:{id}"),
        _ => {
            let digest = Sha256::digest(text.as_bytes());
            format!("text:{}", hex::encode(&digest[..8]))
        }
    }
}

fn upsert_candidate(
    slots: &mut Vec<MergeCandidate>,
    by_key: &mut HashMap<String, usize>,
    candidate: MergeCandidate,
) {
    let key = candidate.key();
    match by_key.get(&key) {
        // higher final score wins; ties go to the later entry
        Some(&slot) => {
            if candidate.score >= slots[slot].score {
                slots[slot] = candidate;
            }
        }
        None => {
            by_key.insert(key, slots.len());
            slots.push(candidate);
        }
    }
}

/// Merge two responses into one reranked, deduplicated response
pub(crate) fn combine(
    primary: &UnifiedResponse,
    secondary: &UnifiedResponse,
    weights: &MergeWeights,
) -> UnifiedResponse {
    let mut slots: Vec<MergeCandidate> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (index, chunk) in primary.chunks().iter().enumerate() {
        let candidate = MergeCandidate::decorate(chunk, weights.primary, index, ORIGIN_PRIMARY);
        upsert_candidate(&mut slots, &mut by_key, candidate);
    }

    let primary_keys: HashSet<String> = primary
        .chunks()
        .iter()
        .map(|c| dedup_key(c.document_id(), c.text()))
        .collect();

    for (index, chunk) in secondary.chunks().iter().enumerate() {
        let mut candidate =
            MergeCandidate::decorate(chunk, weights.secondary, index, ORIGIN_SECONDARY);
        // the penalty lands on the decorated score before dedup; the slot
        // comparison is penalized-secondary vs unpenalized-primary
        if primary_keys.contains(&candidate.key()) {
            candidate.score *= weights.duplicate_penalty;
        }
        upsert_candidate(&mut slots, &mut by_key, candidate);
    }

    slots.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    slots.truncate(weights.limit);

    let chunks: Vec<Chunk> = slots.into_iter().filter_map(MergeCandidate::into_chunk).collect();

    let mut provider_metadata = Map::new();
    provider_metadata.insert(
        "primary".to_string(),
        json!({"provider": primary.provider(), "model": primary.model()}),
    );
    provider_metadata.insert(
        "secondary".to_string(),
        json!({"provider": secondary.provider(), "model": secondary.model()}),
    );

    UnifiedResponse::new(
        "hybrid",
        format!("{}+{}", primary.provider(), secondary.provider()),
        chunks,
    )
    .with_provider_metadata(provider_metadata)
}
