//! Vector lookup against a built index.

use crate::store::IndexStore;
use crate::vector::rank_by_similarity;
use async_trait::async_trait;
use folio_core::error::KnowledgeError;
use folio_core::inference::{EmbeddingRequest, InferenceClient};
use folio_core::knowledge::{KnowledgeChunk, Retriever};
use std::sync::Arc;
use tracing::debug;

/// Retriever over a persisted embedding index.
///
/// Embeds the query, ranks every stored chunk by cosine similarity, and
/// returns the top k. Never mutates the index; safe to share across turns.
pub struct IndexRetriever {
    store: IndexStore,
    client: Arc<dyn InferenceClient>,
    embedding_model: String,
    top_k: usize,
}

impl IndexRetriever {
    pub fn new(
        store: IndexStore,
        client: Arc<dyn InferenceClient>,
        embedding_model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            client,
            embedding_model: embedding_model.into(),
            top_k,
        }
    }

    /// Number of chunks in the underlying index.
    pub async fn chunk_count(&self) -> Result<usize, KnowledgeError> {
        self.store.count().await
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn lookup(&self, query: &str) -> Result<Vec<KnowledgeChunk>, KnowledgeError> {
        let response = self
            .client
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![query.to_string()],
            })
            .await
            .map_err(|e| KnowledgeError::EmbeddingFailed(e.to_string()))?;

        let query_embedding = response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::EmbeddingFailed("No embedding returned".into()))?;

        let chunks = self.store.load_all().await?;
        let ranked = rank_by_similarity(&chunks, &query_embedding, self.top_k);

        debug!(query = %query, results = ranked.len(), "Lookup complete");
        Ok(ranked)
    }
}
