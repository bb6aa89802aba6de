//! Knowledge store builder.
//!
//! Keeps the on-disk embedding index synchronized with the source-document
//! directory. A freshness marker (one timestamp file inside the index
//! directory) decides whether a rebuild is needed; rebuilds are
//! all-or-nothing — the new generation is materialized in a staging
//! directory and renamed into place, so concurrent readers observe the old
//! index or the fully-rebuilt one, never a partial write.

use crate::loader::{collect_files, load_documents};
use crate::retriever::IndexRetriever;
use crate::splitter::split_documents;
use crate::store::IndexStore;
use folio_core::error::KnowledgeError;
use folio_core::inference::{EmbeddingRequest, InferenceClient};
use folio_core::knowledge::KnowledgeChunk;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "index.db";
const MARKER_FILE: &str = ".last_update";
const EMBED_BATCH: usize = 32;

/// Builds and loads the persisted embedding index.
pub struct KnowledgeStoreBuilder {
    source_dir: PathBuf,
    index_dir: PathBuf,
    embedding_model: String,
    top_k: usize,
    client: Arc<dyn InferenceClient>,
}

impl KnowledgeStoreBuilder {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
        embedding_model: impl Into<String>,
        top_k: usize,
        client: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            index_dir: index_dir.into(),
            embedding_model: embedding_model.into(),
            top_k,
            client,
        }
    }

    /// Whether the persisted index is stale.
    ///
    /// True if no freshness marker exists, the marker is unparsable, or any
    /// source file was modified after the marker was written. False when the
    /// source directory itself is absent — nothing to index, so any existing
    /// index is preserved.
    pub fn needs_rebuild(&self) -> bool {
        let Some(last_build) = self.read_marker() else {
            return true;
        };

        if !self.source_dir.exists() {
            return false;
        }

        let mut files = Vec::new();
        collect_files(&self.source_dir, &mut files);

        for path in &files {
            let modified = std::fs::metadata(path).and_then(|m| m.modified());
            if let Ok(mtime) = modified {
                if mtime > last_build {
                    info!(path = %path.display(), "Source file newer than index, rebuilding");
                    return true;
                }
            }
        }

        false
    }

    /// Rebuild the index if stale or absent; otherwise load it unchanged.
    pub async fn build_or_load(&self) -> Result<IndexRetriever, KnowledgeError> {
        let index_path = self.index_dir.join(INDEX_FILE);

        if self.needs_rebuild() || !index_path.exists() {
            info!("Building knowledge index (missing or stale)");
            self.rebuild().await?;
        } else {
            info!(path = %index_path.display(), "Loading existing knowledge index");
        }

        let store = IndexStore::open(&index_path.to_string_lossy()).await?;
        Ok(IndexRetriever::new(
            store,
            self.client.clone(),
            self.embedding_model.clone(),
            self.top_k,
        ))
    }

    /// Rebuild from scratch: load → split → embed → persist → swap.
    pub async fn rebuild(&self) -> Result<(), KnowledgeError> {
        let docs = load_documents(&self.source_dir);
        let mut chunks = split_documents(&docs);
        info!(documents = docs.len(), chunks = chunks.len(), "Embedding chunks");

        self.embed_chunks(&mut chunks).await?;

        let staging = self.staging_dir();
        std::fs::create_dir_all(&staging)
            .map_err(|e| KnowledgeError::BuildFailed(format!("Staging dir: {e}")))?;

        let result = self.persist_generation(&staging, &chunks).await;
        if result.is_err() {
            let _ = std::fs::remove_dir_all(&staging);
            return result;
        }

        self.swap_in(&staging)?;
        info!(chunks = chunks.len(), "Knowledge index rebuilt");
        Ok(())
    }

    async fn embed_chunks(&self, chunks: &mut [KnowledgeChunk]) -> Result<(), KnowledgeError> {
        for batch in chunks.chunks_mut(EMBED_BATCH) {
            let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let response = self
                .client
                .embed(EmbeddingRequest {
                    model: self.embedding_model.clone(),
                    inputs,
                })
                .await
                .map_err(|e| KnowledgeError::EmbeddingFailed(e.to_string()))?;

            if response.embeddings.len() != batch.len() {
                return Err(KnowledgeError::EmbeddingFailed(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            for (chunk, embedding) in batch.iter_mut().zip(response.embeddings) {
                chunk.embedding = Some(embedding);
            }
        }
        Ok(())
    }

    async fn persist_generation(
        &self,
        staging: &Path,
        chunks: &[KnowledgeChunk],
    ) -> Result<(), KnowledgeError> {
        let store = IndexStore::open(&staging.join(INDEX_FILE).to_string_lossy()).await?;
        store.insert_chunks(chunks).await?;
        store.close().await;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| KnowledgeError::BuildFailed(format!("Clock: {e}")))?
            .as_secs_f64();
        std::fs::write(staging.join(MARKER_FILE), format!("{now}"))
            .map_err(|e| KnowledgeError::BuildFailed(format!("Freshness marker: {e}")))?;

        Ok(())
    }

    /// Replace the live index directory with the staged generation.
    fn swap_in(&self, staging: &Path) -> Result<(), KnowledgeError> {
        if self.index_dir.exists() {
            let retired = self
                .index_dir
                .with_file_name(format!("{}.old-{}", self.dir_name(), short_id()));
            std::fs::rename(&self.index_dir, &retired)
                .map_err(|e| KnowledgeError::BuildFailed(format!("Retire old index: {e}")))?;
            let result = std::fs::rename(staging, &self.index_dir);
            if let Err(e) = result {
                // Put the old generation back before failing
                let _ = std::fs::rename(&retired, &self.index_dir);
                return Err(KnowledgeError::BuildFailed(format!("Swap in index: {e}")));
            }
            if let Err(e) = std::fs::remove_dir_all(&retired) {
                warn!(path = %retired.display(), error = %e, "Could not remove retired index");
            }
        } else {
            if let Some(parent) = self.index_dir.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| KnowledgeError::BuildFailed(format!("Index parent dir: {e}")))?;
            }
            std::fs::rename(staging, &self.index_dir)
                .map_err(|e| KnowledgeError::BuildFailed(format!("Swap in index: {e}")))?;
        }
        Ok(())
    }

    /// Read the freshness marker, if present and parsable.
    fn read_marker(&self) -> Option<SystemTime> {
        let raw = std::fs::read_to_string(self.index_dir.join(MARKER_FILE)).ok()?;
        let seconds: f64 = raw.trim().parse().ok()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        Some(UNIX_EPOCH + std::time::Duration::from_secs_f64(seconds))
    }

    fn staging_dir(&self) -> PathBuf {
        self.index_dir
            .with_file_name(format!("{}.tmp-{}", self.dir_name(), short_id()))
    }

    fn dir_name(&self) -> String {
        self.index_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vectordb".into())
    }
}

fn short_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}
