//! Knowledge store domain types and the Retriever trait.
//!
//! A chunk is a unit of retrievable text with attached provenance metadata.
//! Chunks are created during an index build, immutable thereafter, and
//! destroyed wholesale on rebuild.

use crate::error::KnowledgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrievable unit of source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique ID for this chunk
    pub id: String,

    /// The chunk text
    pub content: String,

    /// Provenance: document type, source filename, heading hierarchy,
    /// arbitrary sidecar key/values.
    #[serde(default)]
    pub metadata: ChunkMetadata,

    /// Relevance score (set by lookup operations)
    #[serde(default)]
    pub score: f32,

    /// Embedding vector (stored as a blob in the index)
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Provenance metadata attached to every chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Name of the file the chunk came from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_filename: String,

    /// Heading hierarchy for chunks split from structured documents
    /// (level 1 first). Empty for window-split chunks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    /// Sidecar key/values and anything else the loader attached.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChunkMetadata {
    /// Metadata for a chunk of the named file.
    pub fn for_file(source_filename: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            headers: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Read-only lookup against the knowledge index.
///
/// Deterministic for a fixed index and embedding model; never mutates the
/// index. Safe to share across concurrent turns.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the most relevant chunks for the query, best match first.
    ///
    /// An empty query is valid — it is simply low-yield, not an error.
    async fn lookup(
        &self,
        query: &str,
    ) -> std::result::Result<Vec<KnowledgeChunk>, KnowledgeError>;
}
