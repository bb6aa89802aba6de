//! SQLite-backed chunk storage for the embedding index.
//!
//! One database file holds the chunks of a single index generation:
//! chunk text, provenance metadata as JSON, and the embedding as a
//! little-endian f32 BLOB. A generation is written once during a build and
//! read-only afterwards.

use folio_core::error::KnowledgeError;
use folio_core::knowledge::{ChunkMetadata, KnowledgeChunk};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;

/// Chunk storage backed by a single SQLite file.
pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    /// Open (or create) the index database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn open(path: &str) -> Result<Self, KnowledgeError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| KnowledgeError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), KnowledgeError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT UNIQUE NOT NULL,
                content    TEXT NOT NULL,
                metadata   TEXT NOT NULL DEFAULT '{}',
                embedding  BLOB
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(format!("chunks table: {e}")))?;

        debug!("Index store migrations complete");
        Ok(())
    }

    /// Insert a batch of chunks.
    pub async fn insert_chunks(&self, chunks: &[KnowledgeChunk]) -> Result<(), KnowledgeError> {
        for chunk in chunks {
            let metadata_json = serde_json::to_string(&chunk.metadata)
                .map_err(|e| KnowledgeError::Storage(format!("Metadata serialization: {e}")))?;
            let embedding_blob: Option<Vec<u8>> =
                chunk.embedding.as_deref().map(embedding_to_blob);

            sqlx::query(
                "INSERT INTO chunks (id, content, metadata, embedding) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&chunk.id)
            .bind(&chunk.content)
            .bind(&metadata_json)
            .bind(embedding_blob.as_deref())
            .execute(&self.pool)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("INSERT failed: {e}")))?;
        }

        debug!(count = chunks.len(), "Stored chunks");
        Ok(())
    }

    /// Load every chunk in the index.
    pub async fn load_all(&self) -> Result<Vec<KnowledgeChunk>, KnowledgeError> {
        let rows = sqlx::query("SELECT * FROM chunks ORDER BY iid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KnowledgeError::LookupFailed(format!("Chunk scan: {e}")))?;

        rows.iter().map(row_to_chunk).collect()
    }

    /// Total chunk count.
    pub async fn count(&self) -> Result<usize, KnowledgeError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KnowledgeError::LookupFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| KnowledgeError::LookupFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }

    /// Close the underlying pool. Required before the index directory is
    /// swapped during a rebuild.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeChunk, KnowledgeError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| KnowledgeError::LookupFailed(format!("id column: {e}")))?;
    let content: String = row
        .try_get("content")
        .map_err(|e| KnowledgeError::LookupFailed(format!("content column: {e}")))?;
    let metadata_json: String = row
        .try_get("metadata")
        .map_err(|e| KnowledgeError::LookupFailed(format!("metadata column: {e}")))?;

    let metadata: ChunkMetadata = serde_json::from_str(&metadata_json).unwrap_or_default();

    let embedding: Option<Vec<u8>> = row.try_get("embedding").ok();
    let embedding_vec = embedding.map(|blob| {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    });

    Ok(KnowledgeChunk {
        id,
        content,
        metadata,
        score: 0.0,
        embedding: embedding_vec,
    })
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::knowledge::ChunkMetadata;

    async fn test_store() -> IndexStore {
        IndexStore::open("sqlite::memory:").await.unwrap()
    }

    fn make_chunk(id: &str, content: &str, embedding: Option<Vec<f32>>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.into(),
            content: content.into(),
            metadata: ChunkMetadata::for_file("resume.md"),
            score: 0.0,
            embedding,
        }
    }

    #[tokio::test]
    async fn insert_and_load() {
        let store = test_store().await;
        store
            .insert_chunks(&[
                make_chunk("a", "First chunk", Some(vec![0.1, 0.2])),
                make_chunk("b", "Second chunk", None),
            ])
            .await
            .unwrap();

        let chunks = store.load_all().await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "a");
        assert_eq!(chunks[0].metadata.source_filename, "resume.md");
        assert!(chunks[1].embedding.is_none());
    }

    #[tokio::test]
    async fn embedding_round_trip() {
        let store = test_store().await;
        store
            .insert_chunks(&[make_chunk("a", "text", Some(vec![0.1, 0.2, 0.3, 0.4]))])
            .await
            .unwrap();

        let chunks = store.load_all().await.unwrap();
        let emb = chunks[0].embedding.as_ref().unwrap();
        assert_eq!(emb.len(), 4);
        assert!((emb[0] - 0.1).abs() < 1e-6);
        assert!((emb[3] - 0.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn metadata_round_trip() {
        let store = test_store().await;
        let mut chunk = make_chunk("a", "text", None);
        chunk.metadata.headers = vec!["About".into(), "Skills".into()];
        chunk
            .metadata
            .extra
            .insert("language".into(), serde_json::json!("en"));
        store.insert_chunks(&[chunk]).await.unwrap();

        let chunks = store.load_all().await.unwrap();
        assert_eq!(chunks[0].metadata.headers, vec!["About", "Skills"]);
        assert_eq!(chunks[0].metadata.extra["language"], "en");
    }

    #[tokio::test]
    async fn count_empty_and_filled() {
        let store = test_store().await;
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .insert_chunks(&[make_chunk("a", "one", None), make_chunk("b", "two", None)])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
