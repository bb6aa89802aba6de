//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and ranking over chunk embeddings.

use folio_core::knowledge::KnowledgeChunk;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank chunks by cosine similarity to a query embedding.
///
/// Returns chunks sorted by descending similarity, with `score` set to the
/// cosine similarity value. Chunks without embeddings are skipped.
pub fn rank_by_similarity(
    chunks: &[KnowledgeChunk],
    query_embedding: &[f32],
    limit: usize,
) -> Vec<KnowledgeChunk> {
    let mut scored: Vec<(f32, KnowledgeChunk)> = chunks
        .iter()
        .filter_map(|chunk| {
            let emb = chunk.embedding.as_ref()?;
            let sim = cosine_similarity(emb, query_embedding);
            let mut c = chunk.clone();
            c.score = sim;
            Some((sim, c))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(_, c)| c).collect()
}
