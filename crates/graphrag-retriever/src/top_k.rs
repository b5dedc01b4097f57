//! Deterministic best-K selection over batches with or without precomputed
//! scores: sort-and-dedup when every candidate carries a score, falling
//! back to a cosine-similarity ranking against a reference embedding
//! otherwise.

use graphrag_core::Content;
use std::collections::HashSet;

/// Cosine similarity between two equal-length embeddings. Returns `0.0` if
/// either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Select the top `k` contents out of `candidates`, deduping by id.
///
/// When every candidate carries a `score`, ranks by score descending. When
/// none do, ranks by cosine similarity to `query_embedding`. Mixed
/// score/no-score batches are treated as "not all scored" and fall back to
/// similarity, matching the reference implementation's conservative choice.
pub fn top_k(candidates: Vec<Content>, query_embedding: &[f32], k: usize) -> Vec<Content> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let all_scored = candidates.iter().all(|c| c.score.is_some());

    let mut ranked: Vec<Content> = if all_scored {
        let mut v = candidates;
        v.sort_by(|a, b| b.score.unwrap().total_cmp(&a.score.unwrap()));
        v
    } else {
        let mut v: Vec<(f32, Content)> = candidates
            .into_iter()
            .map(|c| {
                let sim = cosine_similarity(&c.embedding, query_embedding);
                (sim, c)
            })
            .collect();
        v.sort_by(|a, b| b.0.total_cmp(&a.0));
        v.into_iter()
            .map(|(sim, mut c)| {
                c.score = Some(sim);
                c
            })
            .collect()
    };

    let mut seen = HashSet::new();
    ranked.retain(|c| seen.insert(c.id.clone()));
    ranked.truncate(k);
    ranked
}
