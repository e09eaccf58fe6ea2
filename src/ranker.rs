//! # Similarity ranker
//!
//! Exact cosine-similarity search over a [`ChunkStore`].
//!
//! Archives hold hundreds to low thousands of chunks, so every query does a
//! full linear scan; there is no approximate index. Scoring is spread across
//! the rayon pool and the results are then sorted with a total order, so the
//! output never depends on thread scheduling:
//!
//! 1. score, descending
//! 2. record id, ascending
//! 3. insertion position, ascending
//!
//! A vector with zero norm (stored or query) has no direction, so it scores
//! [`MIN_SCORE`] instead of dividing by zero.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::archive::{ChunkRecord, ChunkStore};
use crate::error::RankError;

/// Lowest possible cosine similarity; assigned to vectors that cannot be compared.
pub const MIN_SCORE: f32 = -1.0;

/// A record copied out of the store together with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Cosine similarity `a·b / (|a||b|)`, or [`MIN_SCORE`] when either side has
/// zero norm or the result is not finite.
///
/// Accumulates in `f64` so long vectors do not drift between runs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return MIN_SCORE;
    }

    let sim = (dot / denom).clamp(-1.0, 1.0) as f32;
    if sim.is_finite() { sim } else { MIN_SCORE }
}

/// Return the `k` records most similar to `query`, best first.
///
/// If `k` exceeds the store size every record is returned, ranked.
///
/// # Errors
/// - [`RankError::InvalidArgument`] when `k == 0`.
/// - [`RankError::EmptyStore`] when the store has no records.
/// - [`RankError::DimensionMismatch`] when `query` does not match the store's dimension.
pub fn top_k(query: &[f32], store: &ChunkStore, k: usize) -> Result<Vec<RankedChunk>, RankError> {
    if k == 0 {
        return Err(RankError::InvalidArgument("k must be at least 1".into()));
    }
    let expected = store.dimension().ok_or(RankError::EmptyStore)?;
    if query.len() != expected {
        return Err(RankError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }

    let records = store.records();
    let mut scored: Vec<(usize, f32)> = records
        .par_iter()
        .enumerate()
        .map(|(position, record)| (position, cosine_similarity(query, &record.embedding)))
        .collect();

    scored.sort_by(|&(pa, sa), &(pb, sb)| {
        sb.total_cmp(&sa)
            .then_with(|| records[pa].id.cmp(&records[pb].id))
            .then_with(|| pa.cmp(&pb))
    });
    scored.truncate(k);

    debug!(
        "Ranked {} records, returning {} (best score {:?})",
        records.len(),
        scored.len(),
        scored.first().map(|&(_, s)| s)
    );

    Ok(scored
        .into_iter()
        .map(|(position, score)| RankedChunk {
            record: records[position].clone(),
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(vectors: &[(u64, Vec<f32>)]) -> ChunkStore {
        ChunkStore::from_records(
            vectors
                .iter()
                .map(|(id, v)| ChunkRecord::new(*id, format!("chunk {id}"), vec![], "", v.clone()))
                .collect(),
        )
        .unwrap()
    }

    fn ids(ranked: &[RankedChunk]) -> Vec<u64> {
        ranked.iter().map(|r| r.record.id).collect()
    }

    #[test]
    fn test_identical_vector_ranks_first_with_score_one() {
        let s = store(&[
            (0, vec![0.2, 0.9, 0.1]),
            (1, vec![0.6, 0.3, 0.7]),
            (2, vec![0.1, 0.1, 0.9]),
        ]);
        let ranked = top_k(&[0.6, 0.3, 0.7], &s, 3).unwrap();
        assert_eq!(ranked[0].record.id, 1);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let s = store(&[
            (5, vec![1.0, 1.0]),
            (3, vec![1.0, 1.0]),
            (4, vec![0.0, 1.0]),
        ]);
        let ranked = top_k(&[1.0, 1.0], &s, 3).unwrap();
        assert_eq!(ids(&ranked), vec![3, 5, 4]);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn test_k_larger_than_store_returns_everything() {
        let s = store(&[(0, vec![1.0, 0.0]), (1, vec![0.0, 1.0]), (2, vec![1.0, 1.0])]);
        let ranked = top_k(&[1.0, 0.0], &s, 10).unwrap();
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_zero_vector_never_outranks_positive_match() {
        let s = store(&[(0, vec![0.0, 0.0]), (1, vec![0.1, 0.9])]);
        let ranked = top_k(&[1.0, 1.0], &s, 2).unwrap();
        assert_eq!(ids(&ranked), vec![1, 0]);
        assert_eq!(ranked[1].score, MIN_SCORE);
    }

    #[test]
    fn test_zero_query_scores_everything_minimum() {
        let s = store(&[(1, vec![1.0, 0.0]), (0, vec![0.0, 1.0])]);
        let ranked = top_k(&[0.0, 0.0], &s, 2).unwrap();
        assert!(ranked.iter().all(|r| r.score == MIN_SCORE));
        assert_eq!(ids(&ranked), vec![0, 1]);
    }

    #[test]
    fn test_repeated_queries_are_deterministic() {
        let vectors: Vec<(u64, Vec<f32>)> = (0..200u64)
            .map(|i| (i, vec![(i % 7) as f32, (i % 3) as f32, 1.0]))
            .collect();
        let s = store(&vectors);
        let first = ids(&top_k(&[0.5, 2.0, 1.0], &s, 25).unwrap());
        for _ in 0..5 {
            assert_eq!(ids(&top_k(&[0.5, 2.0, 1.0], &s, 25).unwrap()), first);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        let s = store(&[(0, vec![1.0, 0.0])]);
        assert!(matches!(top_k(&[1.0, 0.0], &s, 0), Err(RankError::InvalidArgument(_))));
        assert_eq!(
            top_k(&[1.0, 0.0, 0.0], &s, 1),
            Err(RankError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );

        let empty = ChunkStore::from_records(Vec::new()).unwrap();
        assert_eq!(top_k(&[1.0], &empty, 1), Err(RankError::EmptyStore));
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), MIN_SCORE);
    }
}
