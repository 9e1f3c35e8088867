//! # Similarity Search Module
//!
//! ## Purpose
//! Ranks every indexed case against a query vector by cosine similarity and
//! returns the top-K with scores. This is the retrieval core: exact
//! brute-force scoring over the index matrix, fully deterministic including
//! tie order.
//!
//! ## Input/Output Specification
//! - **Input**: Case index snapshot, query vector, `k >= 1`
//! - **Output**: `RetrievalResult` sorted by descending score, exact-score
//!   ties broken by ascending row index (first-indexed case wins)
//! - **Errors**: `InvalidArgument` for `k < 1` or a dimension mismatch,
//!   `EmptyIndex` when the index has zero rows
//!
//! ## Key Features
//! - Zero-norm vectors score 0.0 instead of raising a division fault
//! - `k` larger than the index size returns all rows (boundary, not failure)
//! - Read-only over the index; safe for concurrent searches

use crate::errors::{Result, RetrievalError};
use crate::index::CaseIndex;
use serde::{Deserialize, Serialize};

/// One retrieved case with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub case_id: String,
    pub score: f32,
}

/// Ranked retrieval output, length at most `k`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    /// Whether `case_id` appears anywhere in the ranked hits
    pub fn contains(&self, case_id: &str) -> bool {
        self.hits.iter().any(|h| h.case_id == case_id)
    }

    /// Similarity score of `case_id` if it was retrieved
    pub fn score_of(&self, case_id: &str) -> Option<f32> {
        self.hits
            .iter()
            .find(|h| h.case_id == case_id)
            .map(|h| h.score)
    }

    /// Retrieved ids in rank order
    pub fn case_ids(&self) -> Vec<String> {
        self.hits.iter().map(|h| h.case_id.clone()).collect()
    }
}

/// Cosine similarity between a query vector and every index row, returning
/// the `k` best. See the module docs for ordering and error semantics.
pub fn search(index: &CaseIndex, query_vector: &[f32], k: usize) -> Result<RetrievalResult> {
    if k < 1 {
        return Err(RetrievalError::invalid_argument("k", "must be at least 1"));
    }

    if index.is_empty() {
        return Err(RetrievalError::EmptyIndex {
            skipped_records: index.stats().skipped_total(),
        });
    }

    if query_vector.len() != index.dimension() {
        return Err(RetrievalError::invalid_argument(
            "query_vector",
            format!(
                "dimension {} does not match index dimension {}",
                query_vector.len(),
                index.dimension()
            ),
        ));
    }

    let scores: Vec<f32> = (0..index.len())
        .map(|row| cosine_similarity(index.row(row), query_vector))
        .collect();

    // Descending score; exact ties resolve to the lower row index, which with
    // the index's deterministic row order makes results fully reproducible
    let mut order: Vec<usize> = (0..index.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    order.truncate(k.min(index.len()));

    let hits = order
        .into_iter()
        .map(|row| RetrievalHit {
            case_id: index.case_id(row).to_string(),
            score: scores[row],
        })
        .collect();

    Ok(RetrievalResult { hits })
}

/// Cosine similarity with f64 accumulation; 0.0 when either vector has zero
/// norm, so degenerate embeddings never raise a division fault.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::embedding::{HashingEncoder, TextEncoder};
    use crate::CaseRecord;

    fn build_index(records: &[CaseRecord]) -> CaseIndex {
        let encoder = HashingEncoder::new(64);
        let config = EmbeddingConfig {
            model: "feature-hash".to_string(),
            dimension: 64,
            batch_size: 4,
            worker_threads: 2,
        };
        CaseIndex::build(records, &encoder, &config).unwrap()
    }

    fn firearm_corpus() -> Vec<CaseRecord> {
        vec![
            CaseRecord::new("c1", "theft of firearm", "A"),
            CaseRecord::new("c2", "illegal firearm possession", "A"),
            CaseRecord::new("c3", "drug trafficking", "B"),
        ]
    }

    #[test]
    fn test_cosine_zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_identical_vectors_score_one() {
        let v = [0.5, -0.25, 0.75];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_k_below_one_is_invalid() {
        let index = build_index(&firearm_corpus());
        let query = vec![0.0; 64];
        let err = search(&index, &query, 0).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidArgument { .. }));
    }

    #[test]
    fn test_empty_index_is_an_error() {
        let index = build_index(&[]);
        let query = vec![0.0; 64];
        let err = search(&index, &query, 3).unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyIndex { .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_invalid() {
        let index = build_index(&firearm_corpus());
        let query = vec![0.0; 8];
        let err = search(&index, &query, 3).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidArgument { .. }));
    }

    #[test]
    fn test_k_beyond_corpus_size_returns_all_rows() {
        let index = build_index(&firearm_corpus());
        let encoder = HashingEncoder::new(64);
        let query = encoder.embed("firearm").unwrap();
        let results = search(&index, &query, 100).unwrap();
        assert_eq!(results.hits.len(), 3);
    }

    #[test]
    fn test_search_is_deterministic_including_tie_order() {
        let index = build_index(&firearm_corpus());
        let encoder = HashingEncoder::new(64);
        // "firearm" scores c1 and c2 identically; the tie must resolve to the
        // earlier row on every call
        let query = encoder.embed("firearm").unwrap();

        let first = search(&index, &query, 3).unwrap();
        for _ in 0..5 {
            let again = search(&index, &query, 3).unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(first.hits[0].case_id, "c1");
        assert_eq!(first.hits[1].case_id, "c2");
        assert!((first.hits[0].score - first.hits[1].score).abs() < 1e-6);
    }

    #[test]
    fn test_self_similarity_ranks_own_case_first() {
        let records = firearm_corpus();
        let index = build_index(&records);
        let encoder = HashingEncoder::new(64);

        for record in &records {
            let query = encoder
                .embed(&crate::text_processing::normalize(&record.text))
                .unwrap();
            let results = search(&index, &query, 1).unwrap();
            assert_eq!(results.hits[0].case_id, record.case_id);
            assert!((results.hits[0].score - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_scores_sorted_descending() {
        let index = build_index(&firearm_corpus());
        let encoder = HashingEncoder::new(64);
        let query = encoder.embed("possessing a firearm without permit").unwrap();
        let results = search(&index, &query, 3).unwrap();

        for pair in results.hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
