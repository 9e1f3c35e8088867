//! # Case Index Module
//!
//! ## Purpose
//! Builds the immutable per-run snapshot over the full corpus: one embedding
//! vector plus one structured record per case, stored as a contiguous
//! row-major matrix aligned with parallel `case_id`/`outcome` columns so that
//! similarity search is a matrix scan rather than a per-record walk.
//!
//! ## Input/Output Specification
//! - **Input**: Case records, the injected text encoder, embedding settings
//! - **Output**: `CaseIndex` snapshot with build diagnostics (`IndexStats`)
//! - **Determinism**: Row order equals input record order after filtering, so
//!   similarity ties always resolve identically across runs
//!
//! ## Key Features
//! - One-shot build; a rebuild produces a new snapshot, never an in-place
//!   mutation, so retrieval in flight completes against a consistent view
//! - Read-only after construction; safe to share across concurrent searches
//! - Per-record failure isolation: an encoder failure skips that record
//!   instead of aborting the build
//! - Parallel batched embedding with exact row/record alignment

use crate::config::EmbeddingConfig;
use crate::embedding::TextEncoder;
use crate::errors::Result;
use crate::text_processing::normalize;
use crate::utils::preview;
use crate::CaseRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Immutable index snapshot over the corpus
pub struct CaseIndex {
    dimension: usize,
    /// Row-major matrix; row `i` spans `vectors[i * dimension .. (i + 1) * dimension]`
    vectors: Vec<f32>,
    case_ids: Vec<String>,
    outcomes: Vec<String>,
    stats: IndexStats,
}

/// Build diagnostics. Skipped records are excluded from retrieval and from
/// every evaluation denominator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Records offered to the build
    pub total_records: usize,
    /// Records embedded and indexed
    pub indexed: usize,
    /// Records whose normalized text was empty
    pub skipped_empty: usize,
    /// Records whose embedding failed or had the wrong dimension
    pub skipped_failed: usize,
    /// Records dropped because an earlier record already used their `case_id`
    pub skipped_duplicate: usize,
}

impl IndexStats {
    pub fn skipped_total(&self) -> usize {
        self.skipped_empty + self.skipped_failed + self.skipped_duplicate
    }
}

impl CaseIndex {
    /// Build an index snapshot from the full corpus. Does not mutate the
    /// caller-supplied records. Embedding runs on a dedicated thread pool with
    /// batch-sized work units; vector-to-record alignment is preserved exactly
    /// regardless of scheduling.
    pub fn build(
        records: &[CaseRecord],
        encoder: &dyn TextEncoder,
        config: &EmbeddingConfig,
    ) -> Result<CaseIndex> {
        let mut stats = IndexStats {
            total_records: records.len(),
            ..IndexStats::default()
        };

        let mut seen_ids: HashSet<&str> = HashSet::with_capacity(records.len());
        let mut candidates: Vec<(&CaseRecord, String)> = Vec::with_capacity(records.len());

        for record in records {
            if !seen_ids.insert(record.case_id.as_str()) {
                tracing::warn!(
                    case_id = %record.case_id,
                    "Duplicate case_id in corpus, keeping first occurrence"
                );
                stats.skipped_duplicate += 1;
                continue;
            }

            let normalized = normalize(&record.text);
            if normalized.is_empty() {
                tracing::warn!(
                    case_id = %record.case_id,
                    "Skipping case with empty normalized text"
                );
                stats.skipped_empty += 1;
                continue;
            }

            candidates.push((record, normalized));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .build()
            .map_err(|e| crate::internal_error!("Failed to build embedding thread pool: {}", e))?;

        // Indexed parallel iteration keeps results in candidate order
        let embedded: Vec<Result<Vec<f32>>> = pool.install(|| {
            candidates
                .par_iter()
                .with_min_len(config.batch_size.max(1))
                .map(|(_, text)| encoder.embed(text))
                .collect()
        });

        let dimension = encoder.dimension();
        let mut vectors = Vec::with_capacity(candidates.len() * dimension);
        let mut case_ids = Vec::with_capacity(candidates.len());
        let mut outcomes = Vec::with_capacity(candidates.len());

        for ((record, text), result) in candidates.iter().zip(embedded) {
            match result {
                Ok(vector) if vector.len() == dimension => {
                    vectors.extend_from_slice(&vector);
                    case_ids.push(record.case_id.clone());
                    outcomes.push(record.outcome.clone());
                }
                Ok(vector) => {
                    tracing::warn!(
                        case_id = %record.case_id,
                        expected = dimension,
                        actual = vector.len(),
                        "Skipping case with wrong embedding dimension"
                    );
                    stats.skipped_failed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        case_id = %record.case_id,
                        text_preview = %preview(text, 60),
                        "Skipping case whose embedding failed: {}",
                        e
                    );
                    stats.skipped_failed += 1;
                }
            }
        }

        stats.indexed = case_ids.len();
        tracing::info!(
            indexed = stats.indexed,
            skipped = stats.skipped_total(),
            "Case index built"
        );

        Ok(CaseIndex {
            dimension,
            vectors,
            case_ids,
            outcomes,
            stats,
        })
    }

    /// Number of indexed cases
    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }

    /// Embedding dimension of every row
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Vector row for case `i`
    pub fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn case_id(&self, i: usize) -> &str {
        &self.case_ids[i]
    }

    pub fn outcome(&self, i: usize) -> &str {
        &self.outcomes[i]
    }

    pub fn case_ids(&self) -> &[String] {
        &self.case_ids
    }

    /// Outcome lookup table for the predictor
    pub fn outcome_lookup(&self) -> HashMap<String, String> {
        self.case_ids
            .iter()
            .cloned()
            .zip(self.outcomes.iter().cloned())
            .collect()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEncoder;
    use crate::errors::RetrievalError;

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            model: "feature-hash".to_string(),
            dimension: 64,
            batch_size: 4,
            worker_threads: 2,
        }
    }

    /// Encoder that fails on marked texts, for failure-isolation tests
    struct FlakyEncoder {
        inner: HashingEncoder,
    }

    impl TextEncoder for FlakyEncoder {
        fn id(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("unencodable") {
                return Err(RetrievalError::EmbeddingFailed {
                    text_preview: text.to_string(),
                    reason: "marked unencodable".to_string(),
                });
            }
            self.inner.embed(text)
        }
    }

    #[test]
    fn test_row_order_matches_input_order() {
        let records = vec![
            CaseRecord::new("c1", "theft of firearm", "A"),
            CaseRecord::new("c2", "illegal firearm possession", "A"),
            CaseRecord::new("c3", "drug trafficking", "B"),
        ];
        let encoder = HashingEncoder::new(64);
        let index = CaseIndex::build(&records, &encoder, &test_config()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.case_id(0), "c1");
        assert_eq!(index.case_id(1), "c2");
        assert_eq!(index.case_id(2), "c3");
        assert_eq!(index.outcome(2), "B");
    }

    #[test]
    fn test_empty_text_records_are_excluded() {
        let records = vec![
            CaseRecord::new("c1", "theft of firearm", "A"),
            CaseRecord::new("c2", "", "A"),
            CaseRecord::new("c3", "???", "B"),
        ];
        let encoder = HashingEncoder::new(64);
        let index = CaseIndex::build(&records, &encoder, &test_config()).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.stats().skipped_empty, 2);
        assert_eq!(index.case_id(0), "c1");
    }

    #[test]
    fn test_duplicate_case_id_keeps_first_occurrence() {
        let records = vec![
            CaseRecord::new("c1", "theft of firearm", "A"),
            CaseRecord::new("c1", "drug trafficking", "B"),
        ];
        let encoder = HashingEncoder::new(64);
        let index = CaseIndex::build(&records, &encoder, &test_config()).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.stats().skipped_duplicate, 1);
        assert_eq!(index.outcome(0), "A");
    }

    #[test]
    fn test_embedding_failure_skips_only_that_record() {
        let records = vec![
            CaseRecord::new("c1", "theft of firearm", "A"),
            CaseRecord::new("c2", "unencodable ruling text", "B"),
            CaseRecord::new("c3", "drug trafficking", "B"),
        ];
        let encoder = FlakyEncoder {
            inner: HashingEncoder::new(64),
        };
        let index = CaseIndex::build(&records, &encoder, &test_config()).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.stats().skipped_failed, 1);
        assert_eq!(index.case_id(0), "c1");
        assert_eq!(index.case_id(1), "c3");
    }

    #[test]
    fn test_rows_have_index_dimension() {
        let records = vec![CaseRecord::new("c1", "theft of firearm", "A")];
        let encoder = HashingEncoder::new(64);
        let index = CaseIndex::build(&records, &encoder, &test_config()).unwrap();

        assert_eq!(index.dimension(), 64);
        assert_eq!(index.row(0).len(), 64);
    }

    #[test]
    fn test_outcome_lookup_covers_all_rows() {
        let records = vec![
            CaseRecord::new("c1", "theft of firearm", "A"),
            CaseRecord::new("c2", "drug trafficking", "B"),
        ];
        let encoder = HashingEncoder::new(64);
        let index = CaseIndex::build(&records, &encoder, &test_config()).unwrap();

        let lookup = index.outcome_lookup();
        assert_eq!(lookup.get("c1").map(String::as_str), Some("A"));
        assert_eq!(lookup.get("c2").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_empty_corpus_builds_empty_index() {
        let encoder = HashingEncoder::new(64);
        let index = CaseIndex::build(&[], &encoder, &test_config()).unwrap();
        assert!(index.is_empty());
    }
}
