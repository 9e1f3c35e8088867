//! # Evaluation Harness Module
//!
//! ## Purpose
//! Runs labeled queries through similarity search and outcome prediction and
//! computes retrieval/prediction quality metrics with per-query failure
//! diagnostics. Also provides the deterministic query-sampling procedure used
//! to bootstrap a labeled query set from the corpus itself.
//!
//! ## Input/Output Specification
//! - **Input**: Query sequence (file-backed or sampled), case index, encoder,
//!   `k`, aggregation method
//! - **Output**: Averaged retrieval metrics (Accuracy/Precision/Recall/F1 @K),
//!   per-query detail rows, a failure list for missed ground truths, and a
//!   prediction log
//! - **Failure isolation**: a query whose embedding fails is recorded as a
//!   failed query and excluded from every average; it is never scored as zero
//!
//! ## Metric Definitions
//! Per query with a ground-truth case id: `hit@k` is 1 when the ground truth
//! appears in the top-k (this doubles as Accuracy@K), `precision@k = hit/k`,
//! `recall@k = hit` (single relevant item per query by construction), and
//! `f1@k` is their harmonic mean, defined as 0 when both are 0.

use crate::embedding::TextEncoder;
use crate::errors::{Result, RetrievalError};
use crate::index::CaseIndex;
use crate::predict::{predict, AggregationMethod};
use crate::search::{search, RetrievalHit};
use crate::text_processing::{bounded_prefix, normalize};
use crate::CaseRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labeled (or unlabeled) evaluation query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub query_id: String,
    pub query_text: String,
    #[serde(default)]
    pub ground_truth_case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_outcome: Option<String>,
}

/// Averaged retrieval metrics over the successfully evaluated labeled queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub k: usize,
    /// Labeled queries that were scored
    pub evaluated_queries: usize,
    /// Queries that could not be evaluated (embedding or search failure)
    pub failed_queries: usize,
    /// Queries without a ground-truth case id, excluded from the averages
    pub unlabeled_queries: usize,
    pub accuracy_at_k: f64,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub f1_at_k: f64,
}

/// Per-query retrieval detail for failure analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRetrievalDetail {
    pub query_id: String,
    pub ground_truth_case_id: String,
    pub hit: bool,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub f1_at_k: f64,
    /// Ground truth's similarity score when it was retrieved in the top-k;
    /// `None` when it was not (never a silent 0.0)
    pub ground_truth_score: Option<f32>,
    /// Full ranked result for this query
    pub retrieved: Vec<RetrievalHit>,
}

/// A query whose ground-truth case was not retrieved in the top-k
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMiss {
    pub query_id: String,
    pub query_text: String,
    pub ground_truth_case_id: String,
    pub retrieved_ids: Vec<String>,
}

/// A query that could not be evaluated at all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedQuery {
    pub query_id: String,
    pub error: String,
}

/// Full retrieval-evaluation output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalEvaluation {
    pub metrics: RetrievalMetrics,
    pub details: Vec<QueryRetrievalDetail>,
    /// Queries whose ground truth was missed, for downstream inspection
    pub missed: Vec<RetrievalMiss>,
    pub failed: Vec<FailedQuery>,
}

/// One prediction-evaluation row. `correct` is `None` when the query carries
/// no ground-truth outcome; absence of labels is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub query_id: String,
    pub predicted_outcome: String,
    pub ground_truth_outcome: Option<String>,
    pub correct: Option<bool>,
    pub supporting_case_ids: Vec<String>,
}

/// Full prediction-evaluation output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLog {
    pub method: AggregationMethod,
    pub k: usize,
    pub entries: Vec<PredictionLogEntry>,
    pub failed: Vec<FailedQuery>,
    /// Entries with a ground-truth outcome
    pub labeled_entries: usize,
    /// Share of labeled entries predicted correctly; `None` without labels
    pub labeled_accuracy: Option<f64>,
}

/// Embed one query text through the shared normalizer. The same
/// normalization path as corpus documents keeps both sides of the similarity
/// comparison in one vector space.
fn embed_query(encoder: &dyn TextEncoder, query_text: &str) -> Result<Vec<f32>> {
    encoder.embed(&normalize(query_text))
}

/// Evaluate retrieval quality over labeled queries.
pub fn evaluate_retrieval(
    queries: &[Query],
    index: &CaseIndex,
    encoder: &dyn TextEncoder,
    k: usize,
) -> Result<RetrievalEvaluation> {
    if k < 1 {
        return Err(RetrievalError::invalid_argument("k", "must be at least 1"));
    }
    if index.is_empty() {
        return Err(RetrievalError::EmptyIndex {
            skipped_records: index.stats().skipped_total(),
        });
    }

    let mut details = Vec::new();
    let mut missed = Vec::new();
    let mut failed = Vec::new();
    let mut unlabeled = 0usize;

    let mut accuracy_sum = 0.0f64;
    let mut precision_sum = 0.0f64;
    let mut recall_sum = 0.0f64;
    let mut f1_sum = 0.0f64;

    for query in queries {
        let Some(ground_truth_id) = query.ground_truth_case_id.as_deref() else {
            tracing::debug!(
                query_id = %query.query_id,
                "Query has no ground-truth case id, excluded from retrieval metrics"
            );
            unlabeled += 1;
            continue;
        };

        let retrieval = match embed_query(encoder, &query.query_text)
            .and_then(|vector| search(index, &vector, k))
        {
            Ok(retrieval) => retrieval,
            Err(e) => {
                tracing::warn!(query_id = %query.query_id, "Query evaluation failed: {}", e);
                failed.push(FailedQuery {
                    query_id: query.query_id.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let hit = retrieval.contains(ground_truth_id);
        let hit_value = if hit { 1.0 } else { 0.0 };
        let precision = hit_value / k as f64;
        let recall = hit_value;
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        accuracy_sum += hit_value;
        precision_sum += precision;
        recall_sum += recall;
        f1_sum += f1;

        if !hit {
            missed.push(RetrievalMiss {
                query_id: query.query_id.clone(),
                query_text: query.query_text.clone(),
                ground_truth_case_id: ground_truth_id.to_string(),
                retrieved_ids: retrieval.case_ids(),
            });
        }

        details.push(QueryRetrievalDetail {
            query_id: query.query_id.clone(),
            ground_truth_case_id: ground_truth_id.to_string(),
            hit,
            precision_at_k: precision,
            recall_at_k: recall,
            f1_at_k: f1,
            ground_truth_score: retrieval.score_of(ground_truth_id),
            retrieved: retrieval.hits,
        });
    }

    let evaluated = details.len();
    // Averages over scored queries only; an all-failed batch reports zeros
    // with the failure counts alongside rather than dividing by zero
    let denominator = if evaluated == 0 { 1.0 } else { evaluated as f64 };
    let metrics = RetrievalMetrics {
        k,
        evaluated_queries: evaluated,
        failed_queries: failed.len(),
        unlabeled_queries: unlabeled,
        accuracy_at_k: accuracy_sum / denominator,
        precision_at_k: precision_sum / denominator,
        recall_at_k: recall_sum / denominator,
        f1_at_k: f1_sum / denominator,
    };

    tracing::info!(
        evaluated = metrics.evaluated_queries,
        failed = metrics.failed_queries,
        accuracy = metrics.accuracy_at_k,
        "Retrieval evaluation complete"
    );

    Ok(RetrievalEvaluation {
        metrics,
        details,
        missed,
        failed,
    })
}

/// Evaluate outcome prediction over queries. Queries without a ground-truth
/// outcome are logged unscored.
pub fn evaluate_prediction(
    queries: &[Query],
    index: &CaseIndex,
    encoder: &dyn TextEncoder,
    k: usize,
    method: AggregationMethod,
) -> Result<PredictionLog> {
    if k < 1 {
        return Err(RetrievalError::invalid_argument("k", "must be at least 1"));
    }
    if index.is_empty() {
        return Err(RetrievalError::EmptyIndex {
            skipped_records: index.stats().skipped_total(),
        });
    }

    let outcome_lookup = index.outcome_lookup();
    let mut entries = Vec::new();
    let mut failed = Vec::new();
    let mut labeled = 0usize;
    let mut correct_count = 0usize;

    for query in queries {
        let retrieval = match embed_query(encoder, &query.query_text)
            .and_then(|vector| search(index, &vector, k))
        {
            Ok(retrieval) => retrieval,
            Err(e) => {
                tracing::warn!(query_id = %query.query_id, "Prediction failed: {}", e);
                failed.push(FailedQuery {
                    query_id: query.query_id.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let prediction = predict(&retrieval, &outcome_lookup, method);

        let correct = query
            .ground_truth_outcome
            .as_deref()
            .map(|gt| gt == prediction.predicted_outcome);
        if let Some(is_correct) = correct {
            labeled += 1;
            if is_correct {
                correct_count += 1;
            }
        }

        entries.push(PredictionLogEntry {
            query_id: query.query_id.clone(),
            predicted_outcome: prediction.predicted_outcome,
            ground_truth_outcome: query.ground_truth_outcome.clone(),
            correct,
            supporting_case_ids: prediction.supporting_case_ids,
        });
    }

    let labeled_accuracy = if labeled > 0 {
        Some(correct_count as f64 / labeled as f64)
    } else {
        None
    };

    tracing::info!(
        entries = entries.len(),
        labeled,
        ?labeled_accuracy,
        "Prediction evaluation complete"
    );

    Ok(PredictionLog {
        method,
        k,
        entries,
        failed,
        labeled_entries: labeled,
        labeled_accuracy,
    })
}

/// Deterministically sample `n` labeled queries from the corpus. Each sampled
/// case contributes a query built from its own outcome text, falling back to a
/// bounded-length prefix of its full text when no outcome is extractable; the
/// case's own id (and outcome, when available) becomes the ground truth.
/// Records the index would skip are never sampled.
pub fn sample_queries(
    records: &[CaseRecord],
    n: usize,
    seed: u64,
    prefix_max_chars: usize,
) -> Vec<Query> {
    let embeddable: Vec<&CaseRecord> = records
        .iter()
        .filter(|r| !normalize(&r.text).is_empty())
        .collect();

    // Prefer cases with an extracted outcome; widen to the whole embeddable
    // pool when there are not enough of them
    let labeled: Vec<&CaseRecord> = embeddable
        .iter()
        .copied()
        .filter(|r| r.has_outcome())
        .collect();
    let pool: &[&CaseRecord] = if labeled.len() >= n {
        &labeled
    } else {
        tracing::warn!(
            labeled = labeled.len(),
            requested = n,
            "Not enough cases with extracted outcomes, sampling from the full corpus"
        );
        &embeddable
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let sampled: Vec<&&CaseRecord> = pool.choose_multiple(&mut rng, n.min(pool.len())).collect();

    sampled
        .into_iter()
        .map(|record| {
            let query_text = if record.has_outcome() {
                record.outcome.clone()
            } else {
                bounded_prefix(&record.text, prefix_max_chars)
            };
            Query {
                query_id: format!("q_{}", record.case_id),
                query_text,
                ground_truth_case_id: Some(record.case_id.clone()),
                ground_truth_outcome: record.has_outcome().then(|| record.outcome.clone()),
            }
        })
        .collect()
}

/// Load a persisted query file (JSON array of query records)
pub fn load_queries<P: AsRef<Path>>(path: P) -> Result<Vec<Query>> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|e| RetrievalError::QueryFile {
        file: path.display().to_string(),
        details: format!("unable to read query file: {}", e),
    })?;

    let queries: Vec<Query> =
        serde_json::from_str(&content).map_err(|e| RetrievalError::QueryFile {
            file: path.display().to_string(),
            details: format!("invalid query JSON: {}", e),
        })?;

    tracing::info!("Loaded {} queries from {:?}", queries.len(), path);
    Ok(queries)
}

/// Persist queries as a JSON file, creating parent directories as needed
pub fn save_queries<P: AsRef<Path>>(path: P, queries: &[Query]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(queries)?;
    std::fs::write(path, content)?;
    tracing::info!("Saved {} queries to {:?}", queries.len(), path);
    Ok(())
}
