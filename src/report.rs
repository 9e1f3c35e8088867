//! # Report Module
//!
//! ## Purpose
//! Renders evaluation output for human inspection (fixed-width tables on
//! stdout) and persists the full results as timestamped JSON files for
//! downstream analysis.
//!
//! ## Input/Output Specification
//! - **Input**: `RetrievalEvaluation` and `PredictionLog` from the harness
//! - **Output**: Metric summary table, per-query detail table, prediction
//!   log table, miss list; JSON files under the configured output directory

use crate::errors::Result;
use crate::evaluation::{PredictionLog, RetrievalEvaluation, RetrievalMetrics, RetrievalMiss};
use crate::utils::preview;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Wrapper adding a generation timestamp to every persisted report
#[derive(Serialize)]
struct ReportEnvelope<T: Serialize> {
    generated_at: DateTime<Utc>,
    report: T,
}

/// Metric-name to averaged-value summary table
pub fn render_metrics_table(metrics: &RetrievalMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:>10}", "Metric", "Value");
    let _ = writeln!(out, "{:-<16} {:->10}", "", "");
    let _ = writeln!(out, "{:<16} {:>10.4}", format!("Accuracy@{}", metrics.k), metrics.accuracy_at_k);
    let _ = writeln!(out, "{:<16} {:>10.4}", format!("Precision@{}", metrics.k), metrics.precision_at_k);
    let _ = writeln!(out, "{:<16} {:>10.4}", format!("Recall@{}", metrics.k), metrics.recall_at_k);
    let _ = writeln!(out, "{:<16} {:>10.4}", format!("F1@{}", metrics.k), metrics.f1_at_k);
    let _ = writeln!(
        out,
        "({} evaluated, {} failed, {} unlabeled)",
        metrics.evaluated_queries, metrics.failed_queries, metrics.unlabeled_queries
    );
    out
}

/// Per-query detail table: hit flag, ground-truth score when retrieved, and
/// the ranked ids
pub fn render_retrieval_details(evaluation: &RetrievalEvaluation) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<5} {:>10}  {}",
        "Query", "Hit", "GT score", "Retrieved (id:score)"
    );

    for detail in &evaluation.details {
        let gt_score = match detail.ground_truth_score {
            Some(score) => format!("{:.4}", score),
            None => "-".to_string(),
        };
        let ranked = detail
            .retrieved
            .iter()
            .map(|hit| format!("{}:{:.4}", hit.case_id, hit.score))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            out,
            "{:<20} {:<5} {:>10}  {}",
            preview(&detail.query_id, 20),
            if detail.hit { "yes" } else { "no" },
            gt_score,
            preview(&ranked, 80)
        );
    }

    for failed in &evaluation.failed {
        let _ = writeln!(
            out,
            "{:<20} {:<5} {:>10}  failed: {}",
            preview(&failed.query_id, 20),
            "-",
            "-",
            preview(&failed.error, 60)
        );
    }

    out
}

/// Queries whose ground truth was not retrieved, with what was retrieved
/// instead
pub fn render_misses(misses: &[RetrievalMiss]) -> String {
    if misses.is_empty() {
        return "No retrieval misses.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Queries whose ground truth was not retrieved:");
    for miss in misses {
        let _ = writeln!(
            out,
            "- {} (ground truth {}): query \"{}\" retrieved [{}]",
            miss.query_id,
            miss.ground_truth_case_id,
            preview(&miss.query_text, 60),
            miss.retrieved_ids.join(", ")
        );
    }
    out
}

/// Predicted vs. ground-truth outcome per query
pub fn render_prediction_log(log: &PredictionLog) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Prediction log (method: {}, k = {})",
        log.method, log.k
    );
    let _ = writeln!(
        out,
        "{:<20} {:<40} {:<40} {}",
        "Query", "Predicted", "Ground truth", "Correct"
    );

    for entry in &log.entries {
        let ground_truth = entry.ground_truth_outcome.as_deref().unwrap_or("-");
        let correct = match entry.correct {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        let _ = writeln!(
            out,
            "{:<20} {:<40} {:<40} {}",
            preview(&entry.query_id, 20),
            preview(&entry.predicted_outcome, 40),
            preview(ground_truth, 40),
            correct
        );
    }

    if let Some(accuracy) = log.labeled_accuracy {
        let _ = writeln!(
            out,
            "Labeled accuracy: {:.4} over {} labeled queries",
            accuracy, log.labeled_entries
        );
    } else {
        let _ = writeln!(out, "No ground-truth outcomes available; log is unscored.");
    }

    out
}

/// Persist the evaluation output as JSON files under `output_dir`
pub fn write_reports<P: AsRef<Path>>(
    output_dir: P,
    evaluation: &RetrievalEvaluation,
    log: &PredictionLog,
) -> Result<()> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;
    let generated_at = Utc::now();

    write_json(
        &output_dir.join("retrieval_metrics.json"),
        &ReportEnvelope {
            generated_at,
            report: &evaluation.metrics,
        },
    )?;
    write_json(
        &output_dir.join("retrieval_details.json"),
        &ReportEnvelope {
            generated_at,
            report: evaluation,
        },
    )?;
    write_json(
        &output_dir.join("prediction_log.json"),
        &ReportEnvelope {
            generated_at,
            report: log,
        },
    )?;

    tracing::info!("Reports written to {:?}", output_dir);
    Ok(())
}

fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{FailedQuery, QueryRetrievalDetail};
    use crate::predict::AggregationMethod;

    fn sample_evaluation() -> RetrievalEvaluation {
        RetrievalEvaluation {
            metrics: RetrievalMetrics {
                k: 5,
                evaluated_queries: 2,
                failed_queries: 1,
                unlabeled_queries: 0,
                accuracy_at_k: 0.5,
                precision_at_k: 0.1,
                recall_at_k: 0.5,
                f1_at_k: 0.1667,
            },
            details: vec![QueryRetrievalDetail {
                query_id: "q_c1".to_string(),
                ground_truth_case_id: "c1".to_string(),
                hit: true,
                precision_at_k: 0.2,
                recall_at_k: 1.0,
                f1_at_k: 0.3333,
                ground_truth_score: Some(0.91),
                retrieved: Vec::new(),
            }],
            missed: vec![RetrievalMiss {
                query_id: "q_c9".to_string(),
                query_text: "unrelated facts".to_string(),
                ground_truth_case_id: "c9".to_string(),
                retrieved_ids: vec!["c1".to_string(), "c2".to_string()],
            }],
            failed: vec![FailedQuery {
                query_id: "q_bad".to_string(),
                error: "embedding failed".to_string(),
            }],
        }
    }

    fn sample_log() -> PredictionLog {
        PredictionLog {
            method: AggregationMethod::WeightedSimilarity,
            k: 5,
            entries: Vec::new(),
            failed: Vec::new(),
            labeled_entries: 0,
            labeled_accuracy: None,
        }
    }

    #[test]
    fn test_metrics_table_lists_all_four_metrics() {
        let table = render_metrics_table(&sample_evaluation().metrics);
        assert!(table.contains("Accuracy@5"));
        assert!(table.contains("Precision@5"));
        assert!(table.contains("Recall@5"));
        assert!(table.contains("F1@5"));
        assert!(table.contains("0.5000"));
    }

    #[test]
    fn test_details_table_marks_failed_queries() {
        let table = render_retrieval_details(&sample_evaluation());
        assert!(table.contains("q_c1"));
        assert!(table.contains("failed: embedding failed"));
    }

    #[test]
    fn test_miss_list_names_retrieved_ids() {
        let evaluation = sample_evaluation();
        let rendered = render_misses(&evaluation.missed);
        assert!(rendered.contains("q_c9"));
        assert!(rendered.contains("c1, c2"));
    }

    #[test]
    fn test_unlabeled_prediction_log_reports_unscored() {
        let rendered = render_prediction_log(&sample_log());
        assert!(rendered.contains("unscored"));
    }

    #[test]
    fn test_reports_are_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        write_reports(dir.path(), &sample_evaluation(), &sample_log()).unwrap();

        for file in [
            "retrieval_metrics.json",
            "retrieval_details.json",
            "prediction_log.json",
        ] {
            let path = dir.path().join(file);
            assert!(path.exists(), "{} should exist", file);
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.contains("generated_at"));
        }
    }
}
