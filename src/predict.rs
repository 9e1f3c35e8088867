//! # Outcome Prediction Module
//!
//! ## Purpose
//! Aggregates the outcome labels of the top-K retrieved cases into a single
//! predicted resolution under a selectable aggregation policy.
//!
//! ## Input/Output Specification
//! - **Input**: Ranked retrieval result, case-id to outcome lookup, policy
//! - **Output**: `PredictionResult` with the winning outcome, the supporting
//!   case ids in aggregation order, and the policy used
//! - **Sentinels**: Cases with an unavailable outcome never influence either
//!   policy; when nothing usable remains the prediction is the
//!   `NO_PREDICTION` sentinel, not an error
//!
//! ## Tie-Breaking
//! Both policies break ties by the order outcomes first appear in the
//! retrieval ranking: the outcome backed by the highest-similarity case wins.
//! This is explicit and deterministic rather than an unspecified
//! "first maximum".

use crate::search::RetrievalResult;
use crate::{NO_PREDICTION, OUTCOME_UNAVAILABLE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Outcome aggregation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    /// Most frequent outcome among the retained retrieved cases wins
    MajorityVote,
    /// Outcome with the highest summed similarity across its retrieved cases
    /// wins
    WeightedSimilarity,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::MajorityVote => "majority_vote",
            AggregationMethod::WeightedSimilarity => "weighted_similarity",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = crate::errors::RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "majority_vote" => Ok(AggregationMethod::MajorityVote),
            "weighted_similarity" => Ok(AggregationMethod::WeightedSimilarity),
            other => Err(crate::errors::RetrievalError::invalid_argument(
                "method",
                format!(
                    "unknown aggregation method '{}' (expected majority_vote or weighted_similarity)",
                    other
                ),
            )),
        }
    }
}

/// Predicted resolution with traceability back to the retrieved cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_outcome: String,
    /// Every retrieved case id in ranking order, including cases whose
    /// outcome was unavailable and therefore excluded from aggregation
    pub supporting_case_ids: Vec<String>,
    pub method: AggregationMethod,
}

/// Per-outcome aggregation state, keyed by first appearance in the ranking
struct Tally {
    count: usize,
    weight: f64,
}

/// Aggregate retrieved outcomes into a prediction. Ids missing from the
/// lookup are treated as unavailable, matching the contract that untrusted
/// fields arrive as explicit sentinels rather than guessed defaults.
pub fn predict(
    retrieval: &RetrievalResult,
    outcome_lookup: &HashMap<String, String>,
    method: AggregationMethod,
) -> PredictionResult {
    let supporting_case_ids = retrieval.case_ids();

    // Rank-ordered (outcome, score) pairs with sentinel outcomes discarded
    let retained: Vec<(&str, f32)> = retrieval
        .hits
        .iter()
        .filter_map(|hit| {
            let outcome = outcome_lookup
                .get(&hit.case_id)
                .map(String::as_str)
                .unwrap_or(OUTCOME_UNAVAILABLE);
            if outcome == OUTCOME_UNAVAILABLE || outcome.trim().is_empty() {
                None
            } else {
                Some((outcome, hit.score))
            }
        })
        .collect();

    if retained.is_empty() {
        return PredictionResult {
            predicted_outcome: NO_PREDICTION.to_string(),
            supporting_case_ids,
            method,
        };
    }

    let mut first_seen: Vec<&str> = Vec::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for &(outcome, score) in &retained {
        let tally = tallies.entry(outcome).or_insert_with(|| {
            first_seen.push(outcome);
            Tally {
                count: 0,
                weight: 0.0,
            }
        });
        tally.count += 1;
        tally.weight += f64::from(score);
    }

    // Iterating in first-appearance order and replacing only on a strictly
    // better value resolves ties to the outcome whose best case ranks highest
    let mut winner = first_seen[0];
    for &outcome in first_seen.iter().skip(1) {
        let better = match method {
            AggregationMethod::MajorityVote => tallies[outcome].count > tallies[winner].count,
            AggregationMethod::WeightedSimilarity => {
                tallies[outcome].weight > tallies[winner].weight
            }
        };
        if better {
            winner = outcome;
        }
    }

    PredictionResult {
        predicted_outcome: winner.to_string(),
        supporting_case_ids,
        method,
    }
}
