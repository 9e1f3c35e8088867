//! # Case-Based Legal Retrieval Engine
//!
//! ## Overview
//! This library implements case-based reasoning over a corpus of legal rulings:
//! given a free-text description of a new case, it retrieves the most
//! semantically similar prior cases and aggregates their recorded outcomes into
//! a predicted resolution.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `corpus`: Loading and validation of the structured case corpus
//! - `text_processing`: Deterministic normalization shared by documents and queries
//! - `embedding`: Injected text-encoder capability and the built-in hash encoder
//! - `index`: Immutable per-run case index (vector matrix + aligned records)
//! - `search`: Cosine top-K similarity search with deterministic tie-breaking
//! - `predict`: Outcome aggregation over retrieved cases
//! - `evaluation`: Labeled-query evaluation harness with retrieval/prediction metrics
//! - `report`: Metric tables and JSON report persistence
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Structured case records (JSON) from the ingestion collaborator,
//!   free-text queries, optional labeled query files
//! - **Output**: Ranked retrieval results, predicted outcomes, averaged
//!   retrieval/prediction metrics with per-query detail
//! - **Determinism**: Identical corpus + query + encoder always produce
//!   identical rankings, including tie order
//!
//! ## Usage
//! ```rust,no_run
//! use case_retrieval_engine::{
//!     config::Config,
//!     corpus,
//!     embedding::{encoder_from_config, TextEncoder},
//!     index::CaseIndex,
//!     search::search,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let records = corpus::load_corpus(&config.corpus.corpus_path)?;
//!     let encoder = encoder_from_config(&config.embedding)?;
//!     let index = CaseIndex::build(&records, encoder.as_ref(), &config.embedding)?;
//!     let query = encoder.embed("illegal possession of a firearm")?;
//!     let results = search(&index, &query, 5)?;
//!     println!("Found {} similar cases", results.hits.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod corpus;
pub mod text_processing;
pub mod embedding;
pub mod index;
pub mod search;
pub mod predict;
pub mod evaluation;
pub mod report;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, RetrievalError};
pub use index::CaseIndex;
pub use predict::{AggregationMethod, PredictionResult};
pub use search::{RetrievalHit, RetrievalResult};

use serde::{Deserialize, Serialize};

/// Sentinel outcome value for cases where the ingestion collaborator could not
/// extract a resolution. Carried through the index but excluded from outcome
/// aggregation.
pub const OUTCOME_UNAVAILABLE: &str = "unavailable";

/// Sentinel returned by the predictor when no retrieved case carries a usable
/// outcome. A sparse corpus is an expected condition, not an error.
pub const NO_PREDICTION: &str = "no prediction available";

/// One corpus entry as produced by the out-of-scope scraping/extraction
/// collaborator. The engine treats every field except `case_id`, `text` and
/// `outcome` as opaque carried-through metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Unique, stable identifier assigned at ingestion; never regenerated here
    pub case_id: String,
    /// Full ruling text used for embedding (normalized before encoding)
    pub text: String,
    /// Extracted resolution label; `OUTCOME_UNAVAILABLE` when extraction failed
    #[serde(default = "default_outcome")]
    pub outcome: String,
    /// Court docket number
    #[serde(default)]
    pub docket_number: Option<String>,
    /// Decision date as recorded by the ingestion collaborator
    #[serde(default)]
    pub decision_date: Option<String>,
    /// Statute references cited in the ruling
    #[serde(default)]
    pub statute_refs: Vec<String>,
    /// Parties to the case
    #[serde(default)]
    pub parties: Vec<String>,
}

fn default_outcome() -> String {
    OUTCOME_UNAVAILABLE.to_string()
}

impl CaseRecord {
    /// Create a minimal record with id, text and outcome. Metadata fields are
    /// left empty; they are never interpreted by the engine.
    pub fn new(
        case_id: impl Into<String>,
        text: impl Into<String>,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            text: text.into(),
            outcome: outcome.into(),
            docket_number: None,
            decision_date: None,
            statute_refs: Vec::new(),
            parties: Vec::new(),
        }
    }

    /// Whether this record carries a real extracted outcome rather than the
    /// unavailability sentinel.
    pub fn has_outcome(&self) -> bool {
        self.outcome != OUTCOME_UNAVAILABLE && !self.outcome.trim().is_empty()
    }
}
