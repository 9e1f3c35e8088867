//! # Corpus Input Module
//!
//! ## Purpose
//! Loads the structured case corpus produced by the out-of-scope
//! scraping/extraction collaborator. The engine treats the corpus as an opaque
//! input contract: a sequence of records exposing `case_id`, `text` and
//! `outcome`, with any additional metadata carried through uninterpreted.
//!
//! ## Input/Output Specification
//! - **Input**: JSON file containing an array of case records
//! - **Output**: `Vec<CaseRecord>` with missing outcome fields normalized to
//!   the unavailability sentinel
//! - **Policy**: fields the extractor could not derive arrive as sentinels,
//!   never guessed defaults

use crate::errors::{Result, RetrievalError};
use crate::{CaseRecord, OUTCOME_UNAVAILABLE};
use std::path::Path;

/// Load the case corpus from a JSON file. Blank outcome strings are mapped to
/// the unavailability sentinel so downstream aggregation never mistakes an
/// extraction gap for a real label.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<CaseRecord>> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|e| RetrievalError::CorpusFormat {
        file: path.display().to_string(),
        details: format!("unable to read corpus file: {}", e),
    })?;

    let mut records: Vec<CaseRecord> =
        serde_json::from_str(&content).map_err(|e| RetrievalError::CorpusFormat {
            file: path.display().to_string(),
            details: format!("invalid corpus JSON: {}", e),
        })?;

    for record in &mut records {
        if record.outcome.trim().is_empty() {
            record.outcome = OUTCOME_UNAVAILABLE.to_string();
        }
    }

    if records.is_empty() {
        tracing::warn!("Corpus file {:?} contains no records", path);
    } else {
        tracing::info!("Loaded {} case records from {:?}", records.len(), path);
    }

    Ok(records)
}
