//! # Embedding Provider Module
//!
//! ## Purpose
//! Capability boundary between the retrieval engine and vector production.
//! The engine is agnostic to model identity, vector dimensionality, and
//! whether encoding runs locally or remotely; it only requires that encoding
//! is deterministic for identical normalized input within one run.
//!
//! ## Input/Output Specification
//! - **Input**: Normalized text (see `text_processing::normalize`)
//! - **Output**: Fixed-length dense `Vec<f32>` per text
//! - **Contract**: `embed` is deterministic within a run; failures are
//!   isolated per item by the callers
//!
//! ## Key Features
//! - `TextEncoder` trait as the single injected seam for all vector production
//! - Deterministic FNV-1a feature-hashing encoder usable without any model
//!   assets, for bootstrap runs and tests
//! - Config-driven encoder selection; transformer-backed encoders plug in
//!   behind the same trait

use crate::config::EmbeddingConfig;
use crate::errors::{Result, RetrievalError};

/// Injected text-encoder capability. One implementation is constructed per
/// session and shared read-only across index build and query evaluation.
pub trait TextEncoder: Send + Sync {
    /// Stable identifier of the encoder (model name)
    fn id(&self) -> &str;

    /// Output vector dimension; every `embed` result has exactly this length
    fn dimension(&self) -> usize;

    /// Encode one normalized text into a dense vector
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Deterministic feature-hashing encoder. Tokens are hashed with FNV-1a into
/// signed buckets and the resulting term-frequency vector is L2-normalized,
/// so identical texts embed to identical unit vectors and cosine
/// self-similarity is exactly 1.0.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimension: usize,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl HashingEncoder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash = FNV_OFFSET;
        for byte in token.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }
}

impl TextEncoder for HashingEncoder {
    fn id(&self) -> &str {
        "feature-hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let hash = Self::fnv1a(token);
            let bucket = (hash % self.dimension as u64) as usize;
            // Top hash bit selects the sign, spreading collisions around zero
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }
}

/// Resolve the configured encoder by name. Unknown names fail at configuration
/// time rather than mid-build.
pub fn encoder_from_config(config: &EmbeddingConfig) -> Result<Box<dyn TextEncoder>> {
    match config.model.as_str() {
        "feature-hash" => Ok(Box::new(HashingEncoder::new(config.dimension))),
        other => Err(RetrievalError::Config {
            message: format!(
                "Unknown embedding model '{}' (available: feature-hash)",
                other
            ),
        }),
    }
}
