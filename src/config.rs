//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the case-retrieval engine,
//! supporting TOML files and environment variable overrides with validation
//! and type-safe access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, method-name verification
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Command line arguments (highest priority, applied by the binary)
//! 2. Environment variables (`CASE_RETRIEVAL_*`)
//! 3. Configuration files
//! 4. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use case_retrieval_engine::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Top-K: {}", config.retrieval.top_k);
//! ```

use crate::errors::{Result, RetrievalError};
use crate::predict::AggregationMethod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Corpus input settings
    pub corpus: CorpusConfig,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    /// Similarity search behavior
    pub retrieval: RetrievalConfig,
    /// Outcome prediction behavior
    pub prediction: PredictionConfig,
    /// Evaluation harness settings
    pub evaluation: EvaluationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Corpus input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the structured case corpus (JSON array of records) produced by
    /// the scraping/extraction collaborator
    pub corpus_path: PathBuf,
}

/// Embedding provider configuration. Model identity and dimensionality are
/// configuration, not core logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Encoder identifier resolved by `embedding::encoder_from_config`
    pub model: String,
    /// Vector dimension (must match the encoder output)
    pub dimension: usize,
    /// Batch size for embedding generation during index build
    pub batch_size: usize,
    /// Worker threads for parallel embedding during index build
    pub worker_threads: usize,
}

/// Similarity search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of top-ranked cases to retrieve per query
    pub top_k: usize,
}

/// Outcome prediction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Aggregation policy: "majority_vote" or "weighted_similarity"
    pub method: String,
}

/// Evaluation harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Persisted labeled-query file; bootstrapped by sampling when absent
    pub queries_path: PathBuf,
    /// Number of queries to sample when bootstrapping
    pub sample_queries: usize,
    /// Fixed seed for deterministic query sampling
    pub sample_seed: u64,
    /// Maximum characters of full text used as query fallback when a sampled
    /// case has no extractable outcome
    pub query_prefix_max_chars: usize,
    /// Directory for metric and detail report files
    pub output_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| RetrievalError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| RetrievalError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(corpus_path) = std::env::var("CASE_RETRIEVAL_CORPUS") {
            self.corpus.corpus_path = PathBuf::from(corpus_path);
        }
        if let Ok(queries_path) = std::env::var("CASE_RETRIEVAL_QUERIES") {
            self.evaluation.queries_path = PathBuf::from(queries_path);
        }
        if let Ok(top_k) = std::env::var("CASE_RETRIEVAL_TOP_K") {
            self.retrieval.top_k = top_k.parse().map_err(|_| RetrievalError::Config {
                message: "Invalid value in CASE_RETRIEVAL_TOP_K".to_string(),
            })?;
        }
        if let Ok(level) = std::env::var("CASE_RETRIEVAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(output_dir) = std::env::var("CASE_RETRIEVAL_OUTPUT_DIR") {
            self.evaluation.output_dir = PathBuf::from(output_dir);
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(RetrievalError::Config {
                message: "retrieval.top_k must be at least 1".to_string(),
            });
        }

        if self.embedding.dimension == 0 {
            return Err(RetrievalError::Config {
                message: "embedding.dimension must be greater than zero".to_string(),
            });
        }

        if self.embedding.batch_size == 0 {
            return Err(RetrievalError::Config {
                message: "embedding.batch_size must be greater than zero".to_string(),
            });
        }

        if self.embedding.worker_threads == 0 {
            return Err(RetrievalError::Config {
                message: "embedding.worker_threads must be greater than zero".to_string(),
            });
        }

        if self.evaluation.query_prefix_max_chars == 0 {
            return Err(RetrievalError::Config {
                message: "evaluation.query_prefix_max_chars must be greater than zero".to_string(),
            });
        }

        // Fail on unknown aggregation method names at load time rather than
        // mid-evaluation
        self.prediction
            .method
            .parse::<AggregationMethod>()
            .map_err(|e| RetrievalError::Config {
                message: format!("prediction.method: {}", e),
            })?;

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RetrievalError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig {
                corpus_path: PathBuf::from("./data/processed/cases.json"),
            },
            embedding: EmbeddingConfig {
                model: "feature-hash".to_string(),
                dimension: 256,
                batch_size: 32,
                worker_threads: num_cpus::get(),
            },
            retrieval: RetrievalConfig { top_k: 5 },
            prediction: PredictionConfig {
                method: "weighted_similarity".to_string(),
            },
            evaluation: EvaluationConfig {
                queries_path: PathBuf::from("./data/eval/queries.json"),
                sample_queries: 10,
                sample_seed: 42,
                query_prefix_max_chars: 500,
                output_dir: PathBuf::from("./data/eval"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}
