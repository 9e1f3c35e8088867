//! # Case-Retrieval Engine Main Driver
//!
//! ## Purpose
//! Batch entry point: loads the case corpus, builds the per-run index,
//! loads or bootstraps the labeled query set, runs the evaluation harness
//! over retrieval and prediction, and emits metric tables plus JSON reports.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment
//!   variables, corpus JSON, optional query JSON
//! - **Output**: Metric tables on stdout, JSON reports in the output
//!   directory, bootstrapped query file when none existed
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Load the corpus and build the case index
//! 4. Load the query file, or sample one deterministically from the corpus
//! 5. Evaluate retrieval and prediction
//! 6. Render tables and persist reports

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use case_retrieval_engine::{
    config::Config,
    corpus,
    embedding::{encoder_from_config, TextEncoder},
    errors::{Result, RetrievalError},
    evaluation::{self, evaluate_prediction, evaluate_retrieval, Query},
    index::CaseIndex,
    predict::AggregationMethod,
    report,
    utils::Timer,
    CaseRecord,
};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("case-retrieval")
        .version("0.1.0")
        .author("Legal Search Team")
        .about("Case-based retrieval and outcome prediction over a legal ruling corpus")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("corpus")
                .long("corpus")
                .value_name("FILE")
                .help("Case corpus JSON file (overrides configuration)"),
        )
        .arg(
            Arg::new("queries")
                .long("queries")
                .value_name("FILE")
                .help("Labeled query JSON file (overrides configuration)"),
        )
        .arg(
            Arg::new("top-k")
                .short('k')
                .long("top-k")
                .value_name("K")
                .help("Number of cases to retrieve per query")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("method")
                .short('m')
                .long("method")
                .value_name("METHOD")
                .help("Aggregation method: majority_vote or weighted_similarity"),
        )
        .arg(
            Arg::new("sample-queries")
                .long("sample-queries")
                .value_name("N")
                .help("Number of queries to sample when bootstrapping")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .value_name("DIR")
                .help("Report output directory (overrides configuration)"),
        )
        .arg(
            Arg::new("bootstrap-queries")
                .long("bootstrap-queries")
                .help("Regenerate the query file by sampling even if it exists")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration and apply CLI overrides
    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(corpus_path) = matches.get_one::<String>("corpus") {
        config.corpus.corpus_path = corpus_path.into();
    }
    if let Some(queries_path) = matches.get_one::<String>("queries") {
        config.evaluation.queries_path = queries_path.into();
    }
    if let Some(top_k) = matches.get_one::<usize>("top-k") {
        config.retrieval.top_k = *top_k;
    }
    if let Some(method) = matches.get_one::<String>("method") {
        config.prediction.method = method.clone();
    }
    if let Some(sample_queries) = matches.get_one::<usize>("sample-queries") {
        config.evaluation.sample_queries = *sample_queries;
    }
    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        config.evaluation.output_dir = output_dir.into();
    }

    init_logging(&config)?;

    info!("Starting case-retrieval engine v0.1.0");
    info!("Configuration loaded from: {}", config_path);

    let method: AggregationMethod = config
        .prediction
        .method
        .parse()
        .context("invalid aggregation method")?;

    // Build the per-run index snapshot
    let records = corpus::load_corpus(&config.corpus.corpus_path)
        .context("failed to load the case corpus")?;

    let encoder = encoder_from_config(&config.embedding)?;
    info!(
        "Building case index with encoder '{}' (dimension {})",
        encoder.id(),
        encoder.dimension()
    );
    let timer = Timer::new("index-build");
    let index = CaseIndex::build(&records, encoder.as_ref(), &config.embedding)?;
    info!(
        "Indexed {} of {} cases in {}ms ({} skipped)",
        index.len(),
        records.len(),
        timer.stop(),
        index.stats().skipped_total()
    );

    let queries =
        load_or_bootstrap_queries(&config, &records, matches.get_flag("bootstrap-queries"))?;
    anyhow::ensure!(
        !queries.is_empty(),
        "no evaluation queries available (corpus too small to sample from?)"
    );

    // Evaluate both axes against the same snapshot
    let k = config.retrieval.top_k;
    let retrieval_evaluation = evaluate_retrieval(&queries, &index, encoder.as_ref(), k)
        .context("retrieval evaluation failed")?;
    let prediction_log = evaluate_prediction(&queries, &index, encoder.as_ref(), k, method)
        .context("prediction evaluation failed")?;

    println!("{}", report::render_metrics_table(&retrieval_evaluation.metrics));
    println!("{}", report::render_retrieval_details(&retrieval_evaluation));
    println!("{}", report::render_misses(&retrieval_evaluation.missed));
    println!("{}", report::render_prediction_log(&prediction_log));

    report::write_reports(
        &config.evaluation.output_dir,
        &retrieval_evaluation,
        &prediction_log,
    )
    .context("failed to write reports")?;

    info!("Evaluation complete");
    Ok(())
}

/// Initialize logging and tracing from configuration
fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level).map_err(|_| {
        RetrievalError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        }
    })?;

    let registry = tracing_subscriber::registry();
    if config.logging.json_format {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_filter(filter),
            )
            .init();
    }

    Ok(())
}

/// Use the persisted query file when it is present and usable; otherwise
/// sample a deterministic, self-labeled query set from the corpus and persist
/// it for the next run.
fn load_or_bootstrap_queries(
    config: &Config,
    records: &[CaseRecord],
    force_bootstrap: bool,
) -> anyhow::Result<Vec<Query>> {
    let path = &config.evaluation.queries_path;

    if !force_bootstrap && path.exists() {
        match evaluation::load_queries(path) {
            Ok(queries) if !queries.is_empty() => return Ok(queries),
            Ok(_) => warn!("Query file {:?} is empty, regenerating", path),
            Err(e) => warn!("Query file {:?} is unusable ({}), regenerating", path, e),
        }
    }

    let queries = evaluation::sample_queries(
        records,
        config.evaluation.sample_queries,
        config.evaluation.sample_seed,
        config.evaluation.query_prefix_max_chars,
    );
    evaluation::save_queries(path, &queries).context("failed to persist sampled queries")?;
    Ok(queries)
}
