//! CLI module - command definitions and handlers

mod config_cmd;
mod expand;
mod retrieve;
mod similar;
mod update;

use clap::{Parser, Subcommand};

pub use config_cmd::ConfigArgs;
pub use expand::ExpandArgs;
pub use retrieve::RetrieveArgs;
pub use similar::SimilarArgs;
pub use update::UpdateArgs;

use crate::config::Config;
use crate::embedding::HttpEmbeddingOracle;
use crate::service::{RankingOptions, RetrievalService};
use crate::store::JsonCorpusStore;
use crate::text::{EnglishLemmatizer, Normalizer, Stopwords, SuffixTagger};
use crate::vectors::WordVectors;

/// docrank - query expansion and document ranking over word embeddings
#[derive(Parser)]
#[command(name = "docrank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand a query over the word-embedding space
    Expand(ExpandArgs),

    /// Retrieve and rank documents for a query
    Retrieve(RetrieveArgs),

    /// Embed a document and record its similarity edges
    UpdateSimilarities(UpdateArgs),

    /// List stored neighbors of a document
    Similar(SimilarArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Expand(args) => expand::run(args).await,
            Commands::Retrieve(args) => retrieve::run(args).await,
            Commands::UpdateSimilarities(args) => update::run(args).await,
            Commands::Similar(args) => similar::run(args).await,
            Commands::Config(args) => config_cmd::run(args).await,
        }
    }
}

/// Load collaborators from config and wire the service.
pub(crate) fn build_service(config: &Config) -> anyhow::Result<RetrievalService> {
    let vectors_path = config
        .vectors
        .path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no word-vector model configured ([vectors] path)"))?;
    let vectors = WordVectors::load(vectors_path)?;

    let stopwords = match &config.vectors.stopwords_path {
        Some(path) => Stopwords::from_file(path)?,
        None => Stopwords::english(),
    };
    let normalizer = Normalizer::new(
        stopwords,
        Box::new(SuffixTagger),
        Some(Box::new(EnglishLemmatizer)),
    );

    let store = JsonCorpusStore::open(&config.corpus.path)?;
    let oracle = HttpEmbeddingOracle::new(config.embedding.url.clone());

    let options = RankingOptions {
        expansion_k: config.expansion.k,
        expansion_n: config.expansion.n,
        bridging: config.expansion.bridging,
        policy: config.scoring.policy.parse()?,
        alpha: config.scoring.alpha,
    };

    Ok(RetrievalService::new(
        vectors,
        normalizer,
        Box::new(store),
        Box::new(oracle),
        options,
        config.language.clone(),
    ))
}
