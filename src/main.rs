//! docrank - query expansion and document ranking over word embeddings
//!
//! A single-binary CLI for expanding queries against a word-vector model,
//! ranking corpus documents, and maintaining a document-similarity index.

mod cli;
mod config;
mod embedding;
mod error;
mod expand;
mod score;
mod service;
mod similarity;
mod store;
mod text;
mod vectors;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docrank=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Parse CLI args and run
    let cli = Cli::parse();
    cli.run().await
}
