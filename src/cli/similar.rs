//! Similar command - list stored neighbors of a document

use clap::Args;

use crate::config::Config;
use crate::similarity::Metric;

#[derive(Args)]
pub struct SimilarArgs {
    /// Id of the source document
    pub document_id: i64,

    /// Number of neighbors to return (0 = all)
    #[arg(long, short = 'k', default_value = "5")]
    pub top_k: usize,

    /// Number of neighbors to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Recompute neighbors from the stored embeddings instead of reading
    /// the persisted edges
    #[arg(long)]
    pub recompute: bool,

    /// Metric for --recompute (cosine = larger is closer, euclidean =
    /// smaller is closer)
    #[arg(long, default_value = "cosine", value_parser = ["cosine", "euclidean"])]
    pub metric: String,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: SimilarArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let service = super::build_service(&config)?;

    let neighbors = if args.recompute {
        let metric = match args.metric.as_str() {
            "euclidean" => Metric::Euclidean,
            _ => Metric::Cosine,
        };
        service.nearest_documents(args.document_id, args.top_k, metric)?
    } else {
        service.get_similarities(args.document_id, args.top_k, args.offset)?
    };

    if args.format == "json" {
        let out: Vec<_> = neighbors
            .iter()
            .map(|(id, score)| serde_json::json!({ "document_id": id, "score": score }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if neighbors.is_empty() {
        println!("no stored neighbors for document {}", args.document_id);
    } else {
        for (id, score) in &neighbors {
            println!("document {:<12} {:.6}", id, score);
        }
    }
    Ok(())
}
