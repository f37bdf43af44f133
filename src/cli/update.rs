//! Update-similarities command - embed a document and record its edges

use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct UpdateArgs {
    /// Id of the document to embed
    pub document_id: i64,

    /// Language of the document
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: UpdateArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let mut service = super::build_service(&config)?;

    let update = service
        .update_similarities(args.document_id, &args.language)
        .await?;

    if args.format == "json" {
        let out = serde_json::json!({
            "document_id": args.document_id,
            "embedding": update.embedding,
            "added_edges": update.added_edges,
            "existing_ids": update.existing_ids,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "document {}: {} dims, {} edges against {} existing documents",
            args.document_id,
            update.embedding.len(),
            update.added_edges.len(),
            update.existing_ids.len()
        );
    }
    Ok(())
}
