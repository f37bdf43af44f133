//! Retrieve command - rank corpus documents for a query

use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct RetrieveArgs {
    /// Search query
    pub query: String,

    /// Number of results to return (0 = all positive scores)
    #[arg(long, short = 'm')]
    pub top_m: Option<usize>,

    /// Language of the query
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Print the beginning of each document's text
    #[arg(long)]
    pub show_text: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: RetrieveArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let service = super::build_service(&config)?;

    let m = args.top_m.unwrap_or(config.scoring.default_m);
    let ranked = service.retrieve_documents(&args.query, m, &args.language)?;

    let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
    let texts = if args.show_text {
        service.fetch_texts(&ids)?
    } else {
        Default::default()
    };

    if args.format == "json" {
        let out: Vec<_> = ranked
            .iter()
            .map(|(id, score)| {
                let mut row = serde_json::json!({ "document_id": id, "score": score });
                if let Some(text) = texts.get(id) {
                    row["text"] = serde_json::json!(snippet(text));
                }
                row
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if ranked.is_empty() {
        println!("no documents scored positive");
    } else {
        for (rank, (id, score)) in ranked.iter().enumerate() {
            println!("{:>3}. document {:<12} {:.6}", rank + 1, id, score);
            if let Some(text) = texts.get(id) {
                println!("     {}", snippet(text));
            }
        }
    }
    Ok(())
}

fn snippet(text: &str) -> String {
    let mut s: String = text.chars().take(120).collect();
    if s.len() < text.len() {
        s.push_str("...");
    }
    s
}
