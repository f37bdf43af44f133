//! Expand command - show the expansion of one query

use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct ExpandArgs {
    /// Query to expand
    pub query: String,

    /// Language of the query
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: ExpandArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let service = super::build_service(&config)?;

    let expansion = service.expand_query(&args.query, &args.language)?;

    if args.format == "json" {
        let out = serde_json::json!({
            "original_tokens": expansion.original,
            "expanded_tokens": expansion.expanded,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("original: {}", expansion.original.join(" "));
        if expansion.expanded.is_empty() {
            println!("expansion: (none)");
        } else {
            println!("expansion: {}", expansion.expanded.join(" "));
        }
    }
    Ok(())
}
