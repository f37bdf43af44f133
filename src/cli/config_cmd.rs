//! Config command - show the effective configuration

use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    /// Print the config file path instead of the contents
    #[arg(long)]
    pub path: bool,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    if args.path {
        println!("{}", Config::config_path().display());
        return Ok(());
    }
    let config = Config::load();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
