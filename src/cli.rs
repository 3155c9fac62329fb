use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Rate Keeper - daily currency rate feed keeper",
    long_about = "Rate Keeper downloads the daily currency exchange rate feed, stores every \
                  snapshot in PostgreSQL and serves the latest ratios as JSON over HTTP. \
                  Settings come from an optional YAML file and the environment."
)]
pub struct Cli {
    /// Download the feed into the configured source file and exit
    #[arg(short, long)]
    pub save: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
