//! TrendBot CLI: fetch trending tech articles, summarize them, and publish
//! the summaries. Meant to be triggered by an external scheduler.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
