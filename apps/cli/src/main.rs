//! docscout CLI: scrape documentation sources into JSON-lines documents.

mod commands;

use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    commands::run(commands::Cli::parse()).await
}
