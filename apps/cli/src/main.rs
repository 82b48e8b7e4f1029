//! postsync CLI — web-feed post ingestion and fleet orchestration.
//!
//! Syncs an owner's published posts from their feeds into a local
//! markdown + metadata store, and sweeps ingestion across a fleet of
//! target repositories.

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
