// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use semantic_embedder::cli::{execute, Cli};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up EMBEDDING_* settings from a local .env, if present
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{}", semantic_embedder::version::get_version_string());

    // Execute the command
    match execute(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
