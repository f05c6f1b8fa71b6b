// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod tokenize;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::embeddings::EmbeddingConfig;

/// Semantic Embedder CLI
#[derive(Parser, Debug)]
#[command(name = "semantic-embedder")]
#[command(version)]
#[command(about = "Compute text embeddings with a local ONNX sentence encoder", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Log debug output (per-chunk progress, encoder shapes)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command; unset values come from `EMBEDDING_*` env vars
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Path to the ONNX model file
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Path to the tokenizer.json file
    #[arg(long, global = true)]
    pub tokenizer: Option<PathBuf>,

    /// Token sequence length, including start and end markers
    #[arg(long, global = true)]
    pub max_length: Option<usize>,

    /// Embedding dimension produced by the model
    #[arg(long, global = true)]
    pub dimension: Option<usize>,

    /// Texts embedded concurrently per chunk
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,
}

impl ModelArgs {
    /// Environment configuration with command-line overrides applied
    pub fn to_config(&self) -> EmbeddingConfig {
        let mut config = EmbeddingConfig::from_env();
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(tokenizer) = &self.tokenizer {
            config.tokenizer_path = tokenizer.clone();
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        if let Some(dimension) = self.dimension {
            config.dimension = dimension;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed texts given as arguments, or one per line on stdin
    Embed(embed::EmbedArgs),

    /// Show token ids and attention mask for a text (no model needed)
    Tokenize(tokenize::TokenizeArgs),

    /// Print version information as JSON
    Version,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.model.to_config();
    match cli.command {
        Commands::Embed(args) => embed::run(args, config).await,
        Commands::Tokenize(args) => tokenize::run(args, config).await,
        Commands::Version => {
            println!("{}", crate::version::get_version_info());
            Ok(())
        }
    }
}
