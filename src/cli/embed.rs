// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::embeddings::{EmbeddingConfig, EmbeddingPipeline};

/// Arguments for the embed command
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Texts to embed; read from stdin (one per line) when omitted
    pub texts: Vec<String>,

    /// Emit `{text, embedding, fallback}` objects instead of bare arrays
    #[arg(long)]
    pub with_status: bool,
}

#[derive(Serialize)]
struct EmbeddingLine<'a> {
    text: &'a str,
    embedding: &'a [f32],
    fallback: bool,
}

pub async fn run(args: EmbedArgs, config: EmbeddingConfig) -> Result<()> {
    let texts = if args.texts.is_empty() {
        read_stdin_lines().await?
    } else {
        args.texts
    };

    let pipeline = EmbeddingPipeline::from_config(config)
        .await
        .context("Failed to initialize embedding pipeline")?;

    info!("Embedding {} texts", texts.len());
    let outcomes = pipeline.embed_batch_outcomes(&texts).await;

    for (text, outcome) in texts.iter().zip(&outcomes) {
        let line = if args.with_status {
            serde_json::to_string(&EmbeddingLine {
                text,
                embedding: outcome.vector(),
                fallback: outcome.is_fallback(),
            })?
        } else {
            serde_json::to_string(outcome.vector())?
        };
        println!("{}", line);
    }

    Ok(())
}

async fn read_stdin_lines() -> Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut texts = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if !line.trim().is_empty() {
            texts.push(line);
        }
    }
    Ok(texts)
}
