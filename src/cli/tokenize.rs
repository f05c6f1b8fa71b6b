// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::sync::Arc;

use crate::embeddings::{EmbeddingConfig, Vocabulary, WordTokenizer};

/// Arguments for the tokenize command
#[derive(Args, Debug)]
pub struct TokenizeArgs {
    /// Text to tokenize
    pub text: String,
}

pub async fn run(args: TokenizeArgs, config: EmbeddingConfig) -> Result<()> {
    config.validate()?;

    let vocabulary = Vocabulary::load(&config.tokenizer_path).await;
    let source = vocabulary.source().to_string();
    let tokenizer = WordTokenizer::new(Arc::new(vocabulary), config.max_length);
    let sequence = tokenizer.tokenize(&args.text);

    let report = json!({
        "vocabulary": source,
        "token_count": sequence.token_count(),
        "input_ids": sequence.input_ids,
        "attention_mask": sequence.attention_mask,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
