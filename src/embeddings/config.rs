// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding pipeline configuration

use crate::embeddings::errors::{EmbeddingError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_LENGTH: usize = 128;
pub const DEFAULT_DIMENSION: usize = 768;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 50;

/// Configuration for building an [`EmbeddingPipeline`](crate::embeddings::EmbeddingPipeline)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Path to ONNX model file (model.onnx)
    pub model_path: PathBuf,
    /// Path to tokenizer JSON file (tokenizer.json)
    pub tokenizer_path: PathBuf,
    /// Fixed token sequence length, start and end markers included
    pub max_length: usize,
    /// Hidden size of the encoder, i.e. the output vector length
    pub dimension: usize,
    /// Texts embedded concurrently per chunk
    pub batch_size: usize,
    /// Pause between consecutive chunks
    pub chunk_delay_ms: u64,
    /// Intra- and inter-op threads handed to ONNX Runtime
    pub num_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/all-mpnet-base-v2-onnx/model.onnx"),
            tokenizer_path: PathBuf::from("./models/all-mpnet-base-v2-onnx/tokenizer.json"),
            max_length: DEFAULT_MAX_LENGTH,
            dimension: DEFAULT_DIMENSION,
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
            num_threads: available_threads(),
        }
    }
}

impl EmbeddingConfig {
    /// Creates a config for the given model and tokenizer, defaults elsewhere
    pub fn new(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from `EMBEDDING_*` environment variables
    ///
    /// Unset or unparsable variables keep their default value.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            model_path: env::var("EMBEDDING_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            tokenizer_path: env::var("EMBEDDING_TOKENIZER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tokenizer_path),
            max_length: parse_env("EMBEDDING_MAX_LENGTH").unwrap_or(defaults.max_length),
            dimension: parse_env("EMBEDDING_DIMENSION").unwrap_or(defaults.dimension),
            batch_size: parse_env("EMBEDDING_BATCH_SIZE").unwrap_or(defaults.batch_size),
            chunk_delay_ms: parse_env("EMBEDDING_CHUNK_DELAY_MS")
                .unwrap_or(defaults.chunk_delay_ms),
            num_threads: parse_env("EMBEDDING_THREADS").unwrap_or(defaults.num_threads),
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// Rejects values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_length < 2 {
            return Err(EmbeddingError::InvalidConfig(format!(
                "max_length must be at least 2 (start and end markers), got {}",
                self.max_length
            )));
        }
        if self.dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "Batch size must be greater than 0".to_string(),
            ));
        }
        if self.num_threads == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "Thread count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Number of parallel execution lanes on this machine
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
