// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the embedding pipeline
//!
//! Only a subset of these ever reach a caller:
//! - Startup errors (model missing, model invalid, bad configuration)
//! - `Cancelled` from the cancellable batch entry point
//!
//! Everything raised while embedding a single text is absorbed at the
//! per-text boundary and turned into a fallback vector.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or running the embedding pipeline
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// ONNX model file does not exist
    #[error("ONNX model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// ONNX Runtime could not build a session from the model
    #[error("Failed to load ONNX model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Model hidden size does not match the configured embedding dimension
    #[error("Dimension mismatch: expected {expected}D, model produced {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration rejected by validation
    #[error("Invalid embedding configuration: {0}")]
    InvalidConfig(String),

    /// Tokenizer definition could not be read
    #[error("Failed to read tokenizer file {path}: {source}")]
    VocabularyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tokenizer definition is not valid JSON
    #[error("Failed to parse tokenizer JSON: {0}")]
    VocabularyParse(#[from] serde_json::Error),

    /// Tokenizer JSON has no usable `model.vocab` mapping
    #[error("Unsupported tokenizer layout: {0}")]
    VocabularyShape(String),

    /// Encoder input tensors could not be built
    #[error("Malformed encoder input: {0}")]
    MalformedInput(String),

    /// ONNX Runtime failed during execution or output extraction
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Hidden states and attention mask disagree
    #[error("Pooling failed: {0}")]
    Pooling(String),

    /// Blocking embedding task panicked or was aborted
    #[error("Embedding task failed: {0}")]
    TaskFailed(String),

    /// Batch was cancelled between chunks
    #[error("Batch embedding cancelled after {completed} of {total} texts")]
    Cancelled { completed: usize, total: usize },
}

impl EmbeddingError {
    /// True for errors that make the pipeline unusable (startup only)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EmbeddingError::ModelNotFound(_)
                | EmbeddingError::ModelLoad { .. }
                | EmbeddingError::DimensionMismatch { .. }
                | EmbeddingError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;
