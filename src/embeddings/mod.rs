// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding pipeline
//!
//! Vocabulary-driven word tokenization, ONNX encoder inference, masked mean
//! pooling and L2 normalization, with a random fallback vector whenever the
//! model path fails for a text.

pub mod batch;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod onnx_model;
pub mod pipeline;
pub mod pooling;
pub mod tokenizer;
pub mod vocabulary;

pub use config::EmbeddingConfig;
pub use errors::EmbeddingError;
pub use fallback::random_embedding;
pub use onnx_model::{EncoderInput, OnnxEncoder, SequenceEncoder};
pub use pipeline::{EmbeddingOutcome, EmbeddingPipeline};
pub use pooling::{l2_norm, l2_normalize, mean_pool, normalize_in_place};
pub use tokenizer::{TokenSequence, WordTokenizer};
pub use vocabulary::{SpecialToken, Vocabulary, VocabularySource};

/// Fixed-length, unit-norm embedding of one text
pub type EmbeddingVector = Vec<f32>;
