// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod embeddings;
pub mod version;

pub use embeddings::{
    EmbeddingConfig, EmbeddingError, EmbeddingOutcome, EmbeddingPipeline, EmbeddingVector,
    SequenceEncoder, Vocabulary,
};
