// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding pipeline: tokenize → encode → pool → normalize
//!
//! The single-text path never fails from the caller's point of view. Any
//! error up to and including pooling is turned into a random unit vector
//! and reported through [`EmbeddingOutcome::Fallback`] and the logs.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::errors::{EmbeddingError, Result};
use crate::embeddings::fallback::random_embedding;
use crate::embeddings::onnx_model::{EncoderInput, OnnxEncoder, SequenceEncoder};
use crate::embeddings::pooling::{l2_normalize, mean_pool};
use crate::embeddings::tokenizer::{TokenSequence, WordTokenizer};
use crate::embeddings::vocabulary::Vocabulary;
use ndarray::Axis;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const PROBE_TEXT: &str = "validation test";

/// Result of embedding one text
#[derive(Debug)]
pub enum EmbeddingOutcome {
    /// Produced by the model
    Computed(Vec<f32>),
    /// Model path failed; `embedding` is random but unit-norm
    Fallback {
        embedding: Vec<f32>,
        reason: EmbeddingError,
    },
}

impl EmbeddingOutcome {
    /// Builds a fallback outcome, logging the degradation
    pub fn fallback(dimension: usize, reason: EmbeddingError) -> Self {
        warn!(
            "⚠️  Embedding failed ({}), returning degraded random embedding",
            reason
        );
        EmbeddingOutcome::Fallback {
            embedding: random_embedding(dimension),
            reason,
        }
    }

    pub fn vector(&self) -> &[f32] {
        match self {
            EmbeddingOutcome::Computed(embedding) => embedding,
            EmbeddingOutcome::Fallback { embedding, .. } => embedding,
        }
    }

    pub fn into_vector(self) -> Vec<f32> {
        match self {
            EmbeddingOutcome::Computed(embedding) => embedding,
            EmbeddingOutcome::Fallback { embedding, .. } => embedding,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, EmbeddingOutcome::Fallback { .. })
    }

    /// Why the model path was abandoned, if it was
    pub fn reason(&self) -> Option<&EmbeddingError> {
        match self {
            EmbeddingOutcome::Computed(_) => None,
            EmbeddingOutcome::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Text embedding pipeline shared across concurrent callers
///
/// Cloning is cheap: the vocabulary, encoder and configuration sit behind
/// `Arc`s and are never mutated after construction.
#[derive(Clone)]
pub struct EmbeddingPipeline {
    tokenizer: WordTokenizer,
    encoder: Arc<dyn SequenceEncoder>,
    config: Arc<EmbeddingConfig>,
}

impl std::fmt::Debug for EmbeddingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingPipeline")
            .field("config", &self.config)
            .field("vocabulary_size", &self.tokenizer.vocabulary().len())
            .field("vocabulary_source", self.tokenizer.vocabulary().source())
            .finish_non_exhaustive()
    }
}

impl EmbeddingPipeline {
    /// Loads the model and tokenizer with default settings and `max_length`
    ///
    /// # Errors
    /// Fails if the model is missing, cannot be loaded, or does not produce
    /// 768-dimensional hidden states. A bad tokenizer file is not an error.
    ///
    /// # Example
    /// ```ignore
    /// let pipeline = EmbeddingPipeline::initialize(
    ///     "./models/all-mpnet-base-v2-onnx/model.onnx",
    ///     "./models/all-mpnet-base-v2-onnx/tokenizer.json",
    ///     128,
    /// ).await?;
    /// let embedding = pipeline.embed("The Matrix").await;
    /// assert_eq!(embedding.len(), 768);
    /// ```
    pub async fn initialize(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        max_length: usize,
    ) -> Result<Self> {
        let config = EmbeddingConfig::new(model_path.as_ref(), tokenizer_path.as_ref())
            .with_max_length(max_length);
        Self::from_config(config).await
    }

    /// Builds the ONNX-backed pipeline described by `config`
    pub async fn from_config(config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        let vocabulary = Vocabulary::load(&config.tokenizer_path).await;
        info!(
            "Vocabulary ready: {} tokens (source: {})",
            vocabulary.len(),
            vocabulary.source()
        );

        let model_path = config.model_path.clone();
        let num_threads = config.num_threads;
        let encoder =
            tokio::task::spawn_blocking(move || OnnxEncoder::load(model_path, num_threads))
                .await
                .map_err(|e| EmbeddingError::ModelLoad {
                    path: config.model_path.clone(),
                    reason: e.to_string(),
                })??;

        let pipeline = Self::with_encoder(vocabulary, Arc::new(encoder), config)?;
        pipeline.probe_model().await?;

        info!(
            "✅ Embedding pipeline initialized ({} dims, max_length {})",
            pipeline.dimension(),
            pipeline.max_length()
        );
        Ok(pipeline)
    }

    /// Assembles a pipeline around an existing encoder
    ///
    /// No probe inference is run; the encoder is trusted to produce
    /// `config.dimension` hidden values per token.
    pub fn with_encoder(
        vocabulary: Vocabulary,
        encoder: Arc<dyn SequenceEncoder>,
        config: EmbeddingConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tokenizer: WordTokenizer::new(Arc::new(vocabulary), config.max_length),
            encoder,
            config: Arc::new(config),
        })
    }

    /// Runs one inference at startup to check the model's hidden size
    async fn probe_model(&self) -> Result<()> {
        let pipeline = self.clone();
        let probe = tokio::task::spawn_blocking(move || {
            let tokens = pipeline.tokenizer.tokenize(PROBE_TEXT);
            let input = EncoderInput::from_sequences(std::slice::from_ref(&tokens))?;
            pipeline.encoder.encode(input)
        })
        .await
        .map_err(|e| EmbeddingError::TaskFailed(e.to_string()))
        .and_then(|result| result);

        let hidden = probe.map_err(|e| EmbeddingError::ModelLoad {
            path: self.config.model_path.clone(),
            reason: format!("probe inference failed: {}", e),
        })?;

        let actual = hidden.len_of(Axis(2));
        if actual != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Fixed-length token encoding of `text`
    pub fn tokenize(&self, text: &str) -> TokenSequence {
        self.tokenizer.tokenize(text)
    }

    /// Non-padding positions `text` would occupy, markers included
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count_tokens(text)
    }

    /// Model path for one text, errors surfaced
    pub fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = self.tokenizer.tokenize(text);
        let input = EncoderInput::from_sequences(std::slice::from_ref(&tokens))?;
        let hidden = self.encoder.encode(input)?;

        if hidden.len_of(Axis(0)) == 0 {
            return Err(EmbeddingError::Inference(
                "encoder returned an empty batch".to_string(),
            ));
        }

        let pooled = mean_pool(hidden.index_axis(Axis(0), 0), &tokens.attention_mask)?;
        if pooled.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: pooled.len(),
            });
        }
        if let Some(position) = pooled.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::Pooling(format!(
                "non-finite pooled value {} at component {}",
                pooled[position], position
            )));
        }

        Ok(l2_normalize(pooled))
    }

    /// Embeds one text on the current thread, falling back on failure
    pub fn embed_outcome_blocking(&self, text: &str) -> EmbeddingOutcome {
        match self.try_embed(text) {
            Ok(embedding) => EmbeddingOutcome::Computed(embedding),
            Err(e) => EmbeddingOutcome::fallback(self.config.dimension, e),
        }
    }

    /// Embeds one text on the blocking pool, falling back on failure
    pub async fn embed_outcome(&self, text: &str) -> EmbeddingOutcome {
        let pipeline = self.clone();
        let text = text.to_owned();

        match tokio::task::spawn_blocking(move || pipeline.embed_outcome_blocking(&text)).await {
            Ok(outcome) => outcome,
            Err(e) => EmbeddingOutcome::fallback(
                self.config.dimension,
                EmbeddingError::TaskFailed(e.to_string()),
            ),
        }
    }

    /// Embeds one text; always returns a unit-norm vector of `dimension()` values
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        self.embed_outcome(text).await.into_vector()
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn max_length(&self) -> usize {
        self.config.max_length
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.tokenizer.vocabulary()
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
