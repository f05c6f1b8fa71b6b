// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX encoder tests against a real model
//!
//! These need an exported MPNet-style encoder (768 hidden dims, inputs
//! `input_ids` and `attention_mask` only) and its tokenizer.json. Paths come
//! from `EMBEDDING_MODEL_PATH` / `EMBEDDING_TOKENIZER_PATH`, falling back to
//! the defaults below. Run with `cargo test -- --ignored`.

use super::support::{assert_close, norm};
use semantic_embedder::embeddings::{
    EmbeddingConfig, EmbeddingPipeline, EncoderInput, OnnxEncoder, SequenceEncoder,
};

const MODEL_PATH: &str = "/workspace/models/all-mpnet-base-v2-onnx/model.onnx";
const TOKENIZER_PATH: &str = "/workspace/models/all-mpnet-base-v2-onnx/tokenizer.json";

fn model_config() -> EmbeddingConfig {
    let model = std::env::var("EMBEDDING_MODEL_PATH").unwrap_or_else(|_| MODEL_PATH.to_string());
    let tokenizer =
        std::env::var("EMBEDDING_TOKENIZER_PATH").unwrap_or_else(|_| TOKENIZER_PATH.to_string());
    EmbeddingConfig::new(model, tokenizer)
}

/// Test 1: Pipeline initializes and validates the hidden size
#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_pipeline_initializes() {
    let pipeline = EmbeddingPipeline::from_config(model_config())
        .await
        .expect("Failed to load model");

    assert_eq!(pipeline.dimension(), 768);
    assert_eq!(pipeline.max_length(), 128);
}

/// Test 2: Encoder returns [batch, seq_len, 768] hidden states
#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_encoder_output_shape() {
    let config = model_config();
    let pipeline = EmbeddingPipeline::from_config(config.clone())
        .await
        .expect("Failed to load model");
    let encoder = OnnxEncoder::load(&config.model_path, 2).expect("Failed to load encoder");

    let sequences = vec![
        pipeline.tokenize("first text"),
        pipeline.tokenize("second, longer text about movies"),
    ];
    let hidden = encoder
        .encode(EncoderInput::from_sequences(&sequences).unwrap())
        .expect("Inference failed");

    assert_eq!(hidden.shape(), &[2, 128, 768]);
}

/// Test 3: Real embeddings are unit-norm, finite and not fallbacks
#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_real_embeddings() {
    let pipeline = EmbeddingPipeline::from_config(model_config())
        .await
        .expect("Failed to load model");

    let outcome = pipeline.embed_outcome("A hacker discovers reality is a simulation").await;
    assert!(!outcome.is_fallback(), "unexpected fallback: {:?}", outcome.reason());

    let embedding = outcome.into_vector();
    assert_eq!(embedding.len(), 768);
    assert!(embedding.iter().all(|v| v.is_finite()));
    assert!((norm(&embedding) - 1.0).abs() < 1e-4);
}

/// Test 4: Embeddings are deterministic and batch results match single calls
#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_batch_matches_single() {
    let pipeline = EmbeddingPipeline::from_config(model_config())
        .await
        .expect("Failed to load model");

    let texts = ["A thief steals secrets through dreams", "Toys come to life"];
    let batch = pipeline.embed_batch(&texts).await;

    assert_eq!(batch.len(), 2);
    assert_close(&batch[0], &pipeline.embed(texts[0]).await);
    assert_close(&batch[1], &pipeline.embed(texts[1]).await);
}
