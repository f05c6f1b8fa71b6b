// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Batch orchestration tests
//!
//! Order and length preservation, bounded fan-out per chunk, pacing between
//! chunks, per-text failure isolation, and cancellation between chunks.

use super::support::{
    assert_close, hashing_pipeline, movie_vocabulary, norm, pipeline_with, test_config,
    FailingEncoder, HashingEncoder, TrackingEncoder, DIMENSION,
};
use semantic_embedder::embeddings::{EmbeddingError, EmbeddingPipeline};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn titles(count: usize) -> Vec<String> {
    let words = ["the", "matrix", "inception", "dream", "heist", "hacker", "reality"];
    (0..count)
        .map(|i| format!("{} {} {}", words[i % 7], words[(i / 7) % 7], i))
        .collect()
}

#[tokio::test]
async fn test_empty_batch_yields_empty_output() {
    let pipeline = hashing_pipeline();
    let texts: Vec<String> = Vec::new();
    assert!(pipeline.embed_batch(&texts).await.is_empty());
}

#[tokio::test]
async fn test_batch_preserves_length_and_order() {
    let pipeline = hashing_pipeline();
    let texts = titles(11);

    let batch = pipeline.embed_batch(&texts).await;
    assert_eq!(batch.len(), texts.len());

    for (text, embedding) in texts.iter().zip(&batch) {
        assert_close(embedding, &pipeline.embed(text).await);
    }
}

#[tokio::test]
async fn test_two_text_batch_matches_single_calls() {
    let pipeline = hashing_pipeline();
    let a = "The Matrix";
    let b = "Inception dream heist";

    let batch = pipeline.embed_batch(&[a, b]).await;

    assert_close(&batch[0], &pipeline.embed(a).await);
    assert_close(&batch[1], &pipeline.embed(b).await);
}

#[tokio::test]
async fn test_chunk_size_does_not_change_results() {
    let pipeline = hashing_pipeline();
    let texts = titles(9);

    let whole = pipeline.embed_batch_with_chunk_size(&texts, 32).await;
    for chunk_size in [1, 2, 4, 8] {
        let chunked = pipeline.embed_batch_with_chunk_size(&texts, chunk_size).await;
        assert_eq!(chunked.len(), whole.len());
        for (x, y) in chunked.iter().zip(&whole) {
            assert_close(x, y);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrency_is_bounded_by_chunk_size() {
    let encoder = Arc::new(TrackingEncoder::new(Duration::from_millis(20)));
    let pipeline = pipeline_with(encoder.clone());
    let texts = titles(10);

    let out = pipeline.embed_batch_with_chunk_size(&texts, 3).await;

    assert_eq!(out.len(), 10);
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 10);
    let peak = encoder.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 3, "peak concurrency was {}", peak);
}

#[tokio::test]
async fn test_failing_encoder_never_aborts_batch() {
    let pipeline = pipeline_with(Arc::new(FailingEncoder));
    let texts = titles(6);

    let outcomes = pipeline.embed_batch_outcomes(&texts).await;
    assert_eq!(outcomes.len(), 6);
    for outcome in &outcomes {
        assert!(outcome.is_fallback());
        assert_eq!(outcome.vector().len(), DIMENSION);
        assert!((norm(outcome.vector()) - 1.0).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let pipeline = hashing_pipeline();
    let token = CancellationToken::new();
    token.cancel();

    let err = pipeline
        .embed_batch_cancellable(&titles(5), 2, &token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::Cancelled {
            completed: 0,
            total: 5
        }
    ));
}

#[tokio::test]
async fn test_cancellation_stops_between_chunks() {
    let encoder = Arc::new(TrackingEncoder::new(Duration::from_millis(30)));
    let pipeline = pipeline_with(encoder.clone());
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        })
    };

    let result = pipeline
        .embed_batch_cancellable(&titles(8), 2, &token)
        .await;
    canceller.await.unwrap();

    match result {
        Err(EmbeddingError::Cancelled { completed, total }) => {
            assert_eq!(total, 8);
            assert!(completed < 8);
            assert_eq!(completed % 2, 0, "only whole chunks complete");
        }
        other => panic!("expected cancellation, got {:?}", other.map(|v| v.len())),
    }
    assert!(encoder.calls.load(Ordering::SeqCst) < 8);
}

#[tokio::test]
async fn test_uncancelled_token_completes() {
    let pipeline = hashing_pipeline();
    let token = CancellationToken::new();
    let out = pipeline
        .embed_batch_cancellable(&titles(5), 2, &token)
        .await
        .unwrap();
    assert_eq!(out.len(), 5);
}

fn paced_pipeline(delay: Duration) -> EmbeddingPipeline {
    EmbeddingPipeline::with_encoder(
        movie_vocabulary(),
        Arc::new(HashingEncoder {
            dimension: DIMENSION,
        }),
        test_config().with_chunk_delay(delay),
    )
    .unwrap()
}

#[tokio::test]
async fn test_delay_separates_chunks() {
    let delay = Duration::from_millis(150);
    let pipeline = paced_pipeline(delay);

    // 8 texts in chunks of 2: four chunks, three pauses
    let start = Instant::now();
    let out = pipeline.embed_batch_with_chunk_size(&titles(8), 2).await;
    let elapsed = start.elapsed();

    assert_eq!(out.len(), 8);
    assert!(elapsed >= delay * 3, "4 chunks finished in {:?}", elapsed);
}

#[tokio::test]
async fn test_single_chunk_has_no_trailing_delay() {
    let delay = Duration::from_secs(2);
    let pipeline = paced_pipeline(delay);

    let start = Instant::now();
    let out = pipeline.embed_batch_with_chunk_size(&titles(3), 4).await;
    let elapsed = start.elapsed();

    assert_eq!(out.len(), 3);
    assert!(elapsed < delay, "single chunk took {:?}", elapsed);
}
