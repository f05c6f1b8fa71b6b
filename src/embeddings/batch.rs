// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Chunked batch embedding
//!
//! Texts are split into consecutive chunks. Every text of a chunk is
//! embedded on its own blocking task, the chunk is awaited as a whole, and
//! a short pause separates consecutive chunks so the encoder is never
//! handed more than one chunk's worth of work at a time.

use crate::embeddings::errors::{EmbeddingError, Result};
use crate::embeddings::pipeline::{EmbeddingOutcome, EmbeddingPipeline};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl EmbeddingPipeline {
    /// Embeds `texts` in chunks of the configured batch size
    ///
    /// Output has the same length and order as the input. Never fails:
    /// texts whose embedding fails get a fallback vector.
    pub async fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<f32>> {
        self.embed_batch_with_chunk_size(texts, self.config().batch_size)
            .await
    }

    /// Embeds `texts` in chunks of at most `chunk_size` (0 is treated as 1)
    pub async fn embed_batch_with_chunk_size<S: AsRef<str>>(
        &self,
        texts: &[S],
        chunk_size: usize,
    ) -> Vec<Vec<f32>> {
        self.run_chunks(texts, chunk_size, None)
            .await
            .into_iter()
            .map(EmbeddingOutcome::into_vector)
            .collect()
    }

    /// Like [`embed_batch`](Self::embed_batch) but keeps per-text outcomes
    pub async fn embed_batch_outcomes<S: AsRef<str>>(&self, texts: &[S]) -> Vec<EmbeddingOutcome> {
        self.run_chunks(texts, self.config().batch_size, None).await
    }

    /// Chunked batch embedding that stops between chunks once `cancel` fires
    ///
    /// # Errors
    /// Returns [`EmbeddingError::Cancelled`] if the token was cancelled
    /// before every chunk completed. Chunks already in flight are finished.
    pub async fn embed_batch_cancellable<S: AsRef<str>>(
        &self,
        texts: &[S],
        chunk_size: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        let outcomes = self.run_chunks(texts, chunk_size, Some(cancel)).await;

        if outcomes.len() < texts.len() {
            return Err(EmbeddingError::Cancelled {
                completed: outcomes.len(),
                total: texts.len(),
            });
        }

        Ok(outcomes
            .into_iter()
            .map(EmbeddingOutcome::into_vector)
            .collect())
    }

    /// Drives the chunks; returns early (short) only when `cancel` fires
    async fn run_chunks<S: AsRef<str>>(
        &self,
        texts: &[S],
        chunk_size: usize,
        cancel: Option<&CancellationToken>,
    ) -> Vec<EmbeddingOutcome> {
        let chunk_size = chunk_size.max(1);
        let chunk_count = texts.len().div_ceil(chunk_size);
        let delay = self.config().chunk_delay();
        let mut outcomes = Vec::with_capacity(texts.len());

        for (index, chunk) in texts.chunks(chunk_size).enumerate() {
            if index > 0 && !delay.is_zero() {
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => {}
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
            }

            if cancel.is_some_and(CancellationToken::is_cancelled) {
                info!(
                    "Batch embedding cancelled after {}/{} texts",
                    outcomes.len(),
                    texts.len()
                );
                return outcomes;
            }

            debug!(
                "Batch {}/{}: embedding {} texts",
                index + 1,
                chunk_count,
                chunk.len()
            );
            outcomes.extend(self.embed_chunk(chunk).await);
        }

        let degraded = outcomes.iter().filter(|o| o.is_fallback()).count();
        if !texts.is_empty() {
            info!(
                "Embedded {} texts in {} chunks ({} degraded)",
                outcomes.len(),
                chunk_count,
                degraded
            );
        }
        outcomes
    }

    /// Embeds every text of one chunk concurrently, preserving order
    async fn embed_chunk<S: AsRef<str>>(&self, chunk: &[S]) -> Vec<EmbeddingOutcome> {
        let tasks = chunk.iter().map(|text| {
            let pipeline = self.clone();
            let text = text.as_ref().to_owned();
            tokio::task::spawn_blocking(move || pipeline.embed_outcome_blocking(&text))
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => EmbeddingOutcome::fallback(
                    self.dimension(),
                    EmbeddingError::TaskFailed(e.to_string()),
                ),
            })
            .collect()
    }
}
