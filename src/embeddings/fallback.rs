// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Random unit vectors substituted when inference fails

use crate::embeddings::pooling::normalize_in_place;
use rand::Rng;

/// Generates `dimension` uniform values in [-1, 1] and normalizes them
///
/// The result has the right shape for downstream similarity search but
/// carries no meaning. Callers are expected to log its use.
pub fn random_embedding(dimension: usize) -> Vec<f32> {
    random_embedding_with(&mut rand::thread_rng(), dimension)
}

/// Same as [`random_embedding`] with a caller-provided RNG
pub fn random_embedding_with<R: Rng + ?Sized>(rng: &mut R, dimension: usize) -> Vec<f32> {
    let mut embedding: Vec<f32> = (0..dimension)
        .map(|_| rng.gen_range(-1.0f32..=1.0))
        .collect();
    normalize_in_place(&mut embedding);
    embedding
}
