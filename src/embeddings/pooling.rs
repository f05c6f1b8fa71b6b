// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mean pooling and L2 normalization

use crate::embeddings::errors::{EmbeddingError, Result};
use ndarray::{ArrayView2, Axis};

/// Averages token vectors over positions where `attention_mask` is 1
///
/// `hidden` is `[seq_len, hidden_dim]` for a single text. Padding positions
/// contribute nothing; an all-padding mask divides by 1 and yields zeros.
pub fn mean_pool(hidden: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Result<Vec<f32>> {
    let seq_len = hidden.len_of(Axis(0));
    if seq_len != attention_mask.len() {
        return Err(EmbeddingError::Pooling(format!(
            "hidden states cover {} positions but mask has {}",
            seq_len,
            attention_mask.len()
        )));
    }

    let hidden_dim = hidden.len_of(Axis(1));
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut valid_tokens = 0usize;

    for (row, &mask) in hidden.outer_iter().zip(attention_mask) {
        if mask != 1 {
            continue;
        }
        valid_tokens += 1;
        for (acc, &value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value;
        }
    }

    let divisor = valid_tokens.max(1) as f32;
    for value in &mut pooled {
        *value /= divisor;
    }

    Ok(pooled)
}

/// Scales `vector` to unit L2 norm in place; a zero vector is left alone
///
/// The norm is taken in f64 so components near either end of the f32 range
/// neither overflow nor underflow the sum of squares.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm = norm_f64(vector);
    if norm > 0.0 && norm.is_finite() {
        for value in vector.iter_mut() {
            *value = (*value as f64 / norm) as f32;
        }
    }
}

/// Returns `vector` scaled to unit L2 norm
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    normalize_in_place(&mut vector);
    vector
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    norm_f64(vector) as f32
}

fn norm_f64(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&x| x as f64 * x as f64)
        .sum::<f64>()
        .sqrt()
}
