// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Sequence Encoder Wrapper
//!
//! This module wraps ONNX Runtime for running a pretrained sentence encoder
//! (MPNet-style, 768 hidden dimensions) that only takes `input_ids` and
//! `attention_mask`.
//!
//! Features:
//! - ONNX model loading from disk
//! - All available cores for intra- and inter-op execution
//! - Full graph optimization
//! - Batched inference returning per-token hidden states

use crate::embeddings::errors::{EmbeddingError, Result};
use crate::embeddings::tokenizer::TokenSequence;
use ndarray::{Array2, Array3, Ix3};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A batch of uniform-length token sequences ready for the encoder
#[derive(Debug, Clone)]
pub struct EncoderInput {
    /// `[batch, seq_len]`
    pub input_ids: Array2<i64>,
    /// `[batch, seq_len]`
    pub attention_mask: Array2<i64>,
}

impl EncoderInput {
    /// Stacks sequences into `[batch, seq_len]` tensors
    ///
    /// # Errors
    /// Fails on an empty batch, sequences of differing length, or a
    /// sequence whose ids and mask differ in length.
    pub fn from_sequences(sequences: &[TokenSequence]) -> Result<Self> {
        let first = sequences
            .first()
            .ok_or_else(|| EmbeddingError::MalformedInput("empty batch".to_string()))?;
        let seq_len = first.len();

        let mut input_ids = Vec::with_capacity(sequences.len() * seq_len);
        let mut attention_mask = Vec::with_capacity(sequences.len() * seq_len);

        for (i, seq) in sequences.iter().enumerate() {
            if seq.input_ids.len() != seq_len || seq.attention_mask.len() != seq_len {
                return Err(EmbeddingError::MalformedInput(format!(
                    "sequence {} has {} ids and {} mask values (expected {})",
                    i,
                    seq.input_ids.len(),
                    seq.attention_mask.len(),
                    seq_len
                )));
            }
            input_ids.extend_from_slice(&seq.input_ids);
            attention_mask.extend_from_slice(&seq.attention_mask);
        }

        let shape = (sequences.len(), seq_len);
        Ok(Self {
            input_ids: Array2::from_shape_vec(shape, input_ids)
                .map_err(|e| EmbeddingError::MalformedInput(e.to_string()))?,
            attention_mask: Array2::from_shape_vec(shape, attention_mask)
                .map_err(|e| EmbeddingError::MalformedInput(e.to_string()))?,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.input_ids.nrows()
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Runs a sequence encoder over a token batch
///
/// Implementations must be callable from many threads at once and must not
/// change observable state between calls.
pub trait SequenceEncoder: Send + Sync {
    /// Returns per-token hidden states shaped `[batch, seq_len, hidden_dim]`
    fn encode(&self, input: EncoderInput) -> Result<Array3<f32>>;
}

/// ONNX Runtime-backed encoder
///
/// # Thread Safety
/// `ort` needs exclusive access to a session while it runs, so calls are
/// serialized through a mutex. ONNX Runtime itself fans each call out over
/// the configured thread pools.
pub struct OnnxEncoder {
    session: Mutex<Session>,
    model_path: PathBuf,
    num_threads: usize,
}

impl std::fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("model_path", &self.model_path)
            .field("num_threads", &self.num_threads)
            .finish_non_exhaustive()
    }
}

impl OnnxEncoder {
    /// Loads an ONNX encoder from disk
    ///
    /// # Arguments
    /// - `model_path`: Path to ONNX model file (model.onnx)
    /// - `num_threads`: Threads for both intra-op and inter-op pools
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime cannot build a session from it
    ///
    /// This call blocks; run it on a blocking thread from async code.
    pub fn load<P: AsRef<Path>>(model_path: P, num_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound(model_path.to_path_buf()));
        }

        info!(
            "🚀 Initializing ONNX encoder from {} ({} threads)",
            model_path.display(),
            num_threads
        );

        let session = Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(model_path, e))?
            .with_intra_threads(num_threads)
            .map_err(|e| load_error(model_path, e))?
            .with_inter_threads(num_threads)
            .map_err(|e| load_error(model_path, e))?
            .with_parallel_execution(true)
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;

        info!("✅ ONNX encoder loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
            num_threads,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

impl SequenceEncoder for OnnxEncoder {
    fn encode(&self, input: EncoderInput) -> Result<Array3<f32>> {
        let batch_size = input.batch_size();

        let input_ids = Value::from_array(input.input_ids)
            .map_err(|e| EmbeddingError::MalformedInput(e.to_string()))?;
        let attention_mask = Value::from_array(input.attention_mask)
            .map_err(|e| EmbeddingError::MalformedInput(e.to_string()))?;

        let mut session = lock_recovering(&self.session);

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        // Output names differ between exports; the hidden states come first
        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?
            .to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|e| {
                EmbeddingError::Inference(format!(
                    "expected [batch, seq_len, hidden] output: {}",
                    e
                ))
            })?;

        if hidden.shape()[0] != batch_size {
            return Err(EmbeddingError::Inference(format!(
                "model returned {} rows for a batch of {}",
                hidden.shape()[0],
                batch_size
            )));
        }

        debug!("Encoded batch, output shape {:?}", hidden.shape());
        Ok(hidden)
    }
}

/// Locks `mutex`, taking the guard back from a poisoned lock
///
/// A panic while running the session leaves no partial state behind, so a
/// later caller can keep using it.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("ONNX session lock was poisoned by a panicked inference, recovering");
        mutex.clear_poison();
        poisoned.into_inner()
    })
}
