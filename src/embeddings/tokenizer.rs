// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Whitespace word tokenizer with fixed-length padding

use crate::embeddings::vocabulary::{SpecialToken, Vocabulary};
use std::sync::Arc;

/// Token ids and attention mask of identical, fixed length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    pub input_ids: Vec<i64>,
    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<i64>,
}

impl TokenSequence {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions, markers included
    pub fn token_count(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Lowercasing whitespace tokenizer over a shared [`Vocabulary`]
///
/// No subword splitting: every word is looked up whole and maps to
/// `<unk>` on a miss.
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    vocabulary: Arc<Vocabulary>,
    max_length: usize,
}

impl WordTokenizer {
    pub fn new(vocabulary: Arc<Vocabulary>, max_length: usize) -> Self {
        Self {
            vocabulary,
            max_length,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Encodes `text` into exactly `max_length` ids and mask values
    pub fn tokenize(&self, text: &str) -> TokenSequence {
        let lowered = text.to_lowercase();
        let max_words = self.max_length.saturating_sub(2);

        let mut input_ids: Vec<i64> = Vec::with_capacity(self.max_length.max(2));
        input_ids.push(SpecialToken::Start.id() as i64);
        input_ids.extend(
            lowered
                .split_whitespace()
                .take(max_words)
                .map(|word| self.vocabulary.id_or_unknown(word) as i64),
        );
        input_ids.push(SpecialToken::End.id() as i64);

        let mut attention_mask = vec![1i64; input_ids.len()];

        // Only reachable when max_length < 2
        input_ids.truncate(self.max_length);
        attention_mask.truncate(self.max_length);

        input_ids.resize(self.max_length, SpecialToken::Pad.id() as i64);
        attention_mask.resize(self.max_length, 0);

        TokenSequence {
            input_ids,
            attention_mask,
        }
    }

    /// Number of unmasked positions `text` occupies after truncation
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenize(text).token_count()
    }
}
