// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Word vocabulary loaded from a HuggingFace-style tokenizer.json
//!
//! Only the `model.vocab` object is read. Whatever the file says, the four
//! MPNet special tokens always end up with their reserved ids:
//!
//! | token   | id |
//! |---------|----|
//! | `<s>`   | 0  |
//! | `<pad>` | 1  |
//! | `</s>`  | 2  |
//! | `<unk>` | 3  |

use crate::embeddings::errors::{EmbeddingError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Characters of the built-in vocabulary, ids assigned from 4 upward
const BUILTIN_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789 .,!?-";

/// Reserved marker tokens with ids that never depend on the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialToken {
    Start,
    Pad,
    End,
    Unknown,
}

impl SpecialToken {
    pub const ALL: [SpecialToken; 4] = [
        SpecialToken::Start,
        SpecialToken::Pad,
        SpecialToken::End,
        SpecialToken::Unknown,
    ];

    pub fn token(self) -> &'static str {
        match self {
            SpecialToken::Start => "<s>",
            SpecialToken::Pad => "<pad>",
            SpecialToken::End => "</s>",
            SpecialToken::Unknown => "<unk>",
        }
    }

    pub fn id(self) -> u32 {
        match self {
            SpecialToken::Start => 0,
            SpecialToken::Pad => 1,
            SpecialToken::End => 2,
            SpecialToken::Unknown => 3,
        }
    }
}

/// Where the vocabulary entries came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VocabularySource {
    /// Parsed from a tokenizer file
    File(PathBuf),
    /// Tokenizer file unusable, built-in character vocabulary substituted
    BuiltIn,
    /// Supplied directly by the caller
    Inline,
}

impl fmt::Display for VocabularySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VocabularySource::File(path) => write!(f, "{}", path.display()),
            VocabularySource::BuiltIn => write!(f, "built-in"),
            VocabularySource::Inline => write!(f, "inline"),
        }
    }
}

/// Immutable token → id mapping
///
/// Built once at startup and shared behind an `Arc`; there is no way to
/// mutate it after construction.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: HashMap<String, u32>,
    source: VocabularySource,
}

impl Vocabulary {
    /// Loads the vocabulary from a tokenizer file, never failing
    ///
    /// Read, parse, or layout problems are logged and the built-in
    /// vocabulary is used instead.
    pub async fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let parsed = match tokio::fs::read_to_string(path).await {
            Ok(json) => Self::parse_entries(&json),
            Err(source) => Err(EmbeddingError::VocabularyRead {
                path: path.to_path_buf(),
                source,
            }),
        };

        match parsed {
            Ok(tokens) => {
                info!("📖 Loaded {} tokens from {}", tokens.len(), path.display());
                Self::finish(tokens, VocabularySource::File(path.to_path_buf()))
            }
            Err(e) => {
                warn!("⚠️  Tokenizer unusable ({}), using built-in vocabulary", e);
                Self::builtin()
            }
        }
    }

    /// Strict parse of tokenizer JSON, for callers that prefer rejecting bad files
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tokens = Self::parse_entries(json)?;
        Ok(Self::finish(tokens, VocabularySource::Inline))
    }

    /// Builds a vocabulary from explicit entries; special tokens are still enforced
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let tokens = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::finish(tokens, VocabularySource::Inline)
    }

    /// Minimal character vocabulary used when no tokenizer file is usable
    pub fn builtin() -> Self {
        let mut tokens: HashMap<String, u32> = SpecialToken::ALL
            .iter()
            .map(|t| (t.token().to_string(), t.id()))
            .collect();

        let offset = SpecialToken::ALL.len() as u32;
        for (i, c) in BUILTIN_CHARS.chars().enumerate() {
            tokens.insert(c.to_string(), offset + i as u32);
        }

        Self::finish(tokens, VocabularySource::BuiltIn)
    }

    fn parse_entries(json: &str) -> Result<HashMap<String, u32>> {
        let root: Value = serde_json::from_str(json)?;

        let vocab = root
            .get("model")
            .and_then(|model| model.get("vocab"))
            .ok_or_else(|| EmbeddingError::VocabularyShape("missing model.vocab".to_string()))?
            .as_object()
            .ok_or_else(|| {
                EmbeddingError::VocabularyShape("model.vocab is not an object".to_string())
            })?;

        vocab
            .iter()
            .map(|(token, id)| {
                id.as_u64()
                    .and_then(|id| u32::try_from(id).ok())
                    .map(|id| (token.clone(), id))
                    .ok_or_else(|| {
                        EmbeddingError::VocabularyShape(format!(
                            "token {:?} has non-integer id {}",
                            token, id
                        ))
                    })
            })
            .collect()
    }

    /// Forces the reserved special-token ids
    fn finish(mut tokens: HashMap<String, u32>, source: VocabularySource) -> Self {
        for special in SpecialToken::ALL {
            match tokens.insert(special.token().to_string(), special.id()) {
                Some(previous) if previous != special.id() => {
                    warn!(
                        "Overriding special token {} id {} -> {}",
                        special.token(),
                        previous,
                        special.id()
                    );
                }
                Some(_) => {}
                None => debug!("Inserted missing special token {}", special.token()),
            }
        }

        for special in SpecialToken::ALL {
            let mut clashes: Vec<&str> = tokens
                .iter()
                .filter(|(token, id)| **id == special.id() && token.as_str() != special.token())
                .map(|(token, _)| token.as_str())
                .collect();
            if !clashes.is_empty() {
                clashes.sort_unstable();
                warn!(
                    "Reserved id {} ({}) is also assigned to {:?}",
                    special.id(),
                    special.token(),
                    clashes
                );
            }
        }

        Self { tokens, source }
    }

    /// Exact-match lookup
    pub fn get(&self, token: &str) -> Option<u32> {
        self.tokens.get(token).copied()
    }

    /// Id for `token`, or the `<unk>` id on miss
    pub fn id_or_unknown(&self, token: &str) -> u32 {
        self.get(token).unwrap_or(SpecialToken::Unknown.id())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn source(&self) -> &VocabularySource {
        &self.source
    }

    /// True when the tokenizer file could not be used
    pub fn is_builtin(&self) -> bool {
        self.source == VocabularySource::BuiltIn
    }
}
