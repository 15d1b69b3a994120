//! Vocabulary store: the immutable rank tables behind a tokenizer.
//!
//! A [`VocabStore`] owns two bijective tables:
//!
//! - ordinary tokens: byte sequence ↔ rank, consulted by the BPE merge engine
//! - special tokens: string ↔ rank, emitted verbatim by the special scanner
//!
//! Both rank spaces share one `u32` namespace for decoding, so the store
//! rejects any special rank that is also an ordinary rank instead of guessing
//! which one a decoder should prefer.

use rustc_hash::FxHashMap;

use super::error::ConfigError;

/// Immutable mapping between token bytes, special strings and ranks.
#[derive(Debug, Clone)]
pub struct VocabStore {
    encoder: FxHashMap<Vec<u8>, u32>,
    decoder: FxHashMap<u32, Vec<u8>>,
    special_tokens: FxHashMap<String, u32>,
    special_tokens_decoder: FxHashMap<u32, String>,
    max_token_value: Option<u32>,
}

impl VocabStore {
    /// Build a store from ordinary `(bytes, rank)` pairs and special tokens.
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateRank`] if two byte sequences share a rank
    /// - [`ConfigError::DuplicateBytes`] if a byte sequence appears twice
    /// - [`ConfigError::EmptySpecialToken`] for an empty special string
    /// - [`ConfigError::DuplicateSpecialRank`] if two special strings share a rank
    /// - [`ConfigError::SpecialRankCollision`] if a special rank is also an ordinary rank
    pub fn build(
        pairs: impl IntoIterator<Item = (Vec<u8>, u32)>,
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, ConfigError> {
        let pairs = pairs.into_iter();
        let (lower, _) = pairs.size_hint();
        let mut encoder: FxHashMap<Vec<u8>, u32> =
            FxHashMap::with_capacity_and_hasher(lower, Default::default());
        let mut decoder: FxHashMap<u32, Vec<u8>> =
            FxHashMap::with_capacity_and_hasher(lower, Default::default());

        for (bytes, rank) in pairs {
            if let Some(existing) = decoder.get(&rank) {
                return Err(ConfigError::DuplicateRank {
                    rank,
                    first: existing.clone(),
                    second: bytes,
                });
            }
            if let Some(&existing) = encoder.get(&bytes) {
                return Err(ConfigError::DuplicateBytes {
                    bytes,
                    first: existing,
                    second: rank,
                });
            }
            encoder.insert(bytes.clone(), rank);
            decoder.insert(rank, bytes);
        }

        let mut special_tokens_decoder: FxHashMap<u32, String> =
            FxHashMap::with_capacity_and_hasher(special_tokens.len(), Default::default());

        // Sorted so that the reported pair is stable across runs.
        let mut specials: Vec<(&String, &u32)> = special_tokens.iter().collect();
        specials.sort();
        for (token, &rank) in specials {
            if token.is_empty() {
                return Err(ConfigError::EmptySpecialToken);
            }
            if decoder.contains_key(&rank) {
                return Err(ConfigError::SpecialRankCollision {
                    token: token.clone(),
                    rank,
                });
            }
            if let Some(existing) = special_tokens_decoder.get(&rank) {
                return Err(ConfigError::DuplicateSpecialRank {
                    rank,
                    first: existing.clone(),
                    second: token.clone(),
                });
            }
            special_tokens_decoder.insert(rank, token.clone());
        }

        let max_token_value = decoder
            .keys()
            .chain(special_tokens_decoder.keys())
            .max()
            .copied();

        Ok(Self {
            encoder,
            decoder,
            special_tokens,
            special_tokens_decoder,
            max_token_value,
        })
    }

    /// Rank of an ordinary token, if the byte sequence is in the vocabulary.
    #[inline]
    pub fn rank_for(&self, bytes: &[u8]) -> Option<u32> {
        self.encoder.get(bytes).copied()
    }

    /// Bytes owned by a rank, resolving special ranks to their UTF-8 string.
    #[inline]
    pub fn bytes_for(&self, rank: u32) -> Option<&[u8]> {
        match self.decoder.get(&rank) {
            Some(bytes) => Some(bytes.as_slice()),
            None => self
                .special_tokens_decoder
                .get(&rank)
                .map(|s| s.as_bytes()),
        }
    }

    /// Rank of a configured special token.
    #[inline]
    pub fn special_rank(&self, token: &str) -> Option<u32> {
        self.special_tokens.get(token).copied()
    }

    /// Whether `rank` belongs to the special-token space.
    #[inline]
    pub fn is_special_rank(&self, rank: u32) -> bool {
        self.special_tokens_decoder.contains_key(&rank)
    }

    /// Number of ordinary (mergeable) tokens.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty() && self.special_tokens.is_empty()
    }

    /// Highest rank in either table, or `None` for an empty store.
    pub fn max_token_value(&self) -> Option<u32> {
        self.max_token_value
    }

    /// Total rank slots, `max_token_value + 1`, including special tokens.
    pub fn vocab_size(&self) -> usize {
        self.max_token_value.map_or(0, |max| max as usize + 1)
    }

    /// The ordinary token map (bytes -> rank).
    pub fn encoder(&self) -> &FxHashMap<Vec<u8>, u32> {
        &self.encoder
    }

    /// The ordinary token inverse map (rank -> bytes).
    pub fn decoder(&self) -> &FxHashMap<u32, Vec<u8>> {
        &self.decoder
    }

    /// The special tokens map (string -> rank).
    pub fn special_tokens(&self) -> &FxHashMap<String, u32> {
        &self.special_tokens
    }

    /// The special tokens inverse map (rank -> string).
    pub fn special_tokens_decoder(&self) -> &FxHashMap<u32, String> {
        &self.special_tokens_decoder
    }
}
