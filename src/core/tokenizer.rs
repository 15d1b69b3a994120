//! The tokenizer engine.
//!
//! A [`Tokenizer`] ties together a [`VocabStore`], a [`Segmenter`] and a
//! [`SpecialScanner`]. It is immutable once built and holds no caches or
//! locks, so one instance can be shared freely between threads.

use std::path::Path;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::bpe::byte_pair_encode_append;
use super::encoding::EncodingFamily;
use super::error::{ConfigError, TokenizerError};
use super::segment::Segmenter;
use super::special::{AllowedSpecial, Span, SpecialScanner};
use super::store::VocabStore;
use super::vocab::{load_tiktoken_bpe, load_tiktoken_bpe_file};

/// Byte-pair encoding tokenizer compatible with tiktoken vocabularies.
///
/// # Performance Characteristics
///
/// - **Single text encoding**: [`encode`](Self::encode) and
///   [`encode_ordinary`](Self::encode_ordinary) run sequentially, which is
///   fastest for ordinary input sizes.
/// - **Batch encoding**: [`encode_batch`](Self::encode_batch) parallelizes
///   across texts with Rayon.
/// - **Very large single texts**: [`encode_ordinary_rayon`](Self::encode_ordinary_rayon)
///   parallelizes across the pieces of one text.
///
/// Segmentation runs in linear time and each piece is merged in O(n log n),
/// so pathological inputs (long runs of one character) stay cheap.
///
/// ```ignore
/// let tokenizer = Tokenizer::from_family_bytes(EncodingFamily::Cl100kBase, &data)?;
/// let tokens = tokenizer.encode_ordinary("hello world")?;
/// assert_eq!(tokenizer.decode(&tokens)?, "hello world");
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer {
    store: VocabStore,
    segmenter: Segmenter,
    specials: SpecialScanner,
}

impl Tokenizer {
    /// Create a new tokenizer from ordinary tokens, special tokens and a
    /// segmentation pattern.
    ///
    /// # Arguments
    /// * `ordinary` - `(bytes, rank)` pairs; a `FxHashMap<Vec<u8>, u32>` works too
    /// * `special_tokens` - Map of special token strings to ranks
    /// * `pattern` - Segmentation regex pattern
    pub fn new(
        ordinary: impl IntoIterator<Item = (Vec<u8>, u32)>,
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        let specials = SpecialScanner::new(&special_tokens)?;
        let store = VocabStore::build(ordinary, special_tokens)?;
        let segmenter = Segmenter::new(pattern)?;

        log::info!(
            "built tokenizer: {} ordinary tokens, {} special tokens, vocab size {}",
            store.len(),
            store.special_tokens().len(),
            store.vocab_size()
        );

        Ok(Self {
            store,
            segmenter,
            specials,
        })
    }

    /// Create a tokenizer from tiktoken-format vocabulary bytes.
    pub fn from_bytes(
        data: &[u8],
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        let parsed = load_tiktoken_bpe(data);
        Self::new(parsed.pairs, special_tokens, pattern)
    }

    /// Create a tokenizer from a tiktoken-format vocabulary file.
    pub fn from_file(
        path: impl AsRef<Path>,
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        let parsed = load_tiktoken_bpe_file(path)?;
        Self::new(parsed.pairs, special_tokens, pattern)
    }

    /// Create a tokenizer for a known encoding family from its vocabulary bytes.
    ///
    /// The family supplies the pattern and special tokens. Families with a
    /// fixed published size must load exactly that many tokens.
    pub fn from_family_bytes(family: EncodingFamily, data: &[u8]) -> Result<Self, TokenizerError> {
        let tokenizer = Self::from_bytes(data, family.special_tokens(), family.pattern())?;
        if let Some(expected) = family.explicit_vocab_size() {
            let actual = tokenizer.store.len() + tokenizer.store.special_tokens().len();
            if actual != expected {
                return Err(ConfigError::VocabSizeMismatch { expected, actual }.into());
            }
        }
        Ok(tokenizer)
    }

    /// Merge one piece, appending its ranks.
    #[inline]
    fn encode_piece(&self, piece: &str, out: &mut Vec<u32>) -> Result<(), TokenizerError> {
        let bytes = piece.as_bytes();

        // Fast path: the whole piece is a token.
        if let Some(rank) = self.store.rank_for(bytes) {
            out.push(rank);
            return Ok(());
        }

        byte_pair_encode_append(bytes, &self.store, out)
    }

    /// Segment and merge text with no special-token handling.
    fn encode_literal(&self, text: &str, out: &mut Vec<u32>) -> Result<(), TokenizerError> {
        for piece in self.segmenter.pieces(text) {
            self.encode_piece(piece, out)?;
        }
        Ok(())
    }

    /// Encode text, treating special-token strings as ordinary text.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(len = text.len())))]
    pub fn encode_ordinary(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        let mut tokens = Vec::with_capacity(text.len() / 4 + 1);
        self.encode_literal(text, &mut tokens)?;
        Ok(tokens)
    }

    /// Encode text, emitting the reserved rank for every allowed special token.
    ///
    /// Special tokens that are not allowed are encoded as ordinary text.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(len = text.len())))]
    pub fn encode(&self, text: &str, allowed: &AllowedSpecial) -> Result<Vec<u32>, TokenizerError> {
        let mut tokens = Vec::with_capacity(text.len() / 4 + 1);
        for span in self.specials.spans(text, allowed)? {
            match span {
                Span::Literal(literal) => self.encode_literal(literal, &mut tokens)?,
                Span::Special(rank) => tokens.push(rank),
            }
        }
        Ok(tokens)
    }

    /// Encode text with every configured special token allowed.
    pub fn encode_with_special(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        self.encode(text, &AllowedSpecial::All)
    }

    /// Rank of a byte sequence that is exactly one token, ordinary or special.
    pub fn encode_single_token(&self, bytes: &[u8]) -> Option<u32> {
        if let Some(rank) = self.store.rank_for(bytes) {
            return Some(rank);
        }
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| self.store.special_rank(s))
    }

    /// Number of tokens `text` encodes to.
    pub fn token_count(&self, text: &str, allowed: &AllowedSpecial) -> Result<usize, TokenizerError> {
        self.encode(text, allowed).map(|tokens| tokens.len())
    }

    /// Encode one large text, merging its pieces in parallel.
    ///
    /// Output is identical to [`encode_ordinary`](Self::encode_ordinary).
    /// Only worth it for texts in the megabyte range.
    pub fn encode_ordinary_rayon(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        let pieces: Vec<&str> = self.segmenter.pieces(text).collect();
        let results: Vec<Vec<u32>> = pieces
            .par_iter()
            .map(|piece| -> Result<Vec<u32>, TokenizerError> {
                let mut out = Vec::new();
                self.encode_piece(piece, &mut out)?;
                Ok(out)
            })
            .collect::<Result<_, TokenizerError>>()?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch<S>(
        &self,
        texts: &[S],
        allowed: &AllowedSpecial,
    ) -> Result<Vec<Vec<u32>>, TokenizerError>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.encode(text.as_ref(), allowed))
            .collect()
    }

    /// Batch encode multiple texts in parallel, ignoring special tokens.
    pub fn encode_ordinary_batch<S>(&self, texts: &[S]) -> Result<Vec<Vec<u32>>, TokenizerError>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.encode_ordinary(text.as_ref()))
            .collect()
    }

    /// Bytes of a single token.
    pub fn decode_single_token_bytes(&self, rank: u32) -> Result<&[u8], TokenizerError> {
        self.store
            .bytes_for(rank)
            .ok_or(TokenizerError::UnknownRank(rank))
    }

    /// Decode ranks back to bytes.
    ///
    /// Fails on the first rank that is neither an ordinary nor a special token.
    pub fn decode_bytes(&self, tokens: &[u32]) -> Result<Vec<u8>, TokenizerError> {
        let mut result = Vec::with_capacity(tokens.len() * 4);
        for &token in tokens {
            result.extend_from_slice(self.decode_single_token_bytes(token)?);
        }
        Ok(result)
    }

    /// Decode ranks to a string, failing if the bytes are not valid UTF-8.
    pub fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Decode ranks to a string, replacing invalid UTF-8 with U+FFFD.
    ///
    /// Unknown ranks are still an error.
    pub fn decode_lossy(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// The configured special-token strings.
    pub fn special_tokens(&self) -> FxHashSet<&str> {
        self.store
            .special_tokens()
            .keys()
            .map(String::as_str)
            .collect()
    }

    /// The special tokens map (string -> rank).
    pub fn special_tokens_map(&self) -> &FxHashMap<String, u32> {
        self.store.special_tokens()
    }

    /// Whether `rank` is a special token.
    pub fn is_special_token(&self, rank: u32) -> bool {
        self.store.is_special_rank(rank)
    }

    /// Total rank slots, `max_token_value + 1`, including special tokens.
    pub fn vocab_size(&self) -> usize {
        self.store.vocab_size()
    }

    /// Highest rank in use, or `None` for an empty vocabulary.
    pub fn max_token_value(&self) -> Option<u32> {
        self.store.max_token_value()
    }

    /// The segmentation pattern this tokenizer was built with.
    pub fn pattern(&self) -> &str {
        self.segmenter.pattern()
    }

    /// The underlying vocabulary store.
    pub fn store(&self) -> &VocabStore {
        &self.store
    }
}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Tokenizer>();
};
