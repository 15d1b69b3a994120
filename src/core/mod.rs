//! Core tokenization engine for ranktok.
//!
//! This module contains the BPE tokenizer implementation with:
//! - Byte-pair encoding using a linked list and a min-heap (O(n log n) per piece)
//! - Vocabulary loading from tiktoken format
//! - Linear-time pattern segmentation on the `regex` crate
//! - UTF-8 safe streaming decoder for token-by-token output
//!
//! # Architecture
//!
//! - [`VocabStore`]: validated, immutable rank tables
//! - [`Segmenter`]: splits text into pieces with a tiktoken-style pattern
//! - [`bpe`]: the byte-pair merge for a single piece
//! - [`SpecialScanner`]: Aho-Corasick matching of special tokens
//! - [`Tokenizer`]: the engine that ties them together, plus Rayon batch APIs
//! - [`EncodingFamily`]: patterns, special tokens and hashes of known vocabularies
//! - [`StreamingDecoder`]: UTF-8 safe streaming decoder

pub mod bpe;
mod encoding;
mod error;
mod segment;
mod special;
mod store;
mod streaming;
mod tokenizer;
mod vocab;

pub use bpe::byte_pair_encode;
pub use encoding::{EncodingFamily, ENDOFPROMPT, ENDOFTEXT, FIM_MIDDLE, FIM_PREFIX, FIM_SUFFIX};
pub use error::{ConfigError, TokenizerError};
pub use segment::{Pieces, Segmenter, CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN};
pub use special::{AllowedSpecial, Span, SpecialScanner};
pub use store::VocabStore;
pub use streaming::{StreamingDecoder, Utf8Assembler};
pub use tokenizer::Tokenizer;
pub use vocab::{
    load_tiktoken_bpe, load_tiktoken_bpe_file, parse_line, write_tiktoken_bpe, ParsedVocab,
    RankPairs,
};
