//! Error types for the tokenizer engine.
//!
//! Construction problems surface as [`ConfigError`] and are fatal to the
//! engine being built. Everything that can go wrong while encoding or
//! decoding surfaces as [`TokenizerError`].

use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors raised while building a vocabulary store or a tokenizer.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Duplicate rank {rank}: assigned to both {first:?} and {second:?}")]
    DuplicateRank {
        rank: u32,
        first: Vec<u8>,
        second: Vec<u8>,
    },
    #[error("Duplicate token bytes {bytes:?}: ranked both {first} and {second}")]
    DuplicateBytes { bytes: Vec<u8>, first: u32, second: u32 },
    #[error("Special tokens {first:?} and {second:?} share rank {rank}")]
    DuplicateSpecialRank {
        rank: u32,
        first: String,
        second: String,
    },
    #[error("Special token {token:?} uses rank {rank}, which is already an ordinary token")]
    SpecialRankCollision { token: String, rank: u32 },
    #[error("Vocabulary has {actual} tokens, expected {expected}")]
    VocabSizeMismatch { expected: usize, actual: usize },
    #[error("Special token strings must not be empty")]
    EmptySpecialToken,
    #[error("Invalid segmentation pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Special token matcher build error: {0}")]
    SpecialMatcher(#[from] aho_corasick::BuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by tokenizer operations.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Byte 0x{byte:02x} has no single-byte token in the vocabulary")]
    UnencodableByte { byte: u8 },
    #[error("Unknown token rank: {0}")]
    UnknownRank(u32),
    #[error("Decoding error: invalid UTF-8")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),
}

impl From<regex::Error> for TokenizerError {
    fn from(err: regex::Error) -> Self {
        TokenizerError::Config(ConfigError::Pattern(err))
    }
}

impl From<aho_corasick::BuildError> for TokenizerError {
    fn from(err: aho_corasick::BuildError) -> Self {
        TokenizerError::Config(ConfigError::SpecialMatcher(err))
    }
}
