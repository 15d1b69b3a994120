//! ranktok - byte-pair encoding tokenizer for tiktoken vocabularies.
//!
//! - [`core`]: the engine (vocabulary store, segmenter, BPE merge, special
//!   tokens, decoding) and the known encoding families
//! - [`provision`]: on-disk vocabulary cache with SHA-256 verification
//!
//! ```ignore
//! use ranktok::{AllowedSpecial, EncodingFamily, Tokenizer};
//!
//! let data = std::fs::read("cl100k_base.tiktoken")?;
//! let tokenizer = Tokenizer::from_family_bytes(EncodingFamily::Cl100kBase, &data)?;
//! let tokens = tokenizer.encode("hello <|endoftext|>", &AllowedSpecial::All)?;
//! ```

pub mod core;
pub mod provision;

#[cfg(feature = "python")]
mod python;

pub use self::core::{
    AllowedSpecial, ConfigError, EncodingFamily, StreamingDecoder, Tokenizer, TokenizerError,
    VocabStore, CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN,
};
pub use provision::{CacheConfig, DirSource, ProvisionError, Provisioner, VocabCache, VocabSource};
