//! Vocabulary provisioning: getting verified `.tiktoken` bytes to the engine.
//!
//! The engine trusts whatever bytes it is built from. This layer owns the
//! policy around them:
//!
//! - [`VocabCache`]: a cache directory with a JSON manifest keyed by
//!   vocabulary name, recording each file's SHA-256 and size
//! - [`VocabSource`]: where bytes come from on a cache miss ([`DirSource`]
//!   reads a local directory; any `Fn(EncodingFamily)` works too)
//! - [`Provisioner`]: cache first, then source, verifying against the
//!   family's published hash before anything is stored
//!
//! No retries are attempted; every failure goes back to the caller.

mod cache;
mod source;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::{EncodingFamily, Tokenizer, TokenizerError};

pub use cache::{CacheConfig, CacheManifest, ManifestEntry, VocabCache, MANIFEST_FILE};
pub use source::{DirSource, VocabSource};

/// Errors raised while provisioning vocabulary files.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Hash mismatch for {family}: expected {expected}, got {actual}")]
    HashMismatch {
        family: String,
        expected: String,
        actual: String,
    },
    #[error("Vocabulary source failed for {family}: {reason}")]
    Source { family: String, reason: String },
    #[error("Invalid cache entry name: {0:?}")]
    InvalidName(String),
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Loads vocabularies through a cache, falling back to a [`VocabSource`].
#[derive(Debug)]
pub struct Provisioner<S> {
    cache: VocabCache,
    source: S,
    verify: bool,
}

impl<S: VocabSource> Provisioner<S> {
    /// Create a provisioner. Published hashes are verified by default.
    pub fn new(cache: VocabCache, source: S) -> Self {
        Self {
            cache,
            source,
            verify: true,
        }
    }

    /// Enable or disable checking against each family's published SHA-256.
    ///
    /// With checking off, cached files are still checked against the hash
    /// recorded when they were stored.
    pub fn verify_hashes(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn cache(&self) -> &VocabCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut VocabCache {
        &mut self.cache
    }

    /// Raw vocabulary bytes for `family`, from the cache or the source.
    ///
    /// Fetched bytes are verified before they are cached; a mismatch returns
    /// [`ProvisionError::HashMismatch`] and leaves the cache untouched.
    pub fn load_bytes(&mut self, family: EncodingFamily) -> Result<Vec<u8>, ProvisionError> {
        let name = family.vocab_name();
        let expected = self.verify.then(|| family.expected_sha256());

        if let Some(bytes) = self.cache.get(name, expected)? {
            return Ok(bytes);
        }

        log::info!("fetching {} vocabulary", name);
        let bytes = self.source.fetch(family)?;
        self.cache.put(name, &bytes, expected)?;
        Ok(bytes)
    }

    /// Build a tokenizer for `family`.
    pub fn load(&mut self, family: EncodingFamily) -> Result<Tokenizer, ProvisionError> {
        let bytes = self.load_bytes(family)?;
        Ok(Tokenizer::from_family_bytes(family, &bytes)?)
    }
}
