//! Shared loaders for the integration tests.
//!
//! Published vocabularies are not checked in. A test that needs one looks for
//! `RANKTOK_<NAME>_PATH` (e.g. `RANKTOK_CL100K_BASE_PATH`), then for a verified
//! copy in the vocabulary cache. Such tests are `#[ignore]`d so a default run
//! reports them as ignored rather than passed.

#![allow(dead_code)]

use std::path::PathBuf;

use ranktok::{CacheConfig, EncodingFamily, Tokenizer, VocabCache};
use rustc_hash::FxHashMap;

/// Raw `.tiktoken` bytes for `family`, if available locally.
pub fn family_bytes(family: EncodingFamily) -> Option<Vec<u8>> {
    let var = format!("RANKTOK_{}_PATH", family.vocab_name().to_ascii_uppercase());
    if let Some(path) = std::env::var_os(&var).map(PathBuf::from) {
        return Some(std::fs::read(&path).unwrap_or_else(|e| {
            panic!("{} points at {}: {}", var, path.display(), e)
        }));
    }

    let mut cache = VocabCache::open(CacheConfig::from_env()).ok()?;
    cache.get_family(family).ok().flatten()
}

/// Tokenizer for `family`.
///
/// Tests that call this are `#[ignore]`d by default; run them with
/// `cargo test -- --ignored` once a vocabulary is available.
pub fn family_tokenizer(family: EncodingFamily) -> Tokenizer {
    let bytes = family_bytes(family).unwrap_or_else(|| {
        panic!(
            "no {} vocabulary: set RANKTOK_{}_PATH or populate the cache",
            family.vocab_name(),
            family.vocab_name().to_ascii_uppercase()
        )
    });
    Tokenizer::from_family_bytes(family, &bytes).unwrap()
}

/// Byte-level vocabulary with a handful of merges.
///
/// Ranks: 0..=255 single bytes, then "He" 256, "ll" 257, "llo" 258,
/// "Hello" 259, " W" 260, "or" 261, " Wor" 262, "ld" 263, " World" 264,
/// "aa" 265, "aaaa" 266.
pub fn toy_vocab() -> FxHashMap<Vec<u8>, u32> {
    let mut encoder: FxHashMap<Vec<u8>, u32> = FxHashMap::default();
    for b in 0u8..=255 {
        encoder.insert(vec![b], b as u32);
    }
    for (i, merge) in [
        "He", "ll", "llo", "Hello", " W", "or", " Wor", "ld", " World", "aa", "aaaa",
    ]
    .iter()
    .enumerate()
    {
        encoder.insert(merge.as_bytes().to_vec(), 256 + i as u32);
    }
    encoder
}

/// `toy_vocab` in `.tiktoken` form.
pub fn toy_vocab_file() -> Vec<u8> {
    let vocab = toy_vocab();
    ranktok::core::write_tiktoken_bpe(vocab.iter().map(|(bytes, &rank)| (bytes.as_slice(), rank)))
        .into_bytes()
}
