//! Vocabulary loading utilities for the tiktoken BPE format.
//!
//! The tiktoken format is a simple text-based format where each line contains:
//! - A base64-encoded token (the byte sequence)
//! - A single space separator
//! - A decimal rank (the token's priority in BPE merging)
//!
//! Lower ranks indicate higher priority - tokens with lower ranks are merged
//! first during the BPE encoding process.
//!
//! # Example Format
//!
//! ```text
//! SGVsbG8= 0
//! V29ybGQ= 1
//! IQ== 2
//! ```
//!
//! Where:
//! - `SGVsbG8=` decodes to `Hello` (rank 0, highest priority)
//! - `V29ybGQ=` decodes to `World` (rank 1)
//! - `IQ==` decodes to `!` (rank 2)
//!
//! # Leniency
//!
//! Published vocabulary files occasionally carry lines that do not parse.
//! Blank lines are ignored and malformed lines are skipped (and counted)
//! rather than failing the whole load. Duplicate ranks or byte sequences are
//! *not* resolved here; they are kept so that [`VocabStore::build`] can reject
//! them.
//!
//! [`VocabStore::build`]: super::store::VocabStore::build

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use super::error::ConfigError;

/// Ordered `(token bytes, rank)` pairs as they appeared in a vocabulary file.
pub type RankPairs = Vec<(Vec<u8>, u32)>;

/// Result of parsing a vocabulary file.
#[derive(Debug, Clone, Default)]
pub struct ParsedVocab {
    /// Every well-formed entry, in file order.
    pub pairs: RankPairs,
    /// Number of non-blank lines that failed to parse.
    pub skipped: usize,
}

/// Parse a single `base64 rank` line.
///
/// Returns `None` for anything that is not exactly a base64 token, one space
/// and a decimal `u32`.
pub fn parse_line(line: &[u8]) -> Option<(Vec<u8>, u32)> {
    let line = line.trim_ascii();
    let space_pos = line.iter().position(|&b| b == b' ')?;

    let token_b64 = &line[..space_pos];
    let rank_str = std::str::from_utf8(&line[space_pos + 1..]).ok()?;

    let token = STANDARD.decode(token_b64).ok()?;
    let rank: u32 = rank_str.parse().ok()?;

    Some((token, rank))
}

/// Load a tiktoken BPE vocabulary from raw bytes.
///
/// Format: `base64_token rank\n` per line
/// Example: `SGVsbG8= 0` (where "SGVsbG8=" decodes to "Hello")
#[cfg_attr(feature = "tracing", tracing::instrument(skip(data), fields(len = data.len())))]
pub fn load_tiktoken_bpe(data: &[u8]) -> ParsedVocab {
    let mut parsed = ParsedVocab::default();

    for (line_no, line) in data.split(|&b| b == b'\n').enumerate() {
        if line.trim_ascii().is_empty() {
            continue;
        }

        match parse_line(line) {
            Some(entry) => parsed.pairs.push(entry),
            None => {
                log::debug!("skipping malformed vocabulary line {}", line_no + 1);
                parsed.skipped += 1;
            }
        }
    }

    if parsed.skipped > 0 {
        log::warn!(
            "skipped {} malformed vocabulary lines ({} entries loaded)",
            parsed.skipped,
            parsed.pairs.len()
        );
    }

    parsed
}

/// Load a tiktoken BPE vocabulary from a file path.
pub fn load_tiktoken_bpe_file(path: impl AsRef<Path>) -> Result<ParsedVocab, ConfigError> {
    let data = std::fs::read(path.as_ref())?;
    Ok(load_tiktoken_bpe(&data))
}

/// Render `(bytes, rank)` pairs in tiktoken format, sorted by rank.
pub fn write_tiktoken_bpe<'a>(pairs: impl IntoIterator<Item = (&'a [u8], u32)>) -> String {
    let mut entries: Vec<(&[u8], u32)> = pairs.into_iter().collect();
    entries.sort_by_key(|&(_, rank)| rank);

    let mut out = String::with_capacity(entries.len() * 12);
    for (bytes, rank) in entries {
        out.push_str(&STANDARD.encode(bytes));
        out.push(' ');
        out.push_str(&rank.to_string());
        out.push('\n');
    }
    out
}
