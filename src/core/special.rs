//! Special-token scanning.
//!
//! Special tokens are literal strings (such as `<|endoftext|>`) that bypass
//! segmentation and merging and emit a reserved rank. The scanner partitions
//! text into [`Span`]s using an Aho-Corasick automaton with leftmost-longest
//! semantics, so when `<|a|>` and `<|a|>x` both start at the same offset the
//! longer one wins.

use aho_corasick::{AhoCorasick, MatchKind};
use rustc_hash::{FxHashMap, FxHashSet};

use super::error::ConfigError;

/// Which configured special tokens may match during an encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedSpecial {
    /// No special token matches; their text is encoded as ordinary text.
    #[default]
    None,
    /// Every configured special token matches.
    All,
    /// Only the listed tokens match. Names that are not configured are ignored.
    Only(FxHashSet<String>),
}

impl AllowedSpecial {
    /// Allow exactly the given tokens.
    pub fn only<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowedSpecial::Only(tokens.into_iter().map(Into::into).collect())
    }

    /// Whether this allows nothing at all.
    pub fn is_none(&self) -> bool {
        match self {
            AllowedSpecial::None => true,
            AllowedSpecial::All => false,
            AllowedSpecial::Only(set) => set.is_empty(),
        }
    }
}

/// A contiguous region of scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'t> {
    /// Text to run through segmentation and merging.
    Literal(&'t str),
    /// A matched special token, as its rank.
    Special(u32),
}

/// Matches configured special tokens in text.
#[derive(Debug, Clone)]
pub struct SpecialScanner {
    /// Token strings, sorted; pattern ids of `matcher` index into this.
    tokens: Vec<String>,
    ranks: Vec<u32>,
    matcher: Option<AhoCorasick>,
}

impl SpecialScanner {
    /// Build a scanner over every configured special token.
    pub fn new(special_tokens: &FxHashMap<String, u32>) -> Result<Self, ConfigError> {
        let mut entries: Vec<(&String, &u32)> = special_tokens.iter().collect();
        entries.sort();

        let tokens: Vec<String> = entries.iter().map(|&(t, _)| t.clone()).collect();
        let ranks: Vec<u32> = entries.iter().map(|&(_, &r)| r).collect();
        let matcher = if tokens.is_empty() {
            None
        } else {
            Some(build_matcher(&tokens)?)
        };

        Ok(Self {
            tokens,
            ranks,
            matcher,
        })
    }

    /// Partition `text` into literal and special spans.
    ///
    /// Literal spans are never empty. With [`AllowedSpecial::Only`] the
    /// automaton is built over the allowed subset, so a disallowed token
    /// cannot shadow an allowed one that overlaps it.
    pub fn spans<'t>(
        &self,
        text: &'t str,
        allowed: &AllowedSpecial,
    ) -> Result<Vec<Span<'t>>, ConfigError> {
        let matcher = match &self.matcher {
            Some(matcher) if !allowed.is_none() => matcher,
            _ => return Ok(literal_only(text)),
        };
        match allowed {
            AllowedSpecial::None => Ok(literal_only(text)),
            AllowedSpecial::All => Ok(split(matcher, &self.ranks, text)),
            AllowedSpecial::Only(names) => {
                let (tokens, ranks): (Vec<&str>, Vec<u32>) = self
                    .tokens
                    .iter()
                    .zip(&self.ranks)
                    .filter(|(token, _)| names.contains(token.as_str()))
                    .map(|(token, &rank)| (token.as_str(), rank))
                    .unzip();
                if tokens.is_empty() {
                    return Ok(literal_only(text));
                }
                let matcher = build_matcher(&tokens)?;
                Ok(split(&matcher, &ranks, text))
            }
        }
    }
}

fn build_matcher<P: AsRef<[u8]>>(patterns: &[P]) -> Result<AhoCorasick, ConfigError> {
    Ok(AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)?)
}

fn literal_only(text: &str) -> Vec<Span<'_>> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Span::Literal(text)]
    }
}

fn split<'t>(matcher: &AhoCorasick, ranks: &[u32], text: &'t str) -> Vec<Span<'t>> {
    let mut spans = Vec::new();
    let mut last_end = 0;

    for m in matcher.find_iter(text) {
        if m.start() > last_end {
            spans.push(Span::Literal(&text[last_end..m.start()]));
        }
        spans.push(Span::Special(ranks[m.pattern().as_usize()]));
        last_end = m.end();
    }

    if last_end < text.len() {
        spans.push(Span::Literal(&text[last_end..]));
    }
    spans
}
