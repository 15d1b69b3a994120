//! Pattern segmentation: splitting text into the pieces that BPE runs on.
//!
//! Segmentation runs on the `regex` crate, which matches in linear time and
//! therefore has no lookaround or possessive quantifiers. The published
//! tiktoken patterns use both, so [`Segmenter::new`] rewrites them:
//!
//! - Possessive quantifiers (`++`, `*+`, `?+`, `{m,n}+`) become greedy. In the
//!   tiktoken patterns no alternative can succeed by backtracking into them,
//!   so the match is unchanged.
//! - The trailing `\s+(?!\S)|\s+` (or `\s+(?!\S)|\s`) becomes one named group.
//!   When that group matches two or more characters and is followed by more
//!   text, the final whitespace character is handed back to the next piece.
//!   That is exactly what the lookahead does: it lets `" world"` keep its
//!   leading space.
//!
//! Text that no alternative matches is still yielded, as its own piece, so
//! the pieces of a string always concatenate back to it.

use regex::{CaptureLocations, Regex};

use super::error::ConfigError;

/// GPT-2 style pattern used by `r50k_base`, `p50k_base` and `p50k_edit`.
pub const R50K_BASE_PATTERN: &str =
    r"'(?:[sdmt]|ll|ve|re)| ?\p{L}++| ?\p{N}++| ?[^\s\p{L}\p{N}]++|\s++$|\s+(?!\S)|\s";

/// Pattern used by `cl100k_base`.
pub const CL100K_BASE_PATTERN: &str = r"'(?i:[sdmt]|ll|ve|re)|[^\r\n\p{L}\p{N}]?+\p{L}++|\p{N}{1,3}+| ?[^\s\p{L}\p{N}]++[\r\n]*+|\s++$|\s*[\r\n]|\s+(?!\S)|\s";

/// Pattern used by `o200k_base`.
pub const O200K_BASE_PATTERN: &str = concat!(
    r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"|\p{N}{1,3}",
    r"| ?[^\s\p{L}\p{N}]+[\r\n/]*",
    r"|\s*[\r\n]+",
    r"|\s+(?!\S)",
    r"|\s+",
);

const TAIL_GROUP: &str = "ws_tail";
const TAIL_SUFFIXES: [&str; 2] = [r"\s+(?!\S)|\s+", r"\s+(?!\S)|\s"];

/// A compiled segmentation pattern.
#[derive(Debug, Clone)]
pub struct Segmenter {
    source: String,
    regex: Regex,
    /// Capture index of the rewritten whitespace tail, if the pattern had one.
    tail: Option<usize>,
}

impl Segmenter {
    /// Compile a segmentation pattern.
    ///
    /// # Errors
    /// [`ConfigError::Pattern`] if the pattern, after rewriting, is not valid
    /// for the `regex` crate (for example it uses lookaround anywhere other
    /// than the trailing whitespace alternation).
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let (rewritten, has_tail) = rewrite_pattern(pattern);
        let regex = Regex::new(&rewritten)?;
        let tail = if has_tail {
            regex
                .capture_names()
                .position(|name| name == Some(TAIL_GROUP))
        } else {
            None
        };

        Ok(Self {
            source: pattern.to_string(),
            regex,
            tail,
        })
    }

    /// The pattern as it was supplied.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Lazily split `text` into pieces.
    pub fn pieces<'s, 't>(&'s self, text: &'t str) -> Pieces<'s, 't> {
        Pieces {
            segmenter: self,
            text,
            pos: 0,
            locs: self.regex.capture_locations(),
            pending: None,
        }
    }
}

/// Iterator over the pieces of one text. See [`Segmenter::pieces`].
#[derive(Debug)]
pub struct Pieces<'s, 't> {
    segmenter: &'s Segmenter,
    text: &'t str,
    pos: usize,
    locs: CaptureLocations,
    /// A match found after an unmatched gap, yielded on the next call.
    pending: Option<(usize, usize)>,
}

impl<'s, 't> Pieces<'s, 't> {
    /// Next non-empty match at or after `from`, with the lookahead applied.
    fn next_match(&mut self, mut from: usize) -> Option<(usize, usize)> {
        let text = self.text;
        while from < text.len() {
            let m = self
                .segmenter
                .regex
                .captures_read_at(&mut self.locs, text, from)?;
            let (start, mut end) = (m.start(), m.end());

            if start == end {
                // Empty match: step over one character and search again.
                from = start + text[start..].chars().next().map_or(1, char::len_utf8);
                continue;
            }

            if let Some(group) = self.segmenter.tail {
                if self.locs.get(group).is_some() && end < text.len() {
                    if let Some((offset, _)) = text[start..end].char_indices().next_back() {
                        if offset > 0 {
                            end = start + offset;
                        }
                    }
                }
            }
            return Some((start, end));
        }
        None
    }
}

impl<'s, 't> Iterator for Pieces<'s, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        if let Some((start, end)) = self.pending.take() {
            self.pos = end;
            return Some(&self.text[start..end]);
        }
        if self.pos >= self.text.len() {
            return None;
        }

        let from = self.pos;
        match self.next_match(from) {
            Some((start, end)) if start > from => {
                self.pending = Some((start, end));
                self.pos = start;
                Some(&self.text[from..start])
            }
            Some((start, end)) => {
                self.pos = end;
                Some(&self.text[start..end])
            }
            None => {
                self.pos = self.text.len();
                Some(&self.text[from..])
            }
        }
    }
}

/// Rewrite a pattern into the dialect of the `regex` crate.
///
/// Returns the rewritten pattern and whether a whitespace tail group was
/// introduced.
pub(crate) fn rewrite_pattern(pattern: &str) -> (String, bool) {
    let greedy = strip_possessive(pattern);
    for suffix in TAIL_SUFFIXES {
        if let Some(head) = greedy.strip_suffix(suffix) {
            return (format!(r"{head}(?P<{TAIL_GROUP}>\s+)"), true);
        }
    }
    (greedy, false)
}

/// Drop the `+` that makes a quantifier possessive.
fn strip_possessive(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut class_depth = 0usize;
    let mut after_quantifier = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                    // `\p{..}`, `\x{..}` and friends carry a braced argument.
                    if matches!(escaped, 'p' | 'P' | 'x' | 'u' | 'U') && chars.peek() == Some(&'{')
                    {
                        for b in chars.by_ref() {
                            out.push(b);
                            if b == '}' {
                                break;
                            }
                        }
                    }
                }
                after_quantifier = false;
            }
            '[' => {
                out.push(c);
                class_depth += 1;
                // A `]` right after the opening bracket (or `[^`) is literal.
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
                after_quantifier = false;
            }
            ']' if class_depth > 0 => {
                out.push(c);
                class_depth -= 1;
                after_quantifier = false;
            }
            '+' if class_depth == 0 && after_quantifier => {
                after_quantifier = false;
            }
            '+' | '*' | '?' | '}' if class_depth == 0 => {
                out.push(c);
                after_quantifier = true;
            }
            _ => {
                out.push(c);
                after_quantifier = false;
            }
        }
    }
    out
}
