//! Known tiktoken encoding families.
//!
//! Each family bundles what a `.tiktoken` file does not carry: the
//! segmentation pattern, the special tokens, and where the file is published
//! along with its SHA-256 digest.
//!
//! - `r50k_base` (alias `gpt2`) - GPT-2, GPT-3 (~50k tokens)
//! - `p50k_base` - Codex, text-davinci-002/003
//! - `p50k_edit` - p50k_base plus fill-in-the-middle tokens
//! - `cl100k_base` - GPT-4, GPT-3.5-turbo (~100k tokens)
//! - `o200k_base` - GPT-4o (~200k tokens)

use std::fmt;

use rustc_hash::FxHashMap;

use super::error::TokenizerError;
use super::segment::{CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN};

pub const ENDOFTEXT: &str = "<|endoftext|>";
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";
pub const ENDOFPROMPT: &str = "<|endofprompt|>";

const BASE_URL: &str = "https://openaipublic.blob.core.windows.net/encodings";

/// Supported encoding families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingFamily {
    /// GPT-2 / GPT-3
    R50kBase,
    /// Codex
    P50kBase,
    /// Codex edit models
    P50kEdit,
    /// GPT-4, GPT-3.5-turbo
    Cl100kBase,
    /// GPT-4o
    O200kBase,
}

impl EncodingFamily {
    /// Every family, in publication order.
    pub const ALL: [EncodingFamily; 5] = [
        Self::R50kBase,
        Self::P50kBase,
        Self::P50kEdit,
        Self::Cl100kBase,
        Self::O200kBase,
    ];

    /// Parse an encoding name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "r50k_base" | "gpt2" => Some(Self::R50kBase),
            "p50k_base" => Some(Self::P50kBase),
            "p50k_edit" => Some(Self::P50kEdit),
            "cl100k_base" => Some(Self::Cl100kBase),
            "o200k_base" => Some(Self::O200kBase),
            _ => None,
        }
    }

    /// Parse an encoding name, reporting the supported names on failure.
    pub fn parse(name: &str) -> Result<Self, TokenizerError> {
        Self::from_name(name).ok_or_else(|| {
            TokenizerError::UnknownEncoding(format!(
                "{}. Supported: {}",
                name,
                Self::supported_names().join(", ")
            ))
        })
    }

    /// Get all supported encoding names, aliases included.
    pub fn supported_names() -> &'static [&'static str] {
        &[
            "r50k_base",
            "gpt2",
            "p50k_base",
            "p50k_edit",
            "cl100k_base",
            "o200k_base",
        ]
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::R50kBase => "r50k_base",
            Self::P50kBase => "p50k_base",
            Self::P50kEdit => "p50k_edit",
            Self::Cl100kBase => "cl100k_base",
            Self::O200kBase => "o200k_base",
        }
    }

    /// Name of the vocabulary file. `p50k_edit` shares the `p50k_base` file.
    pub fn vocab_name(self) -> &'static str {
        match self {
            Self::P50kEdit => Self::P50kBase.name(),
            other => other.name(),
        }
    }

    /// Segmentation pattern.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::R50kBase | Self::P50kBase | Self::P50kEdit => R50K_BASE_PATTERN,
            Self::Cl100kBase => CL100K_BASE_PATTERN,
            Self::O200kBase => O200K_BASE_PATTERN,
        }
    }

    /// Special tokens and their ranks.
    pub fn special_tokens(self) -> FxHashMap<String, u32> {
        let entries: &[(&str, u32)] = match self {
            Self::R50kBase | Self::P50kBase => &[(ENDOFTEXT, 50256)],
            Self::P50kEdit => &[
                (ENDOFTEXT, 50256),
                (FIM_PREFIX, 50281),
                (FIM_MIDDLE, 50282),
                (FIM_SUFFIX, 50283),
            ],
            Self::Cl100kBase => &[
                (ENDOFTEXT, 100257),
                (FIM_PREFIX, 100258),
                (FIM_MIDDLE, 100259),
                (FIM_SUFFIX, 100260),
                (ENDOFPROMPT, 100276),
            ],
            Self::O200kBase => &[(ENDOFTEXT, 199999), (ENDOFPROMPT, 200018)],
        };
        entries
            .iter()
            .map(|&(token, rank)| (token.to_string(), rank))
            .collect()
    }

    /// Published location of the vocabulary file.
    pub fn url(self) -> String {
        format!("{}/{}.tiktoken", BASE_URL, self.vocab_name())
    }

    /// SHA-256 of the published vocabulary file, lowercase hex.
    pub fn expected_sha256(self) -> &'static str {
        match self {
            Self::R50kBase => "306cd27f03c1a714eca7108e03d66b7dc042abe8c258b44c199a7ed9838dd930",
            Self::P50kBase | Self::P50kEdit => {
                "94b5ca7dff4d00767bc256fdd1b27e5b17361d7b8a5f968547f9f23eb70d2069"
            }
            Self::Cl100kBase => "223921b76ee99bde995b7ff738513eef100fb51d18c93597a113bcffe865b2a7",
            Self::O200kBase => "446a9538cb6c348e3516120d7c08b09f57c36495e2acfffe59a5bf8b0cfb1a2d",
        }
    }

    /// Vocabulary size the family is published with, where it is fixed.
    pub fn explicit_vocab_size(self) -> Option<usize> {
        match self {
            Self::R50kBase => Some(50257),
            Self::P50kBase => Some(50281),
            Self::P50kEdit | Self::Cl100kBase | Self::O200kBase => None,
        }
    }

    /// Get the EOS (end of sequence) token ID.
    pub fn eos_token_id(self) -> u32 {
        match self {
            Self::R50kBase | Self::P50kBase | Self::P50kEdit => 50256,
            Self::Cl100kBase => 100257,
            Self::O200kBase => 199999,
        }
    }
}

impl fmt::Display for EncodingFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
