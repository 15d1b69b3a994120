//! Python bindings for the ranktok tokenizer.
//!
//! This module provides PyO3 wrappers around the core Rust tokenizer.
//!
//! # Thread Safety
//!
//! The tokenizer is immutable and shared behind an `Arc`, so it can be used
//! from any number of Python threads. Batch operations release the GIL and
//! use Rayon across inputs.
//!
//! # Example
//!
//! ```python
//! from ranktok import Tokenizer
//!
//! tokenizer = Tokenizer.from_encoding("cl100k_base", "cl100k_base.tiktoken")
//!
//! tokens = tokenizer.encode("hello <|endoftext|>", allowed_special="all")
//! text = tokenizer.decode(tokens)
//!
//! decoder = tokenizer.streaming_decoder()
//! for token_id in token_stream:
//!     if text := decoder.add_token(token_id):
//!         print(text, end="", flush=True)
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use pyo3::exceptions::{PyIOError, PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};
use rustc_hash::FxHashMap;

use crate::core::{
    AllowedSpecial, ConfigError, EncodingFamily, Tokenizer, TokenizerError, Utf8Assembler,
};

fn to_py_err(err: TokenizerError) -> PyErr {
    match err {
        TokenizerError::Config(ConfigError::Io(io)) => PyIOError::new_err(io.to_string()),
        TokenizerError::UnknownRank(rank) => {
            PyKeyError::new_err(format!("Unknown token rank: {rank}"))
        }
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Python wrapper for the Rust Tokenizer.
#[pyclass(name = "Tokenizer", frozen)]
pub struct PyTokenizer {
    inner: Arc<Tokenizer>,
}

impl PyTokenizer {
    fn wrap(inner: Tokenizer) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

#[pymethods]
impl PyTokenizer {
    /// Create a new tokenizer from a vocabulary file.
    ///
    /// Args:
    ///     vocab_path: Path to a tiktoken-format vocabulary file
    ///     pattern: Segmentation regex pattern
    ///     special_tokens: Optional dict of special tokens to IDs
    #[new]
    #[pyo3(signature = (vocab_path, pattern, special_tokens=None))]
    fn new(
        vocab_path: &str,
        pattern: &str,
        special_tokens: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<Self> {
        let special = parse_special_tokens(special_tokens)?;
        let inner = Tokenizer::from_file(vocab_path, special, pattern).map_err(to_py_err)?;
        Ok(Self::wrap(inner))
    }

    /// Create a tokenizer from raw vocabulary bytes.
    ///
    /// Args:
    ///     vocab_data: Raw bytes of tiktoken-format vocabulary
    ///     pattern: Segmentation regex pattern
    ///     special_tokens: Optional dict of special tokens to IDs
    #[staticmethod]
    #[pyo3(signature = (vocab_data, pattern, special_tokens=None))]
    fn from_bytes(
        vocab_data: &[u8],
        pattern: &str,
        special_tokens: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<Self> {
        let special = parse_special_tokens(special_tokens)?;
        let inner = Tokenizer::from_bytes(vocab_data, special, pattern).map_err(to_py_err)?;
        Ok(Self::wrap(inner))
    }

    /// Create a tokenizer for a known encoding from its vocabulary file.
    ///
    /// Supported names: "r50k_base" (alias "gpt2"), "p50k_base", "p50k_edit",
    /// "cl100k_base", "o200k_base".
    ///
    /// Args:
    ///     name: Encoding name
    ///     vocab_path: Path to the encoding's .tiktoken file
    #[staticmethod]
    fn from_encoding(name: &str, vocab_path: &str) -> PyResult<Self> {
        let family = EncodingFamily::parse(name).map_err(to_py_err)?;
        let inner = Tokenizer::from_file(vocab_path, family.special_tokens(), family.pattern())
            .map_err(to_py_err)?;
        Ok(Self::wrap(inner))
    }

    /// Encode text to token IDs.
    ///
    /// Args:
    ///     text: Input text to encode
    ///     allowed_special: None (default) to treat special tokens as text,
    ///         "all" to allow every special token, or a set of token strings
    ///
    /// Returns:
    ///     List of token IDs
    #[pyo3(signature = (text, allowed_special=None))]
    fn encode(&self, text: &str, allowed_special: Option<&Bound<'_, PyAny>>) -> PyResult<Vec<u32>> {
        let allowed = parse_allowed_special(allowed_special)?;
        self.inner.encode(text, &allowed).map_err(to_py_err)
    }

    /// Encode text to token IDs, treating special tokens as regular text.
    fn encode_ordinary(&self, text: &str) -> PyResult<Vec<u32>> {
        self.inner.encode_ordinary(text).map_err(to_py_err)
    }

    /// Encode text with every special token allowed.
    fn encode_with_special(&self, text: &str) -> PyResult<Vec<u32>> {
        self.inner.encode_with_special(text).map_err(to_py_err)
    }

    /// Batch encode multiple texts in parallel.
    ///
    /// Args:
    ///     texts: List of texts to encode
    ///     allowed_special: As for `encode`
    ///
    /// Returns:
    ///     List of token ID lists
    #[pyo3(signature = (texts, allowed_special=None))]
    fn encode_batch(
        &self,
        py: Python<'_>,
        texts: Vec<String>,
        allowed_special: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<Vec<Vec<u32>>> {
        let allowed = parse_allowed_special(allowed_special)?;
        let inner = &self.inner;
        py.allow_threads(|| inner.encode_batch(&texts, &allowed))
            .map_err(to_py_err)
    }

    /// Batch encode multiple texts in parallel, treating special tokens as text.
    fn encode_ordinary_batch(&self, py: Python<'_>, texts: Vec<String>) -> PyResult<Vec<Vec<u32>>> {
        let inner = &self.inner;
        py.allow_threads(|| inner.encode_ordinary_batch(&texts))
            .map_err(to_py_err)
    }

    /// Decode token IDs to a string.
    ///
    /// Raises:
    ///     KeyError: If a token ID is unknown
    ///     ValueError: If decoded bytes are not valid UTF-8
    fn decode(&self, tokens: Vec<u32>) -> PyResult<String> {
        self.inner.decode(&tokens).map_err(to_py_err)
    }

    /// Decode token IDs to bytes.
    fn decode_bytes<'py>(&self, py: Python<'py>, tokens: Vec<u32>) -> PyResult<Bound<'py, PyBytes>> {
        let bytes = self.inner.decode_bytes(&tokens).map_err(to_py_err)?;
        Ok(PyBytes::new(py, &bytes))
    }

    /// Decode token IDs to string, replacing invalid UTF-8.
    fn decode_lossy(&self, tokens: Vec<u32>) -> PyResult<String> {
        self.inner.decode_lossy(&tokens).map_err(to_py_err)
    }

    /// Batch decode multiple token lists in parallel.
    fn decode_batch(&self, py: Python<'_>, token_lists: Vec<Vec<u32>>) -> PyResult<Vec<String>> {
        let inner = &self.inner;
        py.allow_threads(|| inner.decode_batch(&token_lists))
            .map_err(to_py_err)
    }

    /// The configured special-token strings.
    #[getter]
    fn special_tokens(&self) -> HashSet<String> {
        self.inner
            .special_tokens()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Get the vocabulary size (including special tokens).
    #[getter]
    fn vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }

    /// The segmentation pattern.
    #[getter]
    fn pattern(&self) -> String {
        self.inner.pattern().to_string()
    }

    /// Create a streaming decoder for UTF-8 safe token-by-token decoding.
    ///
    /// Example:
    ///     decoder = tokenizer.streaming_decoder()
    ///     for token_id in token_stream:
    ///         if text := decoder.add_token(token_id):
    ///             print(text, end="", flush=True)
    ///     print(decoder.flush())
    fn streaming_decoder(&self) -> PyStreamingDecoder {
        PyStreamingDecoder {
            tokenizer: Arc::clone(&self.inner),
            assembler: Utf8Assembler::new(),
        }
    }

    fn __repr__(&self) -> String {
        format!("Tokenizer(vocab_size={})", self.inner.vocab_size())
    }
}

/// Parse special tokens from Python dict to FxHashMap.
fn parse_special_tokens(
    special_tokens: Option<&Bound<'_, PyDict>>,
) -> PyResult<FxHashMap<String, u32>> {
    let mut result = FxHashMap::default();

    if let Some(dict) = special_tokens {
        for (key, value) in dict.iter() {
            let k: String = key.extract()?;
            let v: u32 = value.extract()?;
            result.insert(k, v);
        }
    }

    Ok(result)
}

/// Accepts None, the string "all", or any collection of strings.
fn parse_allowed_special(allowed: Option<&Bound<'_, PyAny>>) -> PyResult<AllowedSpecial> {
    let Some(obj) = allowed else {
        return Ok(AllowedSpecial::None);
    };
    if let Ok(s) = obj.extract::<String>() {
        return if s == "all" {
            Ok(AllowedSpecial::All)
        } else {
            Err(PyValueError::new_err(format!(
                "allowed_special must be None, \"all\" or a collection of strings, got {s:?}"
            )))
        };
    }
    if let Ok(set) = obj.extract::<HashSet<String>>() {
        return Ok(AllowedSpecial::only(set));
    }
    let list: Vec<String> = obj.extract()?;
    Ok(AllowedSpecial::only(list))
}

/// Python wrapper for streaming decoder.
///
/// Buffers incomplete UTF-8 sequences and only emits complete characters.
#[pyclass(name = "StreamingDecoder")]
pub struct PyStreamingDecoder {
    tokenizer: Arc<Tokenizer>,
    assembler: Utf8Assembler,
}

#[pymethods]
impl PyStreamingDecoder {
    /// Add a token and return any complete UTF-8 characters.
    ///
    /// Returns:
    ///     String of complete characters, or None if still buffering
    ///
    /// Raises:
    ///     KeyError: If the token ID is unknown
    fn add_token(&mut self, token_id: u32) -> PyResult<Option<String>> {
        let bytes = self
            .tokenizer
            .decode_single_token_bytes(token_id)
            .map_err(to_py_err)?;
        self.assembler.push(bytes);
        Ok(self.assembler.take_complete())
    }

    /// Add multiple tokens at once and return complete UTF-8 characters.
    fn add_tokens(&mut self, token_ids: Vec<u32>) -> PyResult<Option<String>> {
        let bytes = self.tokenizer.decode_bytes(&token_ids).map_err(to_py_err)?;
        self.assembler.push(&bytes);
        Ok(self.assembler.take_complete())
    }

    /// Flush any remaining buffered bytes, replacing an incomplete tail with U+FFFD.
    fn flush(&mut self) -> String {
        self.assembler.flush()
    }

    /// Reset the decoder state, discarding any buffered bytes.
    fn reset(&mut self) {
        self.assembler.reset();
    }

    #[getter]
    fn has_pending(&self) -> bool {
        self.assembler.has_pending()
    }

    #[getter]
    fn pending_bytes(&self) -> usize {
        self.assembler.pending_bytes()
    }

    fn __repr__(&self) -> String {
        format!(
            "StreamingDecoder(pending_bytes={})",
            self.assembler.pending_bytes()
        )
    }
}
