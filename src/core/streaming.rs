//! UTF-8 safe streaming decoder for token-by-token output.
//!
//! A token's bytes may end in the middle of a multi-byte UTF-8 character.
//! [`Utf8Assembler`] buffers such incomplete sequences and only emits
//! complete characters; [`StreamingDecoder`] feeds it token bytes from a
//! [`Tokenizer`].

use super::error::TokenizerError;
use super::tokenizer::Tokenizer;

/// Incremental UTF-8 assembly over a byte stream.
///
/// Bytes that can never become valid UTF-8 are emitted as U+FFFD as soon as
/// that is certain; only a possibly-incomplete trailing sequence is held back.
#[derive(Debug, Clone, Default)]
pub struct Utf8Assembler {
    buffer: Vec<u8>,
}

impl Utf8Assembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(16),
        }
    }

    /// Append raw bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take every complete character from the buffer.
    ///
    /// Returns `None` when nothing can be emitted yet.
    pub fn take_complete(&mut self) -> Option<String> {
        let mut out = String::new();
        let mut consumed = 0;

        while consumed < self.buffer.len() {
            let rest = &self.buffer[consumed..];
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    consumed = self.buffer.len();
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + bad;
                        }
                        None => {
                            // Incomplete trailing sequence; wait for more bytes.
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.buffer.drain(..consumed);
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Emit everything buffered, replacing an incomplete tail with U+FFFD.
    pub fn flush(&mut self) -> String {
        if self.buffer.is_empty() {
            return String::new();
        }

        let result = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        result
    }

    /// Discard any buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Check if there are buffered bytes waiting for completion.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Get the number of pending bytes in the buffer.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

/// A streaming decoder that handles incomplete UTF-8 sequences across token boundaries.
///
/// # Example
///
/// ```ignore
/// let mut decoder = StreamingDecoder::new(&tokenizer);
///
/// for token_id in token_stream {
///     if let Some(text) = decoder.add_token(token_id)? {
///         print!("{}", text);
///     }
/// }
/// // Flush any remaining buffered bytes
/// print!("{}", decoder.flush());
/// ```
#[derive(Debug, Clone)]
pub struct StreamingDecoder<'a> {
    tokenizer: &'a Tokenizer,
    assembler: Utf8Assembler,
}

impl<'a> StreamingDecoder<'a> {
    /// Create a new streaming decoder for the given tokenizer.
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self {
            tokenizer,
            assembler: Utf8Assembler::new(),
        }
    }

    /// Add a token and return any complete UTF-8 characters.
    ///
    /// Returns `Ok(None)` if the buffered bytes are still incomplete. An
    /// unknown rank is an error and leaves the buffer untouched.
    pub fn add_token(&mut self, token_id: u32) -> Result<Option<String>, TokenizerError> {
        let bytes = self.tokenizer.decode_single_token_bytes(token_id)?;
        self.assembler.push(bytes);
        Ok(self.assembler.take_complete())
    }

    /// Add multiple tokens at once and return complete UTF-8 characters.
    ///
    /// All ranks are resolved before any are buffered.
    pub fn add_tokens(&mut self, token_ids: &[u32]) -> Result<Option<String>, TokenizerError> {
        let bytes = self.tokenizer.decode_bytes(token_ids)?;
        self.assembler.push(&bytes);
        Ok(self.assembler.take_complete())
    }

    /// Flush any remaining buffered bytes.
    ///
    /// If there are incomplete UTF-8 sequences in the buffer, they will be
    /// replaced with the Unicode replacement character (U+FFFD).
    pub fn flush(&mut self) -> String {
        self.assembler.flush()
    }

    /// Reset the decoder state, discarding any buffered bytes.
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    pub fn has_pending(&self) -> bool {
        self.assembler.has_pending()
    }

    pub fn pending_bytes(&self) -> usize {
        self.assembler.pending_bytes()
    }
}
