//! Integration tests for cl100k_base (GPT-4, GPT-3.5-turbo).
//!
//! Ignored by default; they need the published vocabulary (see `common`).

mod common;

use std::sync::LazyLock;

use ranktok::{AllowedSpecial, EncodingFamily, StreamingDecoder, Tokenizer};

/// Shared tokenizer instance to avoid expensive re-initialization per test.
static TOKENIZER: LazyLock<Tokenizer> =
    LazyLock::new(|| common::family_tokenizer(EncodingFamily::Cl100kBase));

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_exact_tokens() {
    let tokenizer = &*TOKENIZER;
    assert_eq!(tokenizer.encode_ordinary("hello world").unwrap(), vec![15339, 1917]);
    assert_eq!(
        tokenizer.encode_ordinary("Hello, world!").unwrap(),
        vec![9906, 11, 1917, 0]
    );
    assert_eq!(tokenizer.encode_ordinary(" ").unwrap(), vec![220]);
    assert!(tokenizer.encode_ordinary("").unwrap().is_empty());
}

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_encode_decode_roundtrip() {
    let tokenizer = &*TOKENIZER;
    let test_cases = [
        "Hello, world!",
        "The quick brown fox jumps over the lazy dog.",
        "Rust is a systems programming language.",
        "1234567890",
        "Special characters: !@#$%^&*()",
        "Multi-line\ntext\nwith\nnewlines",
        "Unicode: こんにちは 世界 🦀",
        "fn main() {\n    println!(\"Hello, world!\");\n}\n",
    ];
    for text in test_cases {
        let tokens = tokenizer.encode_ordinary(text).unwrap();
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text, "roundtrip of {:?}", text);
    }
}

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_vocab_size() {
    let tokenizer = &*TOKENIZER;
    assert_eq!(tokenizer.max_token_value(), Some(100276));
    assert_eq!(tokenizer.store().len(), 100256);
}

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_special_tokens() {
    let tokenizer = &*TOKENIZER;

    let only_eot = AllowedSpecial::only(["<|endoftext|>"]);
    let tokens = tokenizer.encode("hello <|endoftext|>", &only_eot).unwrap();
    assert_eq!(tokens.last(), Some(&100257));

    let tokens = tokenizer
        .encode_with_special("<|fim_prefix|>code<|fim_middle|>")
        .unwrap();
    assert_eq!(tokens.first(), Some(&100258));
    assert_eq!(tokens.last(), Some(&100259));

    let tokens = tokenizer.encode_with_special("<|endofprompt|>").unwrap();
    assert_eq!(tokens, vec![100276]);

    let plain = tokenizer.encode_ordinary("<|endoftext|>").unwrap();
    assert!(!plain.contains(&100257));
    assert_eq!(tokenizer.decode(&plain).unwrap(), "<|endoftext|>");
}

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_batch_matches_sequential() {
    let tokenizer = &*TOKENIZER;
    let texts = vec![
        "Hello, world!".to_string(),
        "How are you?".to_string(),
        String::new(),
        "Multi\nline".to_string(),
    ];
    let batch = tokenizer.encode_ordinary_batch(&texts).unwrap();
    for (text, tokens) in texts.iter().zip(&batch) {
        assert_eq!(tokens, &tokenizer.encode_ordinary(text).unwrap());
    }
    assert_eq!(tokenizer.decode_batch(&batch).unwrap(), texts);
}

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_streaming_decode() {
    let tokenizer = &*TOKENIZER;
    let text = "Streaming 日本語 text 🦀🦀";
    let tokens = tokenizer.encode_ordinary(text).unwrap();

    let mut decoder = StreamingDecoder::new(tokenizer);
    let mut out = String::new();
    for &token in &tokens {
        if let Some(chunk) = decoder.add_token(token).unwrap() {
            out.push_str(&chunk);
        }
    }
    out.push_str(&decoder.flush());
    assert_eq!(out, text);
}

#[test]
#[ignore = "needs RANKTOK_CL100K_BASE_PATH or a cached vocabulary"]
fn test_cl100k_whitespace_runs() {
    let tokenizer = &*TOKENIZER;
    let long = " ".repeat(10_000);
    for text in ["a  b", "a   \n\n  b", "trailing   ", "\n\n\n", long.as_str()] {
        let tokens = tokenizer.encode_ordinary(text).unwrap();
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }
}
