//! Engine tests against a small byte-level vocabulary.
//!
//! These run everywhere; tests against published vocabularies live in the
//! per-encoding files and are ignored unless asked for.

mod common;

use std::sync::Arc;
use std::thread;

use ranktok::core::Segmenter;
use ranktok::{
    AllowedSpecial, ConfigError, StreamingDecoder, Tokenizer, TokenizerError, CL100K_BASE_PATTERN,
    R50K_BASE_PATTERN,
};
use rustc_hash::FxHashMap;

const EOT: u32 = 50256;
const A: u32 = 50257;
const AX: u32 = 50258;

fn specials() -> FxHashMap<String, u32> {
    let mut special = FxHashMap::default();
    special.insert("<|endoftext|>".to_string(), EOT);
    special.insert("<|a|>".to_string(), A);
    special.insert("<|a|>x".to_string(), AX);
    special
}

fn toy_tokenizer() -> Tokenizer {
    Tokenizer::new(common::toy_vocab(), specials(), CL100K_BASE_PATTERN).unwrap()
}

#[test]
fn test_roundtrip() {
    let tokenizer = toy_tokenizer();
    let texts = [
        "Hello World",
        "Hello, world!",
        "  leading and trailing  ",
        "Multi-line\ntext\r\nwith\n\nnewlines\n",
        "I'm sure they'll say it's fine",
        "numbers 1234567 and 3.14159",
        "Unicode: こんにちは 世界 🦀 café",
        "\t\u{00a0}\u{2003}mixed whitespace",
    ];
    for text in texts {
        let tokens = tokenizer.encode_ordinary(text).unwrap();
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text, "roundtrip of {:?}", text);
        assert_eq!(tokenizer.token_count(text, &AllowedSpecial::None).unwrap(), tokens.len());
    }
}

#[test]
fn test_known_merges() {
    let tokenizer = toy_tokenizer();
    assert_eq!(tokenizer.encode_ordinary("Hello World").unwrap(), vec![259, 264]);
    assert_eq!(
        tokenizer.encode_ordinary("Hello Hello").unwrap(),
        vec![259, b' ' as u32, 259]
    );
}

#[test]
fn test_construction_is_idempotent() {
    let first = toy_tokenizer();
    let second = toy_tokenizer();
    let from_file =
        Tokenizer::from_bytes(&common::toy_vocab_file(), specials(), CL100K_BASE_PATTERN).unwrap();

    let text = "Hello World <|a|>x aaaa\n\n 42";
    let expected = first.encode_with_special(text).unwrap();
    assert_eq!(second.encode_with_special(text).unwrap(), expected);
    assert_eq!(from_file.encode_with_special(text).unwrap(), expected);
    assert_eq!(first.vocab_size(), from_file.vocab_size());
    assert_eq!(first.max_token_value(), Some(AX));
}

#[test]
fn test_deterministic_across_threads() {
    let tokenizer = Arc::new(toy_tokenizer());
    let texts: Vec<String> = (0..32)
        .map(|i| format!("Hello World {i} <|endoftext|> {}", "a".repeat(i * 7)))
        .collect();
    let expected: Vec<Vec<u32>> = texts
        .iter()
        .map(|t| tokenizer.encode(t, &AllowedSpecial::All).unwrap())
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tokenizer = Arc::clone(&tokenizer);
            let texts = texts.clone();
            thread::spawn(move || {
                texts
                    .iter()
                    .map(|t| tokenizer.encode(t, &AllowedSpecial::All).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }

    assert_eq!(tokenizer.encode_batch(&texts, &AllowedSpecial::All).unwrap(), expected);
}

#[test]
fn test_special_gating() {
    let tokenizer = toy_tokenizer();
    let text = "<|a|>x then <|endoftext|>";

    let ordinary = tokenizer.encode(text, &AllowedSpecial::None).unwrap();
    assert_eq!(ordinary, tokenizer.encode_ordinary(text).unwrap());
    assert!(ordinary.iter().all(|&t| t < EOT));
    assert_eq!(tokenizer.decode(&ordinary).unwrap(), text);

    let all = tokenizer.encode(text, &AllowedSpecial::All).unwrap();
    assert_eq!(all.first(), Some(&AX));
    assert_eq!(all.last(), Some(&EOT));
    assert_eq!(tokenizer.decode(&all).unwrap(), text);

    let only_eot = tokenizer
        .encode(text, &AllowedSpecial::only(["<|endoftext|>"]))
        .unwrap();
    assert_eq!(only_eot.last(), Some(&EOT));
    assert!(!only_eot.contains(&A) && !only_eot.contains(&AX));
    assert_eq!(tokenizer.decode(&only_eot).unwrap(), text);

    // Names that are not configured are ignored.
    let unknown = tokenizer
        .encode(text, &AllowedSpecial::only(["<|nope|>"]))
        .unwrap();
    assert_eq!(unknown, ordinary);
}

#[test]
fn test_longest_special_match() {
    let tokenizer = toy_tokenizer();
    assert_eq!(tokenizer.encode_with_special("<|a|>x").unwrap(), vec![AX]);
    assert_eq!(
        tokenizer.encode_with_special("<|a|>y").unwrap(),
        vec![A, b'y' as u32]
    );
    // Restricting to the shorter token lets it match where the longer one would.
    assert_eq!(
        tokenizer
            .encode("<|a|>x", &AllowedSpecial::only(["<|a|>"]))
            .unwrap(),
        vec![A, b'x' as u32]
    );
}

#[test]
fn test_long_single_character_runs() {
    let tokenizer = toy_tokenizer();

    let run = "a".repeat(10_000);
    let tokens = tokenizer.encode_ordinary(&run).unwrap();
    assert_eq!(tokens.len(), 2_500);
    assert!(tokens.iter().all(|&t| t == 266));

    for text in [
        " ".repeat(10_000),
        "\n".repeat(10_000),
        "1".repeat(10_000),
        "🦀".repeat(2_500),
        format!("x{}y", " ".repeat(10_000)),
    ] {
        let tokens = tokenizer.encode_ordinary(&text).unwrap();
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }
}

#[test]
fn test_long_run_with_prefix_and_suffix() {
    let tokenizer = toy_tokenizer();
    let text = format!("Hello {} World", "a".repeat(10_001));
    let tokens = tokenizer.encode_ordinary(&text).unwrap();
    assert_eq!(tokens.first(), Some(&259));
    assert_eq!(tokens.last(), Some(&264));
    assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
}

#[test]
fn test_unknown_rank() {
    let tokenizer = toy_tokenizer();
    assert!(matches!(
        tokenizer.decode(&[b'a' as u32, 999_999_999]),
        Err(TokenizerError::UnknownRank(999_999_999))
    ));
    assert!(matches!(
        tokenizer.decode_single_token_bytes(999_999_999),
        Err(TokenizerError::UnknownRank(_))
    ));

    let mut decoder = StreamingDecoder::new(&tokenizer);
    assert_eq!(decoder.add_token(0xC3).unwrap(), None);
    assert!(decoder.add_token(999_999_999).is_err());
    assert_eq!(decoder.pending_bytes(), 1);
    assert_eq!(decoder.add_token(0xA9).unwrap().as_deref(), Some("é"));
}

#[test]
fn test_streaming_matches_full_decode() {
    let tokenizer = toy_tokenizer();
    let text = "Hello 世界 🦀 World";
    let tokens = tokenizer.encode_ordinary(text).unwrap();

    let mut decoder = StreamingDecoder::new(&tokenizer);
    let mut streamed = String::new();
    for &token in &tokens {
        if let Some(chunk) = decoder.add_token(token).unwrap() {
            streamed.push_str(&chunk);
        }
    }
    streamed.push_str(&decoder.flush());
    assert_eq!(streamed, text);
    assert!(!decoder.has_pending());
}

#[test]
fn test_unencodable_byte() {
    let mut vocab = common::toy_vocab();
    vocab.remove(&vec![b'z']);
    let tokenizer = Tokenizer::new(vocab, FxHashMap::default(), CL100K_BASE_PATTERN).unwrap();
    assert!(matches!(
        tokenizer.encode_ordinary("buzz"),
        Err(TokenizerError::UnencodableByte { byte: b'z' })
    ));
}

#[test]
fn test_configuration_errors() {
    let mut collide = FxHashMap::default();
    collide.insert("<|x|>".to_string(), 5);
    assert!(matches!(
        Tokenizer::new(common::toy_vocab(), collide, CL100K_BASE_PATTERN),
        Err(TokenizerError::Config(ConfigError::SpecialRankCollision { rank: 5, .. }))
    ));

    let mut shared = FxHashMap::default();
    shared.insert("<|x|>".to_string(), 60_000);
    shared.insert("<|y|>".to_string(), 60_000);
    assert!(matches!(
        Tokenizer::new(common::toy_vocab(), shared, CL100K_BASE_PATTERN),
        Err(TokenizerError::Config(ConfigError::DuplicateSpecialRank { .. }))
    ));

    let mut duplicate = common::toy_vocab();
    duplicate.insert(b"zz".to_vec(), 256);
    assert!(matches!(
        Tokenizer::new(duplicate, FxHashMap::default(), CL100K_BASE_PATTERN),
        Err(TokenizerError::Config(ConfigError::DuplicateRank { rank: 256, .. }))
    ));

    assert!(matches!(
        Tokenizer::new(common::toy_vocab(), FxHashMap::default(), "(unclosed"),
        Err(TokenizerError::Config(ConfigError::Pattern(_)))
    ));
}

#[test]
fn test_r50k_pattern_on_toy_vocab() {
    let tokenizer = Tokenizer::new(common::toy_vocab(), specials(), R50K_BASE_PATTERN).unwrap();
    let segmenter = Segmenter::new(R50K_BASE_PATTERN).unwrap();
    let text = "Hello World  it's 2024!";
    let pieces: Vec<&str> = segmenter.pieces(text).collect();
    assert_eq!(pieces, vec!["Hello", " World", " ", " it", "'s", " 2024", "!"]);
    let tokens = tokenizer.encode_ordinary(text).unwrap();
    assert_eq!(&tokens[..2], &[259, 264]);
    assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
}
