//! Byte-pair merge for a single piece.
//!
//! The piece starts as one span per byte. Each round merges the adjacent pair
//! whose concatenation has the lowest rank, the leftmost pair winning ties,
//! until no adjacent concatenation is in the vocabulary.
//!
//! Spans form a doubly-linked list over a flat array, so a merge is O(1).
//! Candidate pairs sit in a min-heap keyed by `(rank, start)`; entries made
//! stale by an earlier merge are skipped when popped. A piece of `n` bytes
//! costs O(n log n), which keeps long runs of a repeated character cheap.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::error::TokenizerError;
use super::store::VocabStore;

const NONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Span {
    end: usize,
    prev: usize,
    next: usize,
    rank: u32,
    alive: bool,
}

/// Candidate merge of the span starting at `start` with its right neighbour,
/// valid only while that neighbour still ends at `right_end`.
type Candidate = Reverse<(u32, usize, usize)>;

/// Encode one piece into ranks using byte-pair merging.
///
/// # Errors
/// Returns [`TokenizerError::UnencodableByte`] if any byte of the piece has
/// no single-byte token in `ranks`.
pub fn byte_pair_encode(piece: &[u8], ranks: &VocabStore) -> Result<Vec<u32>, TokenizerError> {
    let mut tokens = Vec::new();
    byte_pair_encode_append(piece, ranks, &mut tokens)?;
    Ok(tokens)
}

/// Byte-pair encode `piece`, appending its ranks to `tokens`.
///
/// On error `tokens` is left as it was.
pub fn byte_pair_encode_append(
    piece: &[u8],
    ranks: &VocabStore,
    tokens: &mut Vec<u32>,
) -> Result<(), TokenizerError> {
    let mut spans = Vec::with_capacity(piece.len());
    for (i, &byte) in piece.iter().enumerate() {
        let rank = ranks
            .rank_for(&piece[i..i + 1])
            .ok_or(TokenizerError::UnencodableByte { byte })?;
        spans.push(Span {
            end: i + 1,
            prev: if i == 0 { NONE } else { i - 1 },
            next: if i + 1 == piece.len() { NONE } else { i + 1 },
            rank,
            alive: true,
        });
    }

    if piece.len() > 1 {
        merge_spans(piece, ranks, &mut spans);
    }

    tokens.reserve(piece.len());
    let mut cursor = if spans.is_empty() { NONE } else { 0 };
    while cursor != NONE {
        tokens.push(spans[cursor].rank);
        cursor = spans[cursor].next;
    }
    Ok(())
}

fn merge_spans(piece: &[u8], ranks: &VocabStore, spans: &mut [Span]) {
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(piece.len());

    let pair_candidate = |spans: &[Span], start: usize| -> Option<Candidate> {
        let next = spans[start].next;
        if next == NONE {
            return None;
        }
        let end = spans[next].end;
        ranks
            .rank_for(&piece[start..end])
            .map(|rank| Reverse((rank, start, end)))
    };

    for start in 0..piece.len() - 1 {
        if let Some(candidate) = pair_candidate(spans, start) {
            heap.push(candidate);
        }
    }

    while let Some(Reverse((rank, start, right_end))) = heap.pop() {
        let left = spans[start];
        if !left.alive || left.next == NONE || spans[left.next].end != right_end {
            continue;
        }

        // Absorb the right neighbour into `start`.
        let right = left.next;
        let after = spans[right].next;
        spans[right].alive = false;
        spans[start].end = right_end;
        spans[start].next = after;
        spans[start].rank = rank;
        if after != NONE {
            spans[after].prev = start;
        }

        if left.prev != NONE {
            if let Some(candidate) = pair_candidate(spans, left.prev) {
                heap.push(candidate);
            }
        }
        if let Some(candidate) = pair_candidate(spans, start) {
            heap.push(candidate);
        }
    }
}
