//! Splits a document into character-aligned substrings whose encoded byte
//! length fits a cap, measured under the same [`crate::ttml_payload`]
//! encoding and BOM rules the wire payload uses.
//!
//! The char-wise back-off (rather than a byte-wise split) keeps multi-byte
//! codepoints — and UTF-16 surrogate pairs — from being cut in half.

use crate::ttml_payload::{self, Encoding};

/// Partition `doc` into the unique left-to-right sequence of substrings
/// such that each one's encoded length (including the BOM on the first
/// fragment only, when `bom` is set) is at most `max_len`, and every
/// fragment but possibly the last is maximal under that constraint.
///
/// Returns an empty vector for an empty document — no packets should be
/// emitted for it.
pub fn fragment(doc: &str, max_len: usize, encoding: Encoding, bom: bool) -> Vec<String> {
    if doc.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = doc.chars().collect();
    let mut fragments = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let is_first = fragments.is_empty();
        let fragment_bom = bom && is_first;

        let mut end = (start + max_len).min(chars.len());
        loop {
            let candidate: String = chars[start..end].iter().collect();
            if ttml_payload::encoded_len(&candidate, encoding, fragment_bom) <= max_len || end <= start + 1 {
                fragments.push(candidate);
                break;
            }
            end -= 1;
        }

        start = end;
    }

    fragments
}
