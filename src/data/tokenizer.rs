// ============================================================
// Layer 4 — Canonical Word Tokenizer
// ============================================================
// One tokenisation rule is used everywhere: vocabulary building,
// answer alignment, and span-to-text reconstruction.
//
// Rule:
//   - whitespace separates pieces and is dropped
//     (WhitespaceSplit from the `tokenizers` crate)
//   - leading and trailing punctuation is peeled off a piece,
//     one token per character
//   - punctuation inside a piece stays, so numbers, acronyms
//     and hyphenated words remain one token
//
//   "The fox's den, 1999."  →  The | fox's | den | , | 1999 | .
//   "(1,000 U.S.)"          →  ( | 1,000 | U.S | . | )
//
// SQuAD answers that start or end inside a token ("fox" in
// "fox's") cannot be aligned and are skipped by the encoder.
//
// Offsets are CHARACTER offsets into the original text so they
// line up with SQuAD's answer_start. Vocabulary lookups use the
// lowercased token; raw tokens keep their casing.

use tokenizers::pre_tokenizers::whitespace::WhitespaceSplit;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

use crate::domain::error::Result;

/// A token and its half-open character range [start, end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text:  String,
    pub start: usize,
    pub end:   usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn new() -> Self {
        Self
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let mut pre = PreTokenizedString::from(text);
        WhitespaceSplit.pre_tokenize(&mut pre)?;

        let mut tokens = Vec::new();
        for (piece, (start, _), _) in pre.get_splits(OffsetReferential::Original, OffsetType::Char) {
            peel_edges(piece, start, &mut tokens);
        }
        Ok(tokens)
    }

    /// Token strings only, for callers that do not need offsets
    pub fn words(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.tokenize(text)?.into_iter().map(|t| t.text).collect())
    }
}

fn is_edge_punct(c: char) -> bool {
    !c.is_alphanumeric()
}

/// Splits one whitespace-free piece starting at character `start`.
fn peel_edges(piece: &str, start: usize, out: &mut Vec<Token>) {
    let chars: Vec<char> = piece.chars().collect();
    let single = |i: usize| Token { text: chars[i].to_string(), start: start + i, end: start + i + 1 };

    let lead = chars.iter().take_while(|c| is_edge_punct(**c)).count();
    if lead == chars.len() {
        out.extend((0..chars.len()).map(single));
        return;
    }
    let trail = chars.iter().rev().take_while(|c| is_edge_punct(**c)).count();
    let core_end = chars.len() - trail;

    out.extend((0..lead).map(single));
    out.push(Token {
        text:  chars[lead..core_end].iter().collect(),
        start: start + lead,
        end:   start + core_end,
    });
    out.extend((core_end..chars.len()).map(single));
}

/// Vocabulary key for a raw token.
pub fn vocab_key(token: &str) -> String {
    token.to_lowercase()
}
