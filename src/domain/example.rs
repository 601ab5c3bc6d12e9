// ============================================================
// Layer 3 — EncodedExample Domain Type
// ============================================================
// One question/passage pair after tokenisation, id mapping and
// padding. The answer is a SPAN of context token positions
// (inclusive on both ends), not a character range.
//
// Example:
//   context_tokens: ["The", "quick", "brown", "fox"]
//   answer "brown"  → answer_start = 2, answer_end = 2
//
// Invariant: 0 ≤ answer_start ≤ answer_end < context_len ≤ context_ids.len()

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EncodedExample {
    /// QA id from the source file, used for prediction output
    pub qa_id: String,

    /// Context token ids right-padded to context_max_len
    pub context_ids: Vec<u32>,
    /// Number of real (non-padding) context tokens
    pub context_len: usize,

    /// Question token ids right-padded to question_max_len
    pub question_ids: Vec<u32>,
    pub question_len: usize,

    /// Index of the FIRST gold answer token in the context
    pub answer_start: usize,
    /// Index of the LAST gold answer token (inclusive)
    pub answer_end: usize,

    /// Raw context tokens, truncated to context_len.
    /// Shared between every QA of the same paragraph.
    pub context_tokens: Arc<[String]>,

    /// Every accepted answer text, scored with max-over-references
    pub gold_answers: Vec<String>,
}

impl EncodedExample {
    /// Rebuild text for an inclusive token span by joining raw
    /// tokens with single spaces. Indices past the real context
    /// are clamped so padding never leaks into the text.
    pub fn span_text(&self, start: usize, end: usize) -> String {
        span_text(&self.context_tokens, start, end)
    }
}

/// Join `tokens[start..=end]` with single spaces.
pub fn span_text(tokens: &[String], start: usize, end: usize) -> String {
    if tokens.is_empty() || start >= tokens.len() {
        return String::new();
    }
    let end = end.min(tokens.len() - 1);
    if start > end {
        return String::new();
    }
    tokens[start..=end].join(" ")
}
